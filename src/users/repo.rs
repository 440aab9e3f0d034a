use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{UserProfile, UserProfileRow};

/// Lookup into the account service's users. Profile writes happen elsewhere.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserProfile>>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            r#"
            SELECT email, name, address, push_token, latitude, longitude
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserProfile::from))
    }
}
