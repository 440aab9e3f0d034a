use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewNotification, Notification};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, new: NewNotification) -> anyhow::Result<Notification>;

    /// Newest first.
    async fn list_by_email(&self, email: &str) -> anyhow::Result<Vec<Notification>>;

    /// `None` when no notification with that id belongs to `email`.
    async fn mark_read(&self, id: Uuid, email: &str) -> anyhow::Result<Option<Notification>>;

    async fn mark_all_read(&self, email: &str) -> anyhow::Result<u64>;

    async fn clear_all(&self, email: &str) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgNotifications {
    db: PgPool,
}

impl PgNotifications {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationStore for PgNotifications {
    async fn insert(&self, new: NewNotification) -> anyhow::Result<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, email, title, message, kind, data, delivered)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, title, message, kind, data, read, delivered, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.title)
        .bind(&new.message)
        .bind(&new.kind)
        .bind(&new.data)
        .bind(new.delivered)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_by_email(&self, email: &str) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, email, title, message, kind, data, read, delivered, created_at
            FROM notifications
            WHERE email = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(email)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn mark_read(&self, id: Uuid, email: &str) -> anyhow::Result<Option<Notification>> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1 AND email = $2
            RETURNING id, email, title, message, kind, data, read, delivered, created_at
            "#,
        )
        .bind(id)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn mark_all_read(&self, email: &str) -> anyhow::Result<u64> {
        let res = sqlx::query("UPDATE notifications SET read = TRUE WHERE email = $1 AND NOT read")
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn clear_all(&self, email: &str) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM notifications WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
