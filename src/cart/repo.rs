use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Cart, CartItem, CartItemRow, CartRow};

#[derive(Debug, Clone)]
pub enum AddItem {
    Added(Cart),
    /// The donation was already in the cart; the cart is returned unchanged.
    AlreadyPresent(Cart),
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the cart, persisting an empty one on first access.
    async fn get_or_create(&self, user_id: &str) -> anyhow::Result<Cart>;

    async fn find(&self, user_id: &str) -> anyhow::Result<Option<Cart>>;

    async fn add_item(&self, user_id: &str, item: CartItem) -> anyhow::Result<AddItem>;

    /// `None` when the user has no cart.
    async fn remove_item(&self, user_id: &str, donation_id: Uuid) -> anyhow::Result<Option<Cart>>;

    /// Empties the cart in one write. `None` when the user has no cart.
    async fn clear(&self, user_id: &str) -> anyhow::Result<Option<Cart>>;
}

#[derive(Clone)]
pub struct PgCarts {
    db: PgPool,
}

impl PgCarts {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn load(&self, user_id: &str) -> anyhow::Result<Option<Cart>> {
        let Some(cart) = sqlx::query_as::<_, CartRow>(
            "SELECT user_id, created_at, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, CartItemRow>(
            r#"
            SELECT donation_id, food_name, food_type, quantity, donor_name, location_name,
                   latitude, longitude, added_at
            FROM cart_items
            WHERE user_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(Some(Cart {
            user_id: cart.user_id,
            items: items.into_iter().map(CartItem::from).collect(),
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }))
    }

    /// Deletes one item, or every item when `donation_id` is `None`, and bumps
    /// `updated_at` in one transaction.
    async fn delete_items(
        &self,
        user_id: &str,
        donation_id: Option<Uuid>,
    ) -> anyhow::Result<Option<Cart>> {
        let mut tx = self.db.begin().await?;
        let exists: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        match donation_id {
            Some(id) => {
                sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND donation_id = $2")
                    .bind(user_id)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        touch(&mut tx, user_id).await?;
        tx.commit().await?;
        self.load(user_id).await
    }
}

async fn touch(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, user_id: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE carts SET updated_at = $2 WHERE user_id = $1")
        .bind(user_id)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl CartStore for PgCarts {
    async fn get_or_create(&self, user_id: &str) -> anyhow::Result<Cart> {
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        self.load(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("cart for {user_id} vanished after upsert"))
    }

    async fn find(&self, user_id: &str) -> anyhow::Result<Option<Cart>> {
        self.load(user_id).await
    }

    async fn add_item(&self, user_id: &str, item: CartItem) -> anyhow::Result<AddItem> {
        let mut tx = self.db.begin().await?;
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let (latitude, longitude) = match item.coordinates {
            Some(c) => (Some(c.latitude), Some(c.longitude)),
            None => (None, None),
        };
        let inserted = sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, donation_id, food_name, food_type, quantity,
                                    donor_name, location_name, latitude, longitude, added_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id, donation_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(item.donation_id)
        .bind(&item.food_name)
        .bind(&item.food_type)
        .bind(item.quantity)
        .bind(&item.donor_name)
        .bind(&item.location_name)
        .bind(latitude)
        .bind(longitude)
        .bind(item.added_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            touch(&mut tx, user_id).await?;
        }
        tx.commit().await?;

        let cart = self
            .load(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("cart for {user_id} vanished after insert"))?;
        Ok(if inserted > 0 {
            AddItem::Added(cart)
        } else {
            AddItem::AlreadyPresent(cart)
        })
    }

    async fn remove_item(&self, user_id: &str, donation_id: Uuid) -> anyhow::Result<Option<Cart>> {
        self.delete_items(user_id, Some(donation_id)).await
    }

    async fn clear(&self, user_id: &str) -> anyhow::Result<Option<Cart>> {
        self.delete_items(user_id, None).await
    }
}
