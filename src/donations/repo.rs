use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{ClaimedRow, Donation, DonationRow, DonationStatus};

/// Result of a conditional claim write.
#[derive(Debug, Clone)]
pub enum ClaimWrite {
    Applied {
        donation: Donation,
        previous_quantity: i32,
    },
    NotFound,
    /// The donation exists but is not available or has nothing left.
    Unavailable {
        status: DonationStatus,
        quantity: i32,
    },
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Donation>>;

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Donation>>;

    /// Every donation regardless of status.
    async fn list_all(&self) -> anyhow::Result<Vec<Donation>>;

    /// Case-insensitive substring match on the donor email.
    async fn list_by_donor_email(&self, needle: &str) -> anyhow::Result<Vec<Donation>>;

    /// Atomically subtracts `servings` (floored at zero) from an available
    /// donation; reaching zero flips it to claimed by `claimer` at `now`.
    async fn apply_claim(
        &self,
        id: Uuid,
        servings: i32,
        claimer: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<ClaimWrite>;

    /// Reverts every claim made at or before `older_than`. Returns the number
    /// of donations touched.
    async fn revert_stale_claims(&self, older_than: OffsetDateTime) -> anyhow::Result<u64>;
}

const COLUMNS: &str = "id, donor_name, email, phone_no, food_name, food_type, food_image, \
     quantity, location_name, latitude, longitude, created_date, expiry_date, status, \
     claimed_at, claimed_by";

#[derive(Clone)]
pub struct PgInventory {
    db: PgPool,
}

impl PgInventory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InventoryStore for PgInventory {
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Donation>> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {COLUMNS} FROM donations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Donation::from))
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Donation>> {
        let rows = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {COLUMNS} FROM donations WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Donation::from).collect())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Donation>> {
        let rows = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {COLUMNS} FROM donations ORDER BY created_date ASC, id ASC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Donation::from).collect())
    }

    async fn list_by_donor_email(&self, needle: &str) -> anyhow::Result<Vec<Donation>> {
        let rows = sqlx::query_as::<_, DonationRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM donations
            WHERE email ILIKE '%' || $1 || '%' ESCAPE '\'
            ORDER BY created_date ASC, id ASC
            "#
        ))
        .bind(escape_like(needle))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Donation::from).collect())
    }

    async fn apply_claim(
        &self,
        id: Uuid,
        servings: i32,
        claimer: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<ClaimWrite> {
        // The locked subselect pins the pre-update quantity so the caller can
        // tell how many servings it actually got.
        let claimed = sqlx::query_as::<_, ClaimedRow>(
            r#"
            UPDATE donations AS d
            SET quantity   = GREATEST(p.previous_quantity - $2, 0),
                status     = CASE WHEN p.previous_quantity <= $2
                                  THEN 'claimed'::donation_status ELSE d.status END,
                claimed_at = CASE WHEN p.previous_quantity <= $2 THEN $4 ELSE d.claimed_at END,
                claimed_by = CASE WHEN p.previous_quantity <= $2 THEN $3 ELSE d.claimed_by END,
                updated_at = $4
            FROM (
                SELECT id, quantity AS previous_quantity
                FROM donations
                WHERE id = $1
                FOR UPDATE
            ) AS p
            WHERE d.id = p.id
              AND d.status = 'available'
              AND p.previous_quantity > 0
            RETURNING d.id, d.donor_name, d.email, d.phone_no, d.food_name, d.food_type,
                      d.food_image, d.quantity, d.location_name, d.latitude, d.longitude,
                      d.created_date, d.expiry_date, d.status, d.claimed_at, d.claimed_by,
                      p.previous_quantity
            "#,
        )
        .bind(id)
        .bind(servings)
        .bind(claimer)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = claimed {
            return Ok(ClaimWrite::Applied {
                previous_quantity: row.previous_quantity,
                donation: row.donation.into(),
            });
        }

        let current: Option<(DonationStatus, i32)> =
            sqlx::query_as("SELECT status, quantity FROM donations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(match current {
            Some((status, quantity)) => ClaimWrite::Unavailable { status, quantity },
            None => ClaimWrite::NotFound,
        })
    }

    async fn revert_stale_claims(&self, older_than: OffsetDateTime) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE donations
            SET status = 'available', claimed_at = NULL, claimed_by = NULL, updated_at = now()
            WHERE status = 'claimed' AND claimed_at <= $1
            "#,
        )
        .bind(older_than)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected())
    }
}

/// Escapes LIKE metacharacters so the needle matches literally.
pub(crate) fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
pub mod memory {
    use async_trait::async_trait;
    use time::OffsetDateTime;
    use tokio::sync::RwLock;
    use uuid::Uuid;

    use super::{ClaimWrite, InventoryStore};
    use crate::donations::repo_types::Donation;

    /// Inventory kept behind a single write lock, which serializes claims.
    #[derive(Default)]
    pub struct MemoryInventory {
        rows: RwLock<Vec<Donation>>,
    }

    impl MemoryInventory {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert(&self, donation: Donation) {
            self.rows.write().await.push(donation);
        }
    }

    #[async_trait]
    impl InventoryStore for MemoryInventory {
        async fn get(&self, id: Uuid) -> anyhow::Result<Option<Donation>> {
            Ok(self.rows.read().await.iter().find(|d| d.id == id).cloned())
        }

        async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Donation>> {
            let rows = self.rows.read().await;
            Ok(rows.iter().filter(|d| ids.contains(&d.id)).cloned().collect())
        }

        async fn list_all(&self) -> anyhow::Result<Vec<Donation>> {
            Ok(self.rows.read().await.clone())
        }

        async fn list_by_donor_email(&self, needle: &str) -> anyhow::Result<Vec<Donation>> {
            let needle = needle.to_lowercase();
            let rows = self.rows.read().await;
            Ok(rows
                .iter()
                .filter(|d| d.email.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        }

        async fn apply_claim(
            &self,
            id: Uuid,
            servings: i32,
            claimer: &str,
            now: OffsetDateTime,
        ) -> anyhow::Result<ClaimWrite> {
            let mut rows = self.rows.write().await;
            let Some(donation) = rows.iter_mut().find(|d| d.id == id) else {
                return Ok(ClaimWrite::NotFound);
            };
            if !donation.is_claimable() {
                return Ok(ClaimWrite::Unavailable {
                    status: donation.status,
                    quantity: donation.quantity,
                });
            }
            let previous_quantity = donation.take_servings(servings, claimer, now);
            Ok(ClaimWrite::Applied {
                donation: donation.clone(),
                previous_quantity,
            })
        }

        async fn revert_stale_claims(&self, older_than: OffsetDateTime) -> anyhow::Result<u64> {
            let mut rows = self.rows.write().await;
            let mut touched = 0;
            for donation in rows.iter_mut() {
                if donation.revert_if_stale(older_than) {
                    touched += 1;
                }
            }
            Ok(touched)
        }
    }

    #[cfg(test)]
    mod tests {
        use std::sync::Arc;

        use super::*;
        use crate::donations::repo_types::{sample_donation, DonationStatus};

        async fn seeded(quantity: i32) -> (MemoryInventory, Uuid) {
            let store = MemoryInventory::new();
            let d = sample_donation(quantity);
            let id = d.id;
            store.insert(d).await;
            (store, id)
        }

        #[tokio::test]
        async fn claim_everything_then_nothing_left() {
            let (store, id) = seeded(5).await;
            let now = OffsetDateTime::now_utc();

            match store.apply_claim(id, 5, "x@example.com", now).await.unwrap() {
                ClaimWrite::Applied {
                    donation,
                    previous_quantity,
                } => {
                    assert_eq!(previous_quantity, 5);
                    assert_eq!(donation.quantity, 0);
                    assert_eq!(donation.status, DonationStatus::Claimed);
                    assert_eq!(donation.claimed_at, Some(now));
                }
                other => panic!("unexpected {other:?}"),
            }

            let again = store.apply_claim(id, 1, "y@example.com", now).await.unwrap();
            assert!(matches!(
                again,
                ClaimWrite::Unavailable {
                    status: DonationStatus::Claimed,
                    quantity: 0
                }
            ));
        }

        #[tokio::test]
        async fn unknown_id_is_not_found() {
            let (store, _) = seeded(1).await;
            let res = store
                .apply_claim(Uuid::new_v4(), 1, "x@example.com", OffsetDateTime::now_utc())
                .await
                .unwrap();
            assert!(matches!(res, ClaimWrite::NotFound));
        }

        #[tokio::test]
        async fn quantity_never_negative_over_claim_sequence() {
            let (store, id) = seeded(7).await;
            let now = OffsetDateTime::now_utc();
            for servings in [3, 1, 10, 2, 1] {
                store.apply_claim(id, servings, "x@example.com", now).await.unwrap();
                let d = store.get(id).await.unwrap().unwrap();
                assert!(d.quantity >= 0);
                assert!(d.claim_fields_consistent());
            }
            assert_eq!(store.get(id).await.unwrap().unwrap().quantity, 0);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn concurrent_last_serving_goes_to_exactly_one_claimant() {
            let (store, id) = seeded(1).await;
            let store = Arc::new(store);
            let now = OffsetDateTime::now_utc();

            let a = tokio::spawn({
                let store = store.clone();
                async move { store.apply_claim(id, 1, "a@example.com", now).await }
            });
            let b = tokio::spawn({
                let store = store.clone();
                async move { store.apply_claim(id, 1, "b@example.com", now).await }
            });
            let results = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];

            let applied = results
                .iter()
                .filter(|r| matches!(r, ClaimWrite::Applied { .. }))
                .count();
            assert_eq!(applied, 1);

            let d = store.get(id).await.unwrap().unwrap();
            assert_eq!(d.quantity, 0);
            assert_eq!(d.status, DonationStatus::Claimed);
        }

        #[tokio::test]
        async fn donor_search_is_case_insensitive_substring() {
            let (store, _) = seeded(1).await;
            assert_eq!(store.list_by_donor_email("PRIYA@").await.unwrap().len(), 1);
            assert!(store.list_by_donor_email("nobody").await.unwrap().is_empty());
        }
    }
}
