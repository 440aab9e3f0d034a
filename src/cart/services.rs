use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo::AddItem;
use super::repo_types::{Cart, CartItem};
use crate::{error::AppError, state::AppState};

/// Adds a snapshot of the donation to the user's cart.
#[instrument(skip(state))]
pub async fn add_to_cart(
    state: &AppState,
    user_id: &str,
    donation_id: Uuid,
    now: OffsetDateTime,
) -> Result<Cart, AppError> {
    let donation = state
        .inventory
        .get(donation_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Donation not found".into()))?;

    if donation.is_expired(now) {
        warn!(%donation_id, "attempt to add expired donation");
        return Err(AppError::Validation("This donation has expired".into()));
    }

    match state
        .carts
        .add_item(user_id, CartItem::snapshot(&donation, now))
        .await?
    {
        AddItem::Added(cart) => {
            info!(%donation_id, items = cart.items.len(), "item added to cart");
            Ok(cart)
        }
        AddItem::AlreadyPresent(_) => Err(AppError::Conflict("Item already exists in cart".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::donations::repo_types::sample_donation;
    use crate::state::AppState;

    #[tokio::test]
    async fn second_add_of_same_donation_conflicts_and_keeps_one_entry() {
        let (state, fakes) = AppState::fake();
        let d = sample_donation(4);
        let id = d.id;
        fakes.inventory.insert(d).await;
        let now = OffsetDateTime::now_utc();

        let cart = add_to_cart(&state, "asha@example.com", id, now).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 4);

        let err = add_to_cart(&state, "asha@example.com", id, now).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let cart = state.carts.find("asha@example.com").await.unwrap().unwrap();
        assert_eq!(cart.items.iter().filter(|i| i.donation_id == id).count(), 1);
    }

    #[tokio::test]
    async fn missing_donation_is_not_found() {
        let (state, _) = AppState::fake();
        let err = add_to_cart(&state, "asha@example.com", Uuid::new_v4(), OffsetDateTime::now_utc())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn expired_donation_is_rejected() {
        let (state, fakes) = AppState::fake();
        let mut d = sample_donation(4);
        d.expiry_date = OffsetDateTime::now_utc() - time::Duration::minutes(1);
        let id = d.id;
        fakes.inventory.insert(d).await;

        let err = add_to_cart(&state, "asha@example.com", id, OffsetDateTime::now_utc())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("expired")));
        assert!(state.carts.find("asha@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_and_clear_are_idempotent() {
        let (state, fakes) = AppState::fake();
        let d = sample_donation(2);
        let id = d.id;
        fakes.inventory.insert(d).await;
        add_to_cart(&state, "asha@example.com", id, OffsetDateTime::now_utc())
            .await
            .unwrap();

        let cart = state.carts.remove_item("asha@example.com", id).await.unwrap().unwrap();
        assert!(cart.items.is_empty());
        let cart = state.carts.remove_item("asha@example.com", id).await.unwrap().unwrap();
        assert!(cart.items.is_empty());

        assert!(state.carts.clear("asha@example.com").await.unwrap().unwrap().items.is_empty());
        assert!(state.carts.clear("asha@example.com").await.unwrap().unwrap().items.is_empty());
        assert!(state.carts.clear("nobody@example.com").await.unwrap().is_none());
    }
}
