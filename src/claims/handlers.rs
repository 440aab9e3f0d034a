use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::dto::{CheckoutRequest, CheckoutResponse};
use crate::{error::AppError, state::AppState, users::services::normalize_email};

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/cart/checkout", post(checkout))
}

#[instrument(skip(state, payload))]
pub async fn checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let Json(payload) = payload?;
    let user_id = normalize_email(payload.user_id.as_deref(), "userId")?;
    let claims = payload.claims.unwrap_or_default();

    let outcome = state
        .reconciler
        .checkout(&user_id, &claims, OffsetDateTime::now_utc())
        .await?;
    let applied = outcome.applied_count();
    // Notifications keep running after the response is sent.
    drop(outcome.notifications);

    Ok(Json(CheckoutResponse {
        message: summary(applied, outcome.lines.len()),
        donations: outcome.donations,
        cart: outcome.cart,
        lines: outcome.lines,
    }))
}

fn summary(applied: usize, total: usize) -> String {
    if applied == total {
        "Checkout successful! Donations updated.".into()
    } else if applied == 0 {
        "Checkout finished but no items could be claimed.".into()
    } else {
        format!("Checkout partially completed: {applied} of {total} items claimed.")
    }
}
