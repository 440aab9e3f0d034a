use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::repo_types::Donation;
use crate::{error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/donations", get(list_donations))
        .route("/donations/:id", get(get_donation))
        .route("/donations/donor/:email", get(list_by_donor))
}

#[instrument(skip(state))]
pub async fn list_donations(State(state): State<AppState>) -> Result<Json<Vec<Donation>>, AppError> {
    let donations = state.inventory.list_all().await?;
    debug!(count = donations.len(), "listed donations");
    Ok(Json(donations))
}

#[instrument(skip(state))]
pub async fn get_donation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Donation>, AppError> {
    state
        .inventory
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Donation not found".into()))
}

/// Empty list rather than 404 when the donor has nothing listed.
#[instrument(skip(state))]
pub async fn list_by_donor(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Donation>>, AppError> {
    let needle = email.trim();
    if needle.is_empty() {
        return Err(AppError::Validation("Email is required".into()));
    }
    let donations = state.inventory.list_by_donor_email(needle).await?;
    debug!(count = donations.len(), "donations by donor");
    Ok(Json(donations))
}
