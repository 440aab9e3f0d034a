pub mod handlers;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use repo::{ClaimWrite, InventoryStore, PgInventory};
pub use repo_types::{Coordinates, Donation, DonationStatus};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::read_routes())
}
