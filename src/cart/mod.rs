mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo::{CartStore, PgCarts};
pub use repo_types::{Cart, CartItem};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::cart_routes())
}
