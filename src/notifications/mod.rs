pub mod dispatcher;
mod dto;
pub mod geo;
pub mod handlers;
pub mod push;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use dispatcher::NotificationDispatcher;
pub use push::{ExpoPush, PushTransport};
pub use repo::{NotificationStore, PgNotifications};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::feed_routes())
}
