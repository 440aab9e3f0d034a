pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo::{PgUserDirectory, UserDirectory};
pub use repo_types::UserProfile;
