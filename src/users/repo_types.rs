use sqlx::FromRow;

use crate::donations::Coordinates;

/// Read-only view of a registered user, as the notification side needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub address: Option<String>,
    pub push_token: Option<String>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, FromRow)]
pub struct UserProfileRow {
    pub email: String,
    pub name: String,
    pub address: Option<String>,
    pub push_token: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<UserProfileRow> for UserProfile {
    fn from(r: UserProfileRow) -> Self {
        let coordinates = match (r.latitude, r.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            email: r.email,
            name: r.name,
            address: r.address.filter(|a| !a.trim().is_empty()),
            push_token: r.push_token.filter(|t| !t.trim().is_empty()),
            coordinates,
        }
    }
}
