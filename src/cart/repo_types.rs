use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::donations::{Coordinates, Donation};

/// A donation staged for checkout. Every field besides `donation_id` and
/// `added_at` is a display copy taken when the item was added; the
/// authoritative quantity lives on the donation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub donation_id: Uuid,
    pub food_name: String,
    pub food_type: String,
    pub quantity: i32,
    pub donor_name: String,
    pub location_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

impl CartItem {
    pub fn snapshot(donation: &Donation, now: OffsetDateTime) -> Self {
        Self {
            donation_id: donation.id,
            food_name: donation.food_name.clone(),
            food_type: donation.food_type.clone(),
            quantity: donation.quantity,
            donor_name: donation.donor_name.clone(),
            location_name: donation.location_name.clone(),
            coordinates: donation.coordinates,
            added_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartItem>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Cart {
    pub fn empty(user_id: &str, now: OffsetDateTime) -> Self {
        Self {
            user_id: user_id.to_string(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CartRow {
    pub user_id: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct CartItemRow {
    pub donation_id: Uuid,
    pub food_name: String,
    pub food_type: String,
    pub quantity: i32,
    pub donor_name: String,
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub added_at: OffsetDateTime,
}

impl From<CartItemRow> for CartItem {
    fn from(r: CartItemRow) -> Self {
        let coordinates = match (r.latitude, r.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            donation_id: r.donation_id,
            food_name: r.food_name,
            food_type: r.food_type,
            quantity: r.quantity,
            donor_name: r.donor_name,
            location_name: r.location_name,
            coordinates,
            added_at: r.added_at,
        }
    }
}
