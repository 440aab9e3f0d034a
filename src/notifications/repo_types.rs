use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const KIND_DONATION_CLAIMED: &str = "donation_claimed";
pub const KIND_TEST: &str = "test";

/// An in-app feed entry. `delivered` records whether the matching push went
/// out; the entry exists either way.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub email: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
    pub read: bool,
    pub delivered: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub email: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub data: Value,
    pub delivered: bool,
}
