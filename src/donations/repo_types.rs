use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "donation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Available,
    Claimed,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A listed donation. `quantity` is the number of servings still on offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: Uuid,
    pub donor_name: String,
    pub email: String,
    pub phone_no: String,
    pub food_name: String,
    pub food_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_image: Option<String>,
    pub quantity: i32,
    pub location_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expiry_date: OffsetDateTime,
    pub status: DonationStatus,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub claimed_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
}

impl Donation {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expiry_date < now
    }

    /// Only available donations with servings left can be claimed.
    pub fn is_claimable(&self) -> bool {
        self.status == DonationStatus::Available && self.quantity > 0
    }
}

/// In-memory mirror of the conditional writes `PgInventory` does in SQL.
#[cfg(test)]
impl Donation {
    /// Subtracts `servings` with a floor at zero and returns the quantity
    /// before the write. Reaching zero marks the donation claimed by `claimer`.
    pub fn take_servings(&mut self, servings: i32, claimer: &str, now: OffsetDateTime) -> i32 {
        let previous = self.quantity;
        self.quantity = previous.saturating_sub(servings).max(0);
        if self.quantity == 0 {
            self.status = DonationStatus::Claimed;
            self.claimed_at = Some(now);
            self.claimed_by = Some(claimer.to_string());
        }
        previous
    }

    /// Returns true if the claim was stale and got reverted.
    pub fn revert_if_stale(&mut self, older_than: OffsetDateTime) -> bool {
        let stale = self.status == DonationStatus::Claimed
            && self.claimed_at.is_some_and(|at| at <= older_than);
        if stale {
            self.status = DonationStatus::Available;
            self.claimed_at = None;
            self.claimed_by = None;
        }
        stale
    }

    /// `claimed` iff both claim fields are set, `available` iff neither is.
    pub fn claim_fields_consistent(&self) -> bool {
        let both = self.claimed_at.is_some() && self.claimed_by.is_some();
        let neither = self.claimed_at.is_none() && self.claimed_by.is_none();
        match self.status {
            DonationStatus::Claimed => both,
            DonationStatus::Available => neither,
            DonationStatus::Completed => both || neither,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct DonationRow {
    pub id: Uuid,
    pub donor_name: String,
    pub email: String,
    pub phone_no: String,
    pub food_name: String,
    pub food_type: String,
    pub food_image: Option<String>,
    pub quantity: i32,
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_date: OffsetDateTime,
    pub expiry_date: OffsetDateTime,
    pub status: DonationStatus,
    pub claimed_at: Option<OffsetDateTime>,
    pub claimed_by: Option<String>,
}

impl From<DonationRow> for Donation {
    fn from(r: DonationRow) -> Self {
        let coordinates = match (r.latitude, r.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            donor_name: r.donor_name,
            email: r.email,
            phone_no: r.phone_no,
            food_name: r.food_name,
            food_type: r.food_type,
            food_image: r.food_image,
            quantity: r.quantity,
            location_name: r.location_name,
            coordinates,
            created_date: r.created_date,
            expiry_date: r.expiry_date,
            status: r.status,
            claimed_at: r.claimed_at,
            claimed_by: r.claimed_by,
        }
    }
}

/// Row returned by the claim update: the new state plus the quantity it had
/// when the row lock was taken.
#[derive(Debug, FromRow)]
pub struct ClaimedRow {
    #[sqlx(flatten)]
    pub donation: DonationRow,
    pub previous_quantity: i32,
}

#[cfg(test)]
pub(crate) fn sample_donation(quantity: i32) -> Donation {
    let now = OffsetDateTime::now_utc();
    Donation {
        id: Uuid::new_v4(),
        donor_name: "Priya".into(),
        email: "priya@example.com".into(),
        phone_no: "555-0100".into(),
        food_name: "Vegetable biryani".into(),
        food_type: "veg".into(),
        food_image: None,
        quantity,
        location_name: "Community hall".into(),
        coordinates: Some(Coordinates {
            latitude: 17.385,
            longitude: 78.4867,
        }),
        created_date: now - time::Duration::hours(1),
        expiry_date: now + time::Duration::days(1),
        status: DonationStatus::Available,
        claimed_at: None,
        claimed_by: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn taking_all_servings_marks_claimed() {
        let now = datetime!(2026-05-01 12:00 UTC);
        let mut d = sample_donation(5);
        let prev = d.take_servings(5, "x@example.com", now);
        assert_eq!(prev, 5);
        assert_eq!(d.quantity, 0);
        assert_eq!(d.status, DonationStatus::Claimed);
        assert_eq!(d.claimed_at, Some(now));
        assert_eq!(d.claimed_by.as_deref(), Some("x@example.com"));
        assert!(d.claim_fields_consistent());
    }

    #[test]
    fn partial_take_leaves_status_alone() {
        let mut d = sample_donation(5);
        d.take_servings(2, "x@example.com", OffsetDateTime::now_utc());
        assert_eq!(d.quantity, 3);
        assert_eq!(d.status, DonationStatus::Available);
        assert!(d.claimed_at.is_none() && d.claimed_by.is_none());
    }

    #[test]
    fn over_take_clamps_to_zero() {
        let mut d = sample_donation(2);
        d.take_servings(i32::MAX, "x@example.com", OffsetDateTime::now_utc());
        assert_eq!(d.quantity, 0);
        assert_eq!(d.status, DonationStatus::Claimed);
    }

    #[test]
    fn revert_respects_threshold_boundary() {
        let claimed_at = datetime!(2026-05-01 10:00 UTC);
        let mut d = sample_donation(1);
        d.take_servings(1, "x@example.com", claimed_at);

        assert!(!d.revert_if_stale(claimed_at - time::Duration::seconds(1)));
        assert_eq!(d.status, DonationStatus::Claimed);

        assert!(d.revert_if_stale(claimed_at));
        assert_eq!(d.status, DonationStatus::Available);
        assert!(d.claim_fields_consistent());
        assert_eq!(d.quantity, 0);
    }

    #[test]
    fn serializes_camel_case_without_claim_fields_when_available() {
        let d = sample_donation(3);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["foodName"], "Vegetable biryani");
        assert_eq!(json["status"], "available");
        assert!(json.get("claimedAt").is_none());
        assert!(json.get("claimedBy").is_none());
    }
}
