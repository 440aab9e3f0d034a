use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::donations::Donation;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: Option<String>,
    pub claims: Option<Vec<ClaimLine>>,
}

/// One requested line. Both fields are optional on the wire so a bad line
/// can be skipped without failing the whole request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimLine {
    pub donation_id: Option<String>,
    pub servings: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidServings,
    InvalidDonationId,
    NotFound,
    /// Already fully claimed, completed, or nothing left.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedLine {
    pub donation_id: Uuid,
    pub requested: i32,
    /// Less than `requested` when the request was clamped to what was left.
    pub granted: i32,
    pub remaining: i32,
    pub fully_claimed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    pub donation_id: Option<String>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum LineOutcome {
    Applied(AppliedLine),
    Skipped(SkippedLine),
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub donations: Vec<Donation>,
    pub cart: Cart,
    pub lines: Vec<LineOutcome>,
}
