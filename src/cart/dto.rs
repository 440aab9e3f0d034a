use serde::{Deserialize, Serialize};

use super::repo_types::Cart;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub user_id: Option<String>,
    pub donation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub message: String,
    pub cart: Cart,
}
