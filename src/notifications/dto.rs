use serde::{Deserialize, Serialize};

use super::repo_types::Notification;

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPushRequest {
    pub email: Option<String>,
    pub push_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub success: bool,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub success: bool,
    pub notification: Notification,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub success: bool,
    pub message: String,
    pub count: u64,
}
