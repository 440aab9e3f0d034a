use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CountResponse, EmailBody, FeedResponse, NotificationResponse, TestPushRequest};
use crate::{error::AppError, state::AppState, users::services::normalize_email};

pub fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/user/:email", get(list_for_user))
        .route("/notifications/read/:id", put(mark_read))
        .route("/notifications/mark-all-read", put(mark_all_read))
        .route("/notifications/clear-all", delete(clear_all))
        .route("/notifications/test", post(send_test))
}

#[instrument(skip(state))]
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<FeedResponse>, AppError> {
    let email = normalize_email(Some(&email), "email")?;
    let notifications = state.notifications.list_by_email(&email).await?;
    Ok(Json(FeedResponse {
        success: true,
        notifications,
    }))
}

#[instrument(skip(state, body))]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<EmailBody>, JsonRejection>,
) -> Result<Json<NotificationResponse>, AppError> {
    let Json(body) = body?;
    let email = normalize_email(body.email.as_deref(), "email")?;
    let notification = state
        .notifications
        .mark_read(id, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".into()))?;
    Ok(Json(NotificationResponse {
        success: true,
        notification,
    }))
}

#[instrument(skip(state, body))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    body: Result<Json<EmailBody>, JsonRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let Json(body) = body?;
    let email = normalize_email(body.email.as_deref(), "email")?;
    let count = state.notifications.mark_all_read(&email).await?;
    Ok(Json(CountResponse {
        success: true,
        message: format!("{count} notifications marked as read"),
        count,
    }))
}

#[instrument(skip(state, body))]
pub async fn clear_all(
    State(state): State<AppState>,
    body: Result<Json<EmailBody>, JsonRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let Json(body) = body?;
    let email = normalize_email(body.email.as_deref(), "email")?;
    let count = state.notifications.clear_all(&email).await?;
    info!(count, "notifications cleared");
    Ok(Json(CountResponse {
        success: true,
        message: format!("{count} notifications cleared"),
        count,
    }))
}

/// 200 when the push went out, 502 when only the feed entry was written.
#[instrument(skip(state, body))]
pub async fn send_test(
    State(state): State<AppState>,
    body: Result<Json<TestPushRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NotificationResponse>), AppError> {
    let Json(body) = body?;
    let email = normalize_email(body.email.as_deref(), "email")?;
    let token = body
        .push_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Email and push token are required".into()))?;

    let notification = state.dispatcher.send_test(&email, token).await?;
    let status = if notification.delivered {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((
        status,
        Json(NotificationResponse {
            success: notification.delivered,
            notification,
        }),
    ))
}
