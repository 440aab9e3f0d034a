use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Store failure before anything was written.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    /// Store failure after `applied` checkout lines were already committed.
    #[error("checkout interrupted after {applied} committed line(s): {source}")]
    CheckoutInterrupted {
        applied: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::CheckoutInterrupted { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Validation(m) | AppError::NotFound(m) | AppError::Conflict(m) => m.clone(),
            AppError::Store(_) => "Server error, nothing was changed".into(),
            AppError::CheckoutInterrupted { applied, .. } => format!(
                "Checkout interrupted: {applied} item(s) were claimed, some items may not have processed"
            ),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }
        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}
