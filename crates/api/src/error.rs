use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use match_events_core::reconcile::ReconcileError;
use match_events_core::store::StoreError;
use serde_json::json;

/// API error type that maps to JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Store(err) => {
                tracing::error!("Store error: {err}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storeUnavailable",
                    "The event store is unavailable".to_string(),
                )
            }
            ApiError::Reconcile(ReconcileError::DeleteFailed { .. }) => (
                StatusCode::BAD_GATEWAY,
                "deleteFailed",
                "Could not delete event; events were reloaded".to_string(),
            ),
            ApiError::Reconcile(ReconcileError::LoadFailed { .. }) => (
                StatusCode::BAD_GATEWAY,
                "loadFailed",
                "Could not load match events".to_string(),
            ),
            ApiError::Reconcile(ReconcileError::Closed(match_id)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "matchClosed",
                format!("match {match_id} is no longer being followed"),
            ),
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
