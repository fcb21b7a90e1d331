//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No [`crate::CurrentUser`] was attached to the request.
  #[error("unauthenticated")]
  Unauthenticated,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<closet_core::Error> for ApiError {
  fn from(err: closet_core::Error) -> Self {
    use closet_core::Error as E;
    match err {
      // Someone else's day plan looks exactly like a missing one.
      E::Unauthorized(id) | E::NotFound(id) => {
        ApiError::NotFound(format!("day plan {id} not found"))
      }
      e @ (E::DuplicateDayPlan { .. } | E::PersistentConflict { .. }) => {
        ApiError::Conflict(e.to_string())
      }
      E::StoreUnavailable(e) => ApiError::Unavailable(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unavailable(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    };
    if status.is_server_error() {
      error!(%status, error = %message, "request failed");
    } else {
      debug!(%status, error = %message, "request rejected");
    }
    (status, Json(json!({ "error": message }))).into_response()
  }
}
