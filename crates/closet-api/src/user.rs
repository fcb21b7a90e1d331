//! The authenticated caller, as established by an outer auth layer.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

/// The user on whose behalf a request runs.
///
/// This crate performs no authentication: whatever sits in front of the router
/// must insert a `CurrentUser` into the request extensions. Requests without
/// one are rejected with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<CurrentUser>()
      .copied()
      .ok_or(ApiError::Unauthenticated)
  }
}
