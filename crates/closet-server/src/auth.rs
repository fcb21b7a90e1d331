//! HTTP Basic auth against the configured users.
//!
//! A request that passes [`require_user`] carries a
//! [`closet_api::CurrentUser`] extension for the API handlers.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use closet_api::CurrentUser;
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::Error;

/// One account allowed to use this server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
  pub username:      String,
  /// The id every day plan of this user is stored under.
  pub user_id:       Uuid,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// The accounts accepted by [`require_user`]. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct AuthConfig {
  users: Arc<[UserConfig]>,
}

impl AuthConfig {
  pub fn new(users: Vec<UserConfig>) -> Self { Self { users: users.into() } }

  /// Verify the `Authorization` header and return the caller's user id.
  pub fn verify(&self, headers: &HeaderMap) -> Result<Uuid, Error> {
    let header_val = headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or(Error::Unauthorized)?;

    let encoded = header_val
      .strip_prefix("Basic ")
      .ok_or(Error::Unauthorized)?;

    let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
    let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

    let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

    let Some(user) = self.users.iter().find(|u| u.username == username) else {
      debug!(username, "unknown user");
      return Err(Error::Unauthorized);
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
      .map_err(|_| Error::BadPasswordHash(user.username.clone()))?;

    Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .map_err(|_| {
        debug!(username, "wrong password");
        Error::Unauthorized
      })?;

    Ok(user.user_id)
  }
}

/// Middleware: reject unauthenticated requests, tag the rest with
/// [`CurrentUser`].
pub async fn require_user(
  State(auth): State<AuthConfig>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let user_id = auth.verify(req.headers()).inspect_err(|e| {
    if let Error::BadPasswordHash(_) = e {
      error!(error = %e, "rejecting request");
    }
  })?;
  req.extensions_mut().insert(CurrentUser(user_id));
  Ok(next.run(req).await)
}
