//! HTTP server for Closet.
//!
//! Puts Basic auth and request tracing in front of the [`closet_api`] router,
//! which is mounted under `/api`.

pub mod auth;
pub mod error;

pub use error::Error;

use std::path::PathBuf;

use axum::{Router, middleware};
use closet_core::{
  AssociationService,
  store::{AssociationStore, DayPlanStore},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, UserConfig, require_user};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub users:      Vec<UserConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application [`Router`].
pub fn router<S>(service: AssociationService<S>, auth: AuthConfig) -> Router
where
  S: DayPlanStore + AssociationStore + 'static,
{
  let api = closet_api::api_router(service)
    .layer(middleware::from_fn_with_state(auth, require_user));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
