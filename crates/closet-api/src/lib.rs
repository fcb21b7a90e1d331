//! JSON REST API for Closet day plans.
//!
//! Exposes an axum [`Router`] backed by an [`AssociationService`] over any
//! store implementing [`DayPlanStore`] and [`AssociationStore`]. The caller's
//! identity arrives as a [`CurrentUser`] request extension; authentication,
//! TLS, and transport concerns are the embedding server's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", closet_api::api_router(service.clone()))
//! ```

pub mod associations;
pub mod day_plans;
pub mod error;
pub mod user;

use axum::{
  Router,
  routing::{get, put},
};
use closet_core::{
  AssociationService,
  store::{AssociationStore, DayPlanStore},
};

pub use error::ApiError;
pub use user::CurrentUser;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: AssociationService<S>) -> Router<()>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  Router::new()
    // Day plans
    .route(
      "/day-plans",
      get(day_plans::list::<S>).post(day_plans::create::<S>),
    )
    .route(
      "/day-plans/{id}",
      get(day_plans::get_one::<S>).delete(day_plans::delete_one::<S>),
    )
    // Attached items and outfits
    .route(
      "/day-plans/{id}/{kind}",
      get(associations::list::<S>)
        .put(associations::replace::<S>)
        .delete(associations::delete_all::<S>),
    )
    .route(
      "/day-plans/{id}/{kind}/{entity_id}",
      put(associations::add::<S>).delete(associations::remove::<S>),
    )
    // Reverse lookup
    .route("/items/{entity_id}/day-plans", get(associations::item_day_plans::<S>))
    .route("/outfits/{entity_id}/day-plans", get(associations::outfit_day_plans::<S>))
    .with_state(service)
}

// ─── Router tests ─────────────────────────────────────────────────────────────
