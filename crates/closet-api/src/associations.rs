//! Handlers for the items and outfits attached to a day plan.
//!
//! `{kind}` is `items` or `outfits`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/day-plans/{id}/{kind}` | Attached entity ids |
//! | `PUT`    | `/day-plans/{id}/{kind}` | Body: `{"ids":[...]}`; replaces the whole set |
//! | `DELETE` | `/day-plans/{id}/{kind}` | Detaches everything of that kind |
//! | `PUT`    | `/day-plans/{id}/{kind}/{entity_id}` | Attach one; no-op if present |
//! | `DELETE` | `/day-plans/{id}/{kind}/{entity_id}` | Detach one; no-op if absent |
//! | `GET`    | `/items/{entity_id}/day-plans` | Caller's day plans using the item |
//! | `GET`    | `/outfits/{entity_id}/day-plans` | Caller's day plans using the outfit |
//!
//! Mutations answer with the applied diff: `{"inserted":[...],"deleted":[...]}`.

use std::collections::BTreeSet;

use axum::{
  Json,
  extract::{Path, State},
};
use closet_core::{
  AssociationService,
  association::EntityKind,
  reconcile::Diff,
  store::{AssociationStore, DayPlanStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, user::CurrentUser};

/// The plural path segment naming an [`EntityKind`].
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindSegment {
  Items,
  Outfits,
}

impl From<KindSegment> for EntityKind {
  fn from(k: KindSegment) -> Self {
    match k {
      KindSegment::Items => EntityKind::Item,
      KindSegment::Outfits => EntityKind::Outfit,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct AttachedBody {
  pub day_plan_id: Uuid,
  pub kind:        EntityKind,
  pub ids:         BTreeSet<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UsageBody {
  pub entity_id:    Uuid,
  pub kind:         EntityKind,
  pub day_plan_ids: BTreeSet<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceBody {
  pub ids: Vec<Uuid>,
}

// ─── Whole group ──────────────────────────────────────────────────────────────

/// `GET /day-plans/{id}/{kind}`
pub async fn list<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path((day_plan_id, kind)): Path<(Uuid, KindSegment)>,
) -> Result<Json<AttachedBody>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  let kind = EntityKind::from(kind);
  let ids = service.get(kind, day_plan_id, user_id).await?;
  Ok(Json(AttachedBody { day_plan_id, kind, ids }))
}

/// `PUT /day-plans/{id}/{kind}` body: `{"ids":[...]}`
pub async fn replace<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path((day_plan_id, kind)): Path<(Uuid, KindSegment)>,
  Json(body): Json<ReplaceBody>,
) -> Result<Json<Diff>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  let diff = service
    .replace(kind.into(), day_plan_id, body.ids, user_id)
    .await?;
  Ok(Json(diff))
}

/// `DELETE /day-plans/{id}/{kind}`
pub async fn delete_all<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path((day_plan_id, kind)): Path<(Uuid, KindSegment)>,
) -> Result<Json<Diff>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  Ok(Json(service.delete_all(kind.into(), day_plan_id, user_id).await?))
}

// ─── Single entity ────────────────────────────────────────────────────────────

/// `PUT /day-plans/{id}/{kind}/{entity_id}`
pub async fn add<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path((day_plan_id, kind, entity_id)): Path<(Uuid, KindSegment, Uuid)>,
) -> Result<Json<Diff>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  Ok(Json(service.add(kind.into(), day_plan_id, entity_id, user_id).await?))
}

/// `DELETE /day-plans/{id}/{kind}/{entity_id}`
pub async fn remove<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path((day_plan_id, kind, entity_id)): Path<(Uuid, KindSegment, Uuid)>,
) -> Result<Json<Diff>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  Ok(Json(service.remove(kind.into(), day_plan_id, entity_id, user_id).await?))
}

// ─── Reverse lookup ───────────────────────────────────────────────────────────

async fn usage<S>(
  service: &AssociationService<S>,
  kind: EntityKind,
  entity_id: Uuid,
  user_id: Uuid,
) -> Result<Json<UsageBody>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  let day_plan_ids = service.day_plans_for_entity(kind, entity_id, user_id).await?;
  Ok(Json(UsageBody { entity_id, kind, day_plan_ids }))
}

/// `GET /items/{entity_id}/day-plans`
pub async fn item_day_plans<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path(entity_id): Path<Uuid>,
) -> Result<Json<UsageBody>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  usage(&service, EntityKind::Item, entity_id, user_id).await
}

/// `GET /outfits/{entity_id}/day-plans`
pub async fn outfit_day_plans<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path(entity_id): Path<Uuid>,
) -> Result<Json<UsageBody>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  usage(&service, EntityKind::Outfit, entity_id, user_id).await
}
