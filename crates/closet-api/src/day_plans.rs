//! Handlers for `/day-plans` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/day-plans` | Optional `?from=YYYY-MM-DD&to=YYYY-MM-DD` |
//! | `POST`   | `/day-plans` | Body: `{"date":"2024-05-01"}`; 201, 409 if the date is taken |
//! | `GET`    | `/day-plans/{id}` | 404 if missing or not the caller's |
//! | `DELETE` | `/day-plans/{id}` | Detaches all items and outfits, then deletes; 204 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use closet_core::{
  AssociationService,
  day_plan::{DayPlan, DayPlanRange},
  store::{AssociationStore, DayPlanStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, user::CurrentUser};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
}

/// `GET /day-plans[?from=<date>][&to=<date>]`
pub async fn list<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<DayPlan>>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  if let (Some(from), Some(to)) = (params.from, params.to)
    && from > to
  {
    return Err(ApiError::BadRequest(format!("`from` ({from}) is after `to` ({to})")));
  }

  let range = DayPlanRange { from: params.from, to: params.to };
  let plans = service.list_day_plans(user_id, range).await?;
  Ok(Json(plans))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub date: NaiveDate,
}

/// `POST /day-plans` body: `{"date":"2024-05-01"}`
pub async fn create<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  let plan = service.create_day_plan(user_id, body.date).await?;
  Ok((StatusCode::CREATED, Json(plan)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /day-plans/{id}`
pub async fn get_one<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<DayPlan>, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  Ok(Json(service.get_day_plan(id, user_id).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /day-plans/{id}`
pub async fn delete_one<S>(
  State(service): State<AssociationService<S>>,
  CurrentUser(user_id): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DayPlanStore + AssociationStore + 'static,
{
  service.delete_day_plan(id, user_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
