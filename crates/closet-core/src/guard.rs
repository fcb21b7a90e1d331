//! Ownership check run before every association read or write.

use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result, day_plan::DayPlan, store::DayPlanStore};

/// Result of [`OwnershipGuard::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
  Authorized(DayPlan),
  /// The day plan exists but belongs to someone else.
  Unauthorized,
  NotFound,
}

impl Authorization {
  /// Turn a negative outcome into the matching [`Error`].
  pub fn into_result(self, day_plan_id: Uuid) -> Result<DayPlan> {
    match self {
      Self::Authorized(plan) => Ok(plan),
      Self::Unauthorized => Err(Error::Unauthorized(day_plan_id)),
      Self::NotFound => Err(Error::NotFound(day_plan_id)),
    }
  }
}

/// Verifies that a user owns a day plan. Holds no state of its own.
pub struct OwnershipGuard<'s, S> {
  store: &'s S,
}

impl<'s, S: DayPlanStore> OwnershipGuard<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  pub async fn authorize(
    &self,
    day_plan_id: Uuid,
    user_id: Uuid,
  ) -> Result<Authorization> {
    let plan = self
      .store
      .get_day_plan(day_plan_id)
      .await
      .map_err(Error::store)?;

    Ok(match plan {
      Some(plan) if plan.is_owned_by(user_id) => Authorization::Authorized(plan),
      Some(_) => {
        debug!(%day_plan_id, %user_id, "day plan owned by another user");
        Authorization::Unauthorized
      }
      None => {
        debug!(%day_plan_id, "day plan not found");
        Authorization::NotFound
      }
    })
  }
}
