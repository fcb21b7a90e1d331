//! Error types for `closet-core`.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::association::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
  /// The caller does not own the day plan. A normal negative result.
  #[error("day plan {0} is not owned by the caller")]
  Unauthorized(Uuid),

  #[error("day plan not found: {0}")]
  NotFound(Uuid),

  #[error("a day plan already exists for {date}: {existing}")]
  DuplicateDayPlan { date: NaiveDate, existing: Uuid },

  /// A concurrent writer changed the same group twice in a row.
  #[error("concurrent update to {kind}s of day plan {day_plan_id}; try again")]
  PersistentConflict { day_plan_id: Uuid, kind: EntityKind },

  /// The backing store failed. Not retried here.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
