//! A user's calendar-date record.
//!
//! Items and outfits are attached to a day plan through association records.
//! The association service never creates or deletes a day plan itself; that
//! is the job of the calendar side of the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single calendar day owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
  pub day_plan_id: Uuid,
  /// The owning user. Only this user may read or change the day plan's
  /// associations.
  pub user_id:     Uuid,
  pub date:        NaiveDate,
  pub created_at:  DateTime<Utc>,
}

impl DayPlan {
  pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.user_id == user_id }
}

/// Inclusive date bounds for [`crate::store::DayPlanStore::list_day_plans`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayPlanRange {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
}

impl DayPlanRange {
  pub fn contains(&self, date: NaiveDate) -> bool {
    self.from.is_none_or(|from| date >= from)
      && self.to.is_none_or(|to| date <= to)
  }
}
