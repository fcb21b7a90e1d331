//! The storage traits consumed by the association service.
//!
//! Implemented by storage backends (e.g. `closet-store-sqlite`). The service
//! and the HTTP layer depend on these abstractions, never on a concrete
//! backend.

use std::{collections::BTreeSet, future::Future};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  association::{ApplyOutcome, AssociationSet, EntityKind},
  day_plan::{DayPlan, DayPlanRange},
  reconcile::Diff,
};

// ─── Day plans ───────────────────────────────────────────────────────────────

/// The calendar side of the store: day plans themselves.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DayPlanStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create a day plan for `user_id` on `date`.
  ///
  /// A user has at most one day plan per date; creating a second one is an
  /// error.
  fn create_day_plan(
    &self,
    user_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<DayPlan, Self::Error>> + Send + '_;

  /// Retrieve a day plan by UUID. Returns `None` if not found.
  fn get_day_plan(
    &self,
    day_plan_id: Uuid,
  ) -> impl Future<Output = Result<Option<DayPlan>, Self::Error>> + Send + '_;

  /// Retrieve the user's day plan for a given date, if any.
  fn find_day_plan(
    &self,
    user_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<DayPlan>, Self::Error>> + Send + '_;

  /// List the user's day plans within `range`, ordered by date.
  fn list_day_plans(
    &self,
    user_id: Uuid,
    range: DayPlanRange,
  ) -> impl Future<Output = Result<Vec<DayPlan>, Self::Error>> + Send + '_;

  /// Delete a day plan and every association of both kinds, atomically.
  /// Returns `false` if there was nothing to delete.
  fn delete_day_plan(
    &self,
    day_plan_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Associations ────────────────────────────────────────────────────────────

/// Link records between day plans and wardrobe entities, one group per
/// `(day_plan_id, kind)`.
pub trait AssociationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the current group and its version. Returns `None` if the day plan
  /// does not exist.
  fn list_by_day_plan(
    &self,
    day_plan_id: Uuid,
    kind: EntityKind,
  ) -> impl Future<Output = Result<Option<AssociationSet>, Self::Error>> + Send + '_;

  /// Reverse lookup: the day plans of `user_id` that contain `entity_id`.
  fn list_by_entity(
    &self,
    kind: EntityKind,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<BTreeSet<Uuid>, Self::Error>> + Send + '_;

  /// Write `diff` to one group as a single atomic unit.
  ///
  /// The write only lands if the group is still at `expected_version`;
  /// otherwise [`ApplyOutcome::Conflict`] is returned and nothing changes.
  /// A `user_id` other than the day plan's owner yields
  /// [`ApplyOutcome::NotOwner`].
  fn apply_diff<'a>(
    &'a self,
    day_plan_id: Uuid,
    kind: EntityKind,
    user_id: Uuid,
    diff: &'a Diff,
    expected_version: u64,
  ) -> impl Future<Output = Result<ApplyOutcome, Self::Error>> + Send + 'a;
}
