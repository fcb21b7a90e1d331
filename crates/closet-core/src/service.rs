//! Keeps a day plan's items and outfits in sync.
//!
//! Every mutation runs the same sequence: authorize, read the current group,
//! reconcile it against the desired set, and write the diff with an optimistic
//! version check. A conflicting write is retried once against freshly read
//! state; a second conflict is reported to the caller.

use std::{collections::BTreeSet, sync::Arc};

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  association::{ApplyOutcome, EntityKind},
  day_plan::{DayPlan, DayPlanRange},
  guard::OwnershipGuard,
  reconcile::{Diff, reconcile},
  store::{AssociationStore, DayPlanStore},
};

/// Attempts per mutation: the first try plus one retry after a conflict.
pub const MAX_ATTEMPTS: u32 = 2;

// ─── Service ─────────────────────────────────────────────────────────────────

/// The public association API for both entity kinds.
///
/// Stateless apart from the store handle; cloning is cheap.
pub struct AssociationService<S> {
  store: Arc<S>,
}

impl<S> Clone for AssociationService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S> AssociationService<S>
where
  S: DayPlanStore + AssociationStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Operations on the items attached to day plans.
  pub fn items(&self) -> Associations<'_, S> { self.kind(EntityKind::Item) }

  /// Operations on the outfits attached to day plans.
  pub fn outfits(&self) -> Associations<'_, S> { self.kind(EntityKind::Outfit) }

  pub fn kind(&self, kind: EntityKind) -> Associations<'_, S> {
    Associations { service: self, kind }
  }

  // ── Associations ──────────────────────────────────────────────────────────

  /// The entity ids of `kind` attached to the day plan.
  pub async fn get(
    &self,
    kind: EntityKind,
    day_plan_id: Uuid,
    user_id: Uuid,
  ) -> Result<BTreeSet<Uuid>> {
    self.authorize(day_plan_id, user_id).await?;
    let current = self
      .store
      .list_by_day_plan(day_plan_id, kind)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(day_plan_id))?;
    Ok(current.entity_ids)
  }

  /// Attach one entity. An empty diff means it was already attached.
  pub async fn add(
    &self,
    kind: EntityKind,
    day_plan_id: Uuid,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> Result<Diff> {
    self
      .reconcile_with(kind, day_plan_id, user_id, |current| {
        let mut desired = current.clone();
        desired.insert(entity_id);
        desired
      })
      .await
  }

  /// Make the day plan's `kind` associations exactly `desired`.
  pub async fn replace(
    &self,
    kind: EntityKind,
    day_plan_id: Uuid,
    desired: impl IntoIterator<Item = Uuid>,
    user_id: Uuid,
  ) -> Result<Diff> {
    let desired: BTreeSet<Uuid> = desired.into_iter().collect();
    self
      .reconcile_with(kind, day_plan_id, user_id, |_| desired.clone())
      .await
  }

  /// Detach one entity. An empty diff means it was not attached.
  pub async fn remove(
    &self,
    kind: EntityKind,
    day_plan_id: Uuid,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> Result<Diff> {
    self
      .reconcile_with(kind, day_plan_id, user_id, |current| {
        let mut desired = current.clone();
        desired.remove(&entity_id);
        desired
      })
      .await
  }

  /// Detach every entity of `kind`.
  pub async fn delete_all(
    &self,
    kind: EntityKind,
    day_plan_id: Uuid,
    user_id: Uuid,
  ) -> Result<Diff> {
    self
      .reconcile_with(kind, day_plan_id, user_id, |_| BTreeSet::new())
      .await
  }

  /// The caller's day plans that contain `entity_id`.
  pub async fn day_plans_for_entity(
    &self,
    kind: EntityKind,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> Result<BTreeSet<Uuid>> {
    self
      .store
      .list_by_entity(kind, entity_id, user_id)
      .await
      .map_err(Error::store)
  }

  // ── Day plans ─────────────────────────────────────────────────────────────

  pub async fn create_day_plan(
    &self,
    user_id: Uuid,
    date: NaiveDate,
  ) -> Result<DayPlan> {
    let existing = self
      .store
      .find_day_plan(user_id, date)
      .await
      .map_err(Error::store)?;
    if let Some(plan) = existing {
      return Err(Error::DuplicateDayPlan { date, existing: plan.day_plan_id });
    }

    let plan = match self.store.create_day_plan(user_id, date).await {
      Ok(plan) => plan,
      Err(err) => {
        // Lost a race with another create for the same date.
        if let Ok(Some(plan)) = self.store.find_day_plan(user_id, date).await {
          return Err(Error::DuplicateDayPlan { date, existing: plan.day_plan_id });
        }
        return Err(Error::store(err));
      }
    };
    debug!(day_plan_id = %plan.day_plan_id, %date, "created day plan");
    Ok(plan)
  }

  pub async fn get_day_plan(
    &self,
    day_plan_id: Uuid,
    user_id: Uuid,
  ) -> Result<DayPlan> {
    self.authorize(day_plan_id, user_id).await
  }

  pub async fn list_day_plans(
    &self,
    user_id: Uuid,
    range: DayPlanRange,
  ) -> Result<Vec<DayPlan>> {
    self
      .store
      .list_day_plans(user_id, range)
      .await
      .map_err(Error::store)
  }

  /// Delete a day plan together with all of its items and outfits.
  ///
  /// The store drops the plan and both association groups in one step, so a
  /// failure leaves everything in place.
  pub async fn delete_day_plan(
    &self,
    day_plan_id: Uuid,
    user_id: Uuid,
  ) -> Result<()> {
    self.authorize(day_plan_id, user_id).await?;

    let deleted = self
      .store
      .delete_day_plan(day_plan_id)
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound(day_plan_id));
    }
    debug!(%day_plan_id, "deleted day plan");
    Ok(())
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn authorize(&self, day_plan_id: Uuid, user_id: Uuid) -> Result<DayPlan> {
    OwnershipGuard::new(self.store.as_ref())
      .authorize(day_plan_id, user_id)
      .await?
      .into_result(day_plan_id)
  }

  /// Authorize, then read-reconcile-apply with at most [`MAX_ATTEMPTS`]
  /// tries. `desired` maps the freshly read set to the target set, so a retry
  /// recomputes the target from the state that won the race.
  async fn reconcile_with<F>(
    &self,
    kind: EntityKind,
    day_plan_id: Uuid,
    user_id: Uuid,
    desired: F,
  ) -> Result<Diff>
  where
    F: Fn(&BTreeSet<Uuid>) -> BTreeSet<Uuid> + Send,
  {
    self.authorize(day_plan_id, user_id).await?;

    for attempt in 1..=MAX_ATTEMPTS {
      let current = self
        .store
        .list_by_day_plan(day_plan_id, kind)
        .await
        .map_err(Error::store)?
        .ok_or(Error::NotFound(day_plan_id))?;

      let target = desired(&current.entity_ids);
      let diff = reconcile(&current.entity_ids, &target);
      if diff.is_empty() {
        return Ok(diff);
      }

      let outcome = self
        .store
        .apply_diff(day_plan_id, kind, user_id, &diff, current.version)
        .await
        .map_err(Error::store)?;

      match outcome {
        ApplyOutcome::Applied { version } => {
          debug!(
            %day_plan_id,
            %kind,
            version,
            inserted = diff.to_insert.len(),
            deleted = diff.to_delete.len(),
            "applied association diff"
          );
          return Ok(diff);
        }
        ApplyOutcome::Conflict => {
          debug!(%day_plan_id, %kind, attempt, "association write conflicted");
        }
        ApplyOutcome::Missing => return Err(Error::NotFound(day_plan_id)),
        ApplyOutcome::NotOwner => {
          debug!(%day_plan_id, %user_id, "store rejected write by non-owner");
          return Err(Error::Unauthorized(day_plan_id));
        }
      }
    }

    warn!(%day_plan_id, %kind, "giving up after repeated write conflicts");
    Err(Error::PersistentConflict { day_plan_id, kind })
  }
}

// ─── Per-kind handle ─────────────────────────────────────────────────────────

/// [`AssociationService`] operations bound to one [`EntityKind`].
pub struct Associations<'a, S> {
  service: &'a AssociationService<S>,
  kind:    EntityKind,
}

impl<S> Associations<'_, S>
where
  S: DayPlanStore + AssociationStore,
{
  pub fn kind(&self) -> EntityKind { self.kind }

  pub async fn get(&self, day_plan_id: Uuid, user_id: Uuid) -> Result<BTreeSet<Uuid>> {
    self.service.get(self.kind, day_plan_id, user_id).await
  }

  pub async fn add(
    &self,
    day_plan_id: Uuid,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> Result<Diff> {
    self.service.add(self.kind, day_plan_id, entity_id, user_id).await
  }

  pub async fn replace(
    &self,
    day_plan_id: Uuid,
    desired: impl IntoIterator<Item = Uuid>,
    user_id: Uuid,
  ) -> Result<Diff> {
    self.service.replace(self.kind, day_plan_id, desired, user_id).await
  }

  pub async fn remove(
    &self,
    day_plan_id: Uuid,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> Result<Diff> {
    self.service.remove(self.kind, day_plan_id, entity_id, user_id).await
  }

  pub async fn delete_all(&self, day_plan_id: Uuid, user_id: Uuid) -> Result<Diff> {
    self.service.delete_all(self.kind, day_plan_id, user_id).await
  }

  pub async fn day_plans_for_entity(
    &self,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> Result<BTreeSet<Uuid>> {
    self.service.day_plans_for_entity(self.kind, entity_id, user_id).await
  }
}
