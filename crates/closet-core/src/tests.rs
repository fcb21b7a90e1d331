//! Service tests against an in-memory store.

use std::{
  collections::{BTreeSet, HashMap},
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU32, Ordering},
  },
};

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  AssociationService, Error,
  association::{ApplyOutcome, AssociationSet, EntityKind},
  day_plan::{DayPlan, DayPlanRange},
  guard::{Authorization, OwnershipGuard},
  reconcile::Diff,
  store::{AssociationStore, DayPlanStore},
};

// ─── In-memory store ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("memory store is offline")]
struct Offline;

#[derive(Default)]
struct State {
  plans:  HashMap<Uuid, DayPlan>,
  groups: HashMap<(Uuid, EntityKind), (BTreeSet<Uuid>, BTreeSet<Uuid>, u64)>,
}

/// A store that keeps everything in a mutex. Reads yield to the runtime so
/// that concurrent callers interleave between read and write.
#[derive(Default)]
struct MemoryStore {
  state:             Mutex<State>,
  offline:           AtomicBool,
  /// While non-zero, every write reports a conflict and decrements this.
  forced_conflicts:  AtomicU32,
  /// Writes and deletes fail while reads keep working.
  failing_writes:    AtomicBool,
  /// Hand the day plan to this user just before the next write lands.
  transfer_on_write: Mutex<Option<Uuid>>,
  apply_calls:       AtomicU32,
  writes:            AtomicU32,
}

impl MemoryStore {
  fn check(&self) -> Result<(), Offline> {
    if self.offline.load(Ordering::SeqCst) { Err(Offline) } else { Ok(()) }
  }

  fn check_write(&self) -> Result<(), Offline> {
    self.check()?;
    if self.failing_writes.load(Ordering::SeqCst) { Err(Offline) } else { Ok(()) }
  }

  fn entity_ids(&self, day_plan_id: Uuid, kind: EntityKind) -> BTreeSet<Uuid> {
    let state = self.state.lock().unwrap();
    state
      .groups
      .get(&(day_plan_id, kind))
      .map(|(ids, _, _)| ids.clone())
      .unwrap_or_default()
  }
}

impl DayPlanStore for MemoryStore {
  type Error = Offline;

  async fn create_day_plan(&self, user_id: Uuid, date: NaiveDate) -> Result<DayPlan, Offline> {
    self.check()?;
    let plan = DayPlan {
      day_plan_id: Uuid::new_v4(),
      user_id,
      date,
      created_at: Utc::now(),
    };
    self.state.lock().unwrap().plans.insert(plan.day_plan_id, plan.clone());
    Ok(plan)
  }

  async fn get_day_plan(&self, day_plan_id: Uuid) -> Result<Option<DayPlan>, Offline> {
    self.check()?;
    Ok(self.state.lock().unwrap().plans.get(&day_plan_id).cloned())
  }

  async fn find_day_plan(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DayPlan>, Offline> {
    self.check()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .plans
        .values()
        .find(|p| p.user_id == user_id && p.date == date)
        .cloned(),
    )
  }

  async fn list_day_plans(&self, user_id: Uuid, range: DayPlanRange) -> Result<Vec<DayPlan>, Offline> {
    self.check()?;
    let state = self.state.lock().unwrap();
    let mut plans: Vec<DayPlan> = state
      .plans
      .values()
      .filter(|p| p.user_id == user_id && range.contains(p.date))
      .cloned()
      .collect();
    plans.sort_by_key(|p| p.date);
    Ok(plans)
  }

  async fn delete_day_plan(&self, day_plan_id: Uuid) -> Result<bool, Offline> {
    self.check_write()?;
    let mut state = self.state.lock().unwrap();
    state.groups.retain(|(id, _), _| *id != day_plan_id);
    Ok(state.plans.remove(&day_plan_id).is_some())
  }
}

impl AssociationStore for MemoryStore {
  type Error = Offline;

  async fn list_by_day_plan(
    &self,
    day_plan_id: Uuid,
    kind: EntityKind,
  ) -> Result<Option<AssociationSet>, Offline> {
    self.check()?;
    let set = {
      let state = self.state.lock().unwrap();
      if !state.plans.contains_key(&day_plan_id) {
        return Ok(None);
      }
      let (entity_ids, version) = state
        .groups
        .get(&(day_plan_id, kind))
        .map(|(ids, _, v)| (ids.clone(), *v))
        .unwrap_or_default();
      AssociationSet { entity_ids, version }
    };
    tokio::task::yield_now().await;
    Ok(Some(set))
  }

  async fn list_by_entity(
    &self,
    kind: EntityKind,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> Result<BTreeSet<Uuid>, Offline> {
    self.check()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .groups
        .iter()
        .filter(|((_, k), (ids, owners, _))| {
          *k == kind && ids.contains(&entity_id) && owners.contains(&user_id)
        })
        .map(|((id, _), _)| *id)
        .collect(),
    )
  }

  async fn apply_diff(
    &self,
    day_plan_id: Uuid,
    kind: EntityKind,
    user_id: Uuid,
    diff: &Diff,
    expected_version: u64,
  ) -> Result<ApplyOutcome, Offline> {
    self.apply_calls.fetch_add(1, Ordering::SeqCst);
    self.check_write()?;
    if self
      .forced_conflicts
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
    {
      return Ok(ApplyOutcome::Conflict);
    }

    let mut state = self.state.lock().unwrap();
    if let Some(new_owner) = self.transfer_on_write.lock().unwrap().take()
      && let Some(plan) = state.plans.get_mut(&day_plan_id)
    {
      plan.user_id = new_owner;
    }
    match state.plans.get(&day_plan_id) {
      None => return Ok(ApplyOutcome::Missing),
      Some(plan) if !plan.is_owned_by(user_id) => return Ok(ApplyOutcome::NotOwner),
      Some(_) => {}
    }
    let (ids, owners, version) = state.groups.entry((day_plan_id, kind)).or_default();
    if *version != expected_version {
      return Ok(ApplyOutcome::Conflict);
    }
    *ids = diff.apply_to(ids);
    owners.insert(user_id);
    *version += 1;
    self.writes.fetch_add(1, Ordering::SeqCst);
    Ok(ApplyOutcome::Applied { version: *version })
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

struct Fixture {
  service: AssociationService<MemoryStore>,
  owner:   Uuid,
  plan:    DayPlan,
}

fn date(day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, day).unwrap() }

async fn fixture() -> Fixture {
  let service = AssociationService::new(Arc::new(MemoryStore::default()));
  let owner = Uuid::new_v4();
  let plan = service.create_day_plan(owner, date(1)).await.unwrap();
  Fixture { service, owner, plan }
}

fn set<const N: usize>(ids: [Uuid; N]) -> BTreeSet<Uuid> { ids.into_iter().collect() }

// ─── Ownership guard ─────────────────────────────────────────────────────────

#[tokio::test]
async fn guard_distinguishes_owner_stranger_and_missing() {
  let f = fixture().await;
  let guard = OwnershipGuard::new(f.service.store());

  let ok = guard.authorize(f.plan.day_plan_id, f.owner).await.unwrap();
  assert_eq!(ok, Authorization::Authorized(f.plan.clone()));

  let other = guard.authorize(f.plan.day_plan_id, Uuid::new_v4()).await.unwrap();
  assert_eq!(other, Authorization::Unauthorized);

  let missing = guard.authorize(Uuid::new_v4(), f.owner).await.unwrap();
  assert_eq!(missing, Authorization::NotFound);
}

// ─── Add / remove ────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_add_keeps_a_single_entry() {
  let f = fixture().await;
  let items = f.service.items();
  let x = Uuid::new_v4();

  let first = items.add(f.plan.day_plan_id, x, f.owner).await.unwrap();
  assert_eq!(first.to_insert, set([x]));

  for _ in 0..3 {
    let again = items.add(f.plan.day_plan_id, x, f.owner).await.unwrap();
    assert!(again.is_empty());
  }

  assert_eq!(items.get(f.plan.day_plan_id, f.owner).await.unwrap(), set([x]));
  assert_eq!(f.service.store().writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remove_absent_entity_is_a_noop() {
  let f = fixture().await;
  let diff = f
    .service
    .outfits()
    .remove(f.plan.day_plan_id, Uuid::new_v4(), f.owner)
    .await
    .unwrap();
  assert!(diff.is_empty());
  assert_eq!(f.service.store().writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn item_and_outfit_groups_are_independent() {
  let f = fixture().await;
  let id = Uuid::new_v4();

  f.service.items().add(f.plan.day_plan_id, id, f.owner).await.unwrap();

  assert!(f.service.outfits().get(f.plan.day_plan_id, f.owner).await.unwrap().is_empty());
  assert_eq!(f.service.items().get(f.plan.day_plan_id, f.owner).await.unwrap(), set([id]));
}

// ─── Replace ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_then_remove_walkthrough() {
  let f = fixture().await;
  let items = f.service.items();
  let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  let plan = f.plan.day_plan_id;

  items.replace(plan, [a, b], f.owner).await.unwrap();

  let diff = items.replace(plan, [b, c], f.owner).await.unwrap();
  assert_eq!(diff.to_insert, set([c]));
  assert_eq!(diff.to_delete, set([a]));
  assert_eq!(items.get(plan, f.owner).await.unwrap(), set([b, c]));

  items.remove(plan, b, f.owner).await.unwrap();
  assert_eq!(items.get(plan, f.owner).await.unwrap(), set([c]));
}

#[tokio::test]
async fn replace_accepts_duplicate_input_ids() {
  let f = fixture().await;
  let x = Uuid::new_v4();

  f.service.outfits().replace(f.plan.day_plan_id, vec![x, x, x], f.owner).await.unwrap();

  assert_eq!(f.service.outfits().get(f.plan.day_plan_id, f.owner).await.unwrap(), set([x]));
}

#[tokio::test]
async fn delete_all_empties_the_group() {
  let f = fixture().await;
  let items = f.service.items();
  let plan = f.plan.day_plan_id;
  items.replace(plan, [Uuid::new_v4(), Uuid::new_v4()], f.owner).await.unwrap();

  let diff = items.delete_all(plan, f.owner).await.unwrap();

  assert_eq!(diff.to_delete.len(), 2);
  assert!(items.get(plan, f.owner).await.unwrap().is_empty());
}

// ─── Authorization gating ────────────────────────────────────────────────────

#[tokio::test]
async fn stranger_cannot_read_or_mutate() {
  let f = fixture().await;
  let items = f.service.items();
  let plan = f.plan.day_plan_id;
  let kept = Uuid::new_v4();
  items.add(plan, kept, f.owner).await.unwrap();

  let stranger = Uuid::new_v4();
  let x = Uuid::new_v4();
  assert!(matches!(items.get(plan, stranger).await, Err(Error::Unauthorized(id)) if id == plan));
  assert!(matches!(items.add(plan, x, stranger).await, Err(Error::Unauthorized(_))));
  assert!(matches!(items.replace(plan, [x], stranger).await, Err(Error::Unauthorized(_))));
  assert!(matches!(items.remove(plan, kept, stranger).await, Err(Error::Unauthorized(_))));
  assert!(matches!(items.delete_all(plan, stranger).await, Err(Error::Unauthorized(_))));
  assert!(matches!(
    f.service.delete_day_plan(plan, stranger).await,
    Err(Error::Unauthorized(_))
  ));

  assert_eq!(items.get(plan, f.owner).await.unwrap(), set([kept]));
}

#[tokio::test]
async fn unknown_day_plan_is_not_found() {
  let f = fixture().await;
  let missing = Uuid::new_v4();
  let err = f.service.items().add(missing, Uuid::new_v4(), f.owner).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(id) if id == missing));
}

// ─── Reverse lookup ──────────────────────────────────────────────────────────

#[tokio::test]
async fn reverse_lookup_follows_add_and_remove() {
  let f = fixture().await;
  let dp1 = f.plan.day_plan_id;
  let dp2 = f.service.create_day_plan(f.owner, date(2)).await.unwrap().day_plan_id;
  let outfits = f.service.outfits();
  let e = Uuid::new_v4();

  outfits.add(dp1, e, f.owner).await.unwrap();
  outfits.add(dp2, e, f.owner).await.unwrap();
  assert_eq!(outfits.day_plans_for_entity(e, f.owner).await.unwrap(), set([dp1, dp2]));

  outfits.remove(dp1, e, f.owner).await.unwrap();
  assert_eq!(outfits.day_plans_for_entity(e, f.owner).await.unwrap(), set([dp2]));

  // Only the caller's own day plans are visible.
  assert!(outfits.day_plans_for_entity(e, Uuid::new_v4()).await.unwrap().is_empty());
}

// ─── Conflicts ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_conflict_is_retried() {
  let f = fixture().await;
  f.service.store().forced_conflicts.store(1, Ordering::SeqCst);
  let x = Uuid::new_v4();

  let diff = f.service.items().add(f.plan.day_plan_id, x, f.owner).await.unwrap();

  assert_eq!(diff.to_insert, set([x]));
  assert_eq!(f.service.store().entity_ids(f.plan.day_plan_id, EntityKind::Item), set([x]));
}

#[tokio::test]
async fn second_conflict_is_surfaced() {
  let f = fixture().await;
  f.service.store().forced_conflicts.store(2, Ordering::SeqCst);

  let err = f
    .service
    .outfits()
    .replace(f.plan.day_plan_id, [Uuid::new_v4()], f.owner)
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    Error::PersistentConflict { day_plan_id, kind: EntityKind::Outfit }
      if day_plan_id == f.plan.day_plan_id
  ));
  assert!(f.service.store().entity_ids(f.plan.day_plan_id, EntityKind::Outfit).is_empty());
}

#[tokio::test]
async fn concurrent_replaces_leave_one_whole_set() {
  let f = fixture().await;
  let plan = f.plan.day_plan_id;
  let s1 = set([Uuid::new_v4(), Uuid::new_v4()]);
  let s2 = set([Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()]);

  let items = f.service.items();
  let (r1, r2) = tokio::join!(
    items.replace(plan, s1.clone(), f.owner),
    items.replace(plan, s2.clone(), f.owner),
  );
  r1.unwrap();
  r2.unwrap();

  let stored = items.get(plan, f.owner).await.unwrap();
  assert!(stored == s1 || stored == s2, "merged or corrupted set: {stored:?}");
}

// ─── Store failures ──────────────────────────────────────────────────────────

#[tokio::test]
async fn store_failure_is_surfaced_immediately() {
  let f = fixture().await;
  f.service.store().offline.store(true, Ordering::SeqCst);

  let err = f.service.items().get(f.plan.day_plan_id, f.owner).await.unwrap_err();
  assert!(matches!(err, Error::StoreUnavailable(_)));
}

#[tokio::test]
async fn failed_write_is_not_retried() {
  let f = fixture().await;
  let store = f.service.store();
  let plan = f.plan.day_plan_id;
  let kept = Uuid::new_v4();
  f.service.items().add(plan, kept, f.owner).await.unwrap();
  let writes_before = store.writes.load(Ordering::SeqCst);
  let calls_before = store.apply_calls.load(Ordering::SeqCst);

  store.failing_writes.store(true, Ordering::SeqCst);
  let err = f
    .service
    .items()
    .replace(plan, [Uuid::new_v4()], f.owner)
    .await
    .unwrap_err();

  assert!(matches!(err, Error::StoreUnavailable(_)));
  assert_eq!(store.apply_calls.load(Ordering::SeqCst), calls_before + 1);
  assert_eq!(store.writes.load(Ordering::SeqCst), writes_before);
  assert_eq!(store.entity_ids(plan, EntityKind::Item), set([kept]));
}

#[tokio::test]
async fn store_side_ownership_refusal_is_unauthorized() {
  let f = fixture().await;
  let store = f.service.store();
  let plan = f.plan.day_plan_id;
  // The plan changes hands between the guard's check and the write.
  *store.transfer_on_write.lock().unwrap() = Some(Uuid::new_v4());

  let err = f
    .service
    .outfits()
    .add(plan, Uuid::new_v4(), f.owner)
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Unauthorized(id) if id == plan));
  assert_eq!(store.apply_calls.load(Ordering::SeqCst), 1);
  assert!(store.entity_ids(plan, EntityKind::Outfit).is_empty());
}

// ─── Day plans ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_date_is_rejected() {
  let f = fixture().await;
  let err = f.service.create_day_plan(f.owner, date(1)).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateDayPlan { existing, .. } if existing == f.plan.day_plan_id));

  // A different user may plan the same date.
  f.service.create_day_plan(Uuid::new_v4(), date(1)).await.unwrap();
}

#[tokio::test]
async fn deleting_a_day_plan_detaches_everything() {
  let f = fixture().await;
  let plan = f.plan.day_plan_id;
  let item = Uuid::new_v4();
  let outfit = Uuid::new_v4();
  f.service.items().add(plan, item, f.owner).await.unwrap();
  f.service.outfits().add(plan, outfit, f.owner).await.unwrap();

  f.service.delete_day_plan(plan, f.owner).await.unwrap();

  assert!(f.service.items().day_plans_for_entity(item, f.owner).await.unwrap().is_empty());
  assert!(f.service.outfits().day_plans_for_entity(outfit, f.owner).await.unwrap().is_empty());
  assert!(matches!(
    f.service.get_day_plan(plan, f.owner).await,
    Err(Error::NotFound(_))
  ));
}

#[tokio::test]
async fn deleting_a_day_plan_does_not_go_through_association_writes() {
  let f = fixture().await;
  let plan = f.plan.day_plan_id;
  f.service.items().add(plan, Uuid::new_v4(), f.owner).await.unwrap();
  f.service.outfits().add(plan, Uuid::new_v4(), f.owner).await.unwrap();
  let calls_before = f.service.store().apply_calls.load(Ordering::SeqCst);
  f.service.store().forced_conflicts.store(2, Ordering::SeqCst);

  f.service.delete_day_plan(plan, f.owner).await.unwrap();

  assert_eq!(f.service.store().apply_calls.load(Ordering::SeqCst), calls_before);
  assert!(matches!(
    f.service.get_day_plan(plan, f.owner).await,
    Err(Error::NotFound(_))
  ));
}

#[tokio::test]
async fn failed_day_plan_delete_leaves_everything_in_place() {
  let f = fixture().await;
  let plan = f.plan.day_plan_id;
  let item = Uuid::new_v4();
  let outfit = Uuid::new_v4();
  f.service.items().add(plan, item, f.owner).await.unwrap();
  f.service.outfits().add(plan, outfit, f.owner).await.unwrap();

  f.service.store().failing_writes.store(true, Ordering::SeqCst);
  let err = f.service.delete_day_plan(plan, f.owner).await.unwrap_err();
  assert!(matches!(err, Error::StoreUnavailable(_)));
  f.service.store().failing_writes.store(false, Ordering::SeqCst);

  assert_eq!(f.service.get_day_plan(plan, f.owner).await.unwrap().day_plan_id, plan);
  assert_eq!(f.service.items().get(plan, f.owner).await.unwrap(), set([item]));
  assert_eq!(f.service.outfits().get(plan, f.owner).await.unwrap(), set([outfit]));
}

#[tokio::test]
async fn list_day_plans_respects_range() {
  let f = fixture().await;
  f.service.create_day_plan(f.owner, date(5)).await.unwrap();
  f.service.create_day_plan(f.owner, date(9)).await.unwrap();

  let range = DayPlanRange { from: Some(date(2)), to: Some(date(9)) };
  let plans = f.service.list_day_plans(f.owner, range).await.unwrap();

  let dates: Vec<_> = plans.iter().map(|p| p.date).collect();
  assert_eq!(dates, vec![date(5), date(9)]);
}
