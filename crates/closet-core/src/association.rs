//! Association records linking wardrobe entities to day plans.
//!
//! An association is the tuple `(day_plan_id, entity_id, user_id)`. There is
//! one link table per [`EntityKind`]. Associations have no mutable fields: they
//! exist or they don't.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Entity kind ─────────────────────────────────────────────────────────────

/// The kind of wardrobe entity that can be attached to a day plan.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Item,
  Outfit,
}

impl EntityKind {
  pub const ALL: [EntityKind; 2] = [EntityKind::Item, EntityKind::Outfit];
}

// ─── Store read/write results ────────────────────────────────────────────────

/// The persisted associations of one `(day_plan_id, kind)` group together with
/// the version they were read at.
///
/// The version is bumped by every write that changes the group and is what
/// [`crate::store::AssociationStore::apply_diff`] compares against to detect
/// concurrent writers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationSet {
  pub entity_ids: BTreeSet<Uuid>,
  pub version:    u64,
}

/// Outcome of an optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
  /// The whole diff was written; the group is now at `version`.
  Applied { version: u64 },
  /// The group's version no longer matches the one the diff was computed
  /// against. Nothing was written.
  Conflict,
  /// The day plan no longer exists. Nothing was written.
  Missing,
  /// The day plan belongs to a different user. Nothing was written.
  NotOwner,
}
