//! Set reconciliation: current set + desired set → minimal insert/delete diff.
//!
//! Shared by every mutating operation on both entity kinds. `add` reconciles
//! against `current ∪ {id}`, `remove` against `current − {id}`, `delete_all`
//! against the empty set, and `replace` against the caller's set.

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

/// The writes needed to turn one set into another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
  #[serde(rename = "inserted")]
  pub to_insert: BTreeSet<Uuid>,
  #[serde(rename = "deleted")]
  pub to_delete: BTreeSet<Uuid>,
}

impl Diff {
  pub fn is_empty(&self) -> bool {
    self.to_insert.is_empty() && self.to_delete.is_empty()
  }

  /// Apply this diff to `current`, returning the resulting set.
  pub fn apply_to(&self, current: &BTreeSet<Uuid>) -> BTreeSet<Uuid> {
    current
      .difference(&self.to_delete)
      .chain(self.to_insert.iter())
      .copied()
      .collect()
  }
}

/// Compute the diff that transforms `current` into `desired`.
///
/// Elements in both sets are left alone.
pub fn reconcile(current: &BTreeSet<Uuid>, desired: &BTreeSet<Uuid>) -> Diff {
  Diff {
    to_insert: desired.difference(current).copied().collect(),
    to_delete: current.difference(desired).copied().collect(),
  }
}
