//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, and UUIDs
//! are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use closet_core::{association::EntityKind, day_plan::DayPlan};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── EntityKind ───────────────────────────────────────────────────────────────

/// The link table holding associations of `kind`.
pub fn kind_table(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Item => "day_plan_items",
    EntityKind::Outfit => "day_plan_outfits",
  }
}

/// The `day_plans` column counting writes to the `kind` group.
pub fn kind_version_column(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Item => "items_version",
    EntityKind::Outfit => "outfits_version",
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawDayPlan::from_row`].
pub const DAY_PLAN_COLUMNS: &str = "day_plan_id, user_id, plan_date, created_at";

/// Raw strings read directly from a `day_plans` row.
pub struct RawDayPlan {
  pub day_plan_id: String,
  pub user_id:     String,
  pub plan_date:   String,
  pub created_at:  String,
}

impl RawDayPlan {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      day_plan_id: row.get(0)?,
      user_id:     row.get(1)?,
      plan_date:   row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_day_plan(self) -> Result<DayPlan> {
    Ok(DayPlan {
      day_plan_id: decode_uuid(&self.day_plan_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      date:        decode_date(&self.plan_date)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
