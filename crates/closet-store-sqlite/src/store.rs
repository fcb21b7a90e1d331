//! The SQLite implementation of [`DayPlanStore`] and
//! [`AssociationStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::{NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use closet_core::{
  association::{ApplyOutcome, AssociationSet, EntityKind},
  day_plan::{DayPlan, DayPlanRange},
  reconcile::Diff,
  store::{AssociationStore, DayPlanStore},
};

use crate::{
  Error, Result,
  encode::{
    DAY_PLAN_COLUMNS, RawDayPlan, decode_uuid, encode_date, encode_dt,
    encode_uuid, kind_table, kind_version_column,
  },
  schema::SCHEMA,
};

const DAY_PLAN_BY_ID: &str = "SELECT day_plan_id, user_id, plan_date, created_at
   FROM day_plans WHERE day_plan_id = ?1";

const DAY_PLAN_BY_DATE: &str = "SELECT day_plan_id, user_id, plan_date, created_at
   FROM day_plans WHERE user_id = ?1 AND plan_date = ?2";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Closet store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// run on the connection's own thread, one at a time.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What the write transaction saw, before it is mapped onto [`ApplyOutcome`].
enum WriteResult {
  Applied(i64),
  Conflict,
  Missing,
  NotOwner,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    info!(path = %path.display(), "opened day plan store");
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_day_plan(
    &self,
    sql: &'static str,
    first: String,
    second: Option<String>,
  ) -> Result<Option<DayPlan>> {
    let raw: Option<RawDayPlan> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let raw = match second {
          Some(second) => stmt
            .query_row(rusqlite::params![first, second], RawDayPlan::from_row)
            .optional()?,
          None => stmt
            .query_row(rusqlite::params![first], RawDayPlan::from_row)
            .optional()?,
        };
        Ok(raw)
      })
      .await?;

    raw.map(RawDayPlan::into_day_plan).transpose()
  }
}

// ─── DayPlanStore impl ───────────────────────────────────────────────────────

impl DayPlanStore for SqliteStore {
  type Error = Error;

  async fn create_day_plan(&self, user_id: Uuid, date: NaiveDate) -> Result<DayPlan> {
    let plan = DayPlan {
      day_plan_id: Uuid::new_v4(),
      user_id,
      date,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(plan.day_plan_id);
    let user_str = encode_uuid(user_id);
    let date_str = encode_date(date);
    let at_str   = encode_dt(plan.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO day_plans (day_plan_id, user_id, plan_date, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, user_str, date_str, at_str],
        );
        match result {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateDayPlan { user_id, date });
    }
    Ok(plan)
  }

  async fn get_day_plan(&self, day_plan_id: Uuid) -> Result<Option<DayPlan>> {
    self
      .query_day_plan(DAY_PLAN_BY_ID, encode_uuid(day_plan_id), None)
      .await
  }

  async fn find_day_plan(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DayPlan>> {
    self
      .query_day_plan(DAY_PLAN_BY_DATE, encode_uuid(user_id), Some(encode_date(date)))
      .await
  }

  async fn list_day_plans(&self, user_id: Uuid, range: DayPlanRange) -> Result<Vec<DayPlan>> {
    let user_str = encode_uuid(user_id);
    let from_str = range.from.map(encode_date);
    let to_str   = range.to.map(encode_date);

    let raws: Vec<RawDayPlan> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DAY_PLAN_COLUMNS} FROM day_plans
           WHERE user_id = ?1
             AND (?2 IS NULL OR plan_date >= ?2)
             AND (?3 IS NULL OR plan_date <= ?3)
           ORDER BY plan_date"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_str, from_str, to_str],
            RawDayPlan::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDayPlan::into_day_plan).collect()
  }

  async fn delete_day_plan(&self, day_plan_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(day_plan_id);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM day_plans WHERE day_plan_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }
}

// ─── AssociationStore impl ───────────────────────────────────────────────────

impl AssociationStore for SqliteStore {
  type Error = Error;

  async fn list_by_day_plan(
    &self,
    day_plan_id: Uuid,
    kind: EntityKind,
  ) -> Result<Option<AssociationSet>> {
    let id_str  = encode_uuid(day_plan_id);
    let table   = kind_table(kind);
    let version = kind_version_column(kind);

    let raw: Option<(i64, Vec<String>)> = self
      .conn
      .call(move |conn| {
        // One read transaction so the ids and the version agree.
        let tx = conn.transaction()?;
        let current: Option<i64> = tx
          .query_row(
            &format!("SELECT {version} FROM day_plans WHERE day_plan_id = ?1"),
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(current) = current else {
          return Ok(None);
        };

        let ids = {
          let mut stmt = tx.prepare(&format!(
            "SELECT entity_id FROM {table} WHERE day_plan_id = ?1"
          ))?;
          stmt
            .query_map(rusqlite::params![id_str], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?
        };
        tx.commit()?;
        Ok(Some((current, ids)))
      })
      .await?;

    let Some((version, ids)) = raw else {
      return Ok(None);
    };
    let entity_ids = ids
      .iter()
      .map(|s| decode_uuid(s))
      .collect::<Result<BTreeSet<_>>>()?;

    Ok(Some(AssociationSet { entity_ids, version: version as u64 }))
  }

  async fn list_by_entity(
    &self,
    kind: EntityKind,
    entity_id: Uuid,
    user_id: Uuid,
  ) -> Result<BTreeSet<Uuid>> {
    let entity_str = encode_uuid(entity_id);
    let user_str   = encode_uuid(user_id);
    let table      = kind_table(kind);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT day_plan_id FROM {table} WHERE entity_id = ?1 AND user_id = ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![entity_str, user_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn apply_diff(
    &self,
    day_plan_id: Uuid,
    kind: EntityKind,
    user_id: Uuid,
    diff: &Diff,
    expected_version: u64,
  ) -> Result<ApplyOutcome> {
    let id_str    = encode_uuid(day_plan_id);
    let user_str  = encode_uuid(user_id);
    let inserts: Vec<String> = diff.to_insert.iter().copied().map(encode_uuid).collect();
    let deletes: Vec<String> = diff.to_delete.iter().copied().map(encode_uuid).collect();
    let table     = kind_table(kind);
    let version   = kind_version_column(kind);
    let expected  = expected_version as i64;

    let result = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front so the version check and
        // the writes cannot interleave with another writer.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(String, i64)> = tx
          .query_row(
            &format!("SELECT user_id, {version} FROM day_plans WHERE day_plan_id = ?1"),
            rusqlite::params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let Some((owner, current)) = row else {
          return Ok(WriteResult::Missing);
        };
        if owner != user_str {
          return Ok(WriteResult::NotOwner);
        }
        if current != expected {
          return Ok(WriteResult::Conflict);
        }

        {
          let mut delete = tx.prepare(&format!(
            "DELETE FROM {table} WHERE day_plan_id = ?1 AND entity_id = ?2"
          ))?;
          for entity in &deletes {
            delete.execute(rusqlite::params![id_str, entity])?;
          }

          let mut insert = tx.prepare(&format!(
            "INSERT INTO {table} (day_plan_id, entity_id, user_id) VALUES (?1, ?2, ?3)"
          ))?;
          for entity in &inserts {
            insert.execute(rusqlite::params![id_str, entity, user_str])?;
          }
        }

        tx.execute(
          &format!("UPDATE day_plans SET {version} = {version} + 1 WHERE day_plan_id = ?1"),
          rusqlite::params![id_str],
        )?;
        tx.commit()?;

        Ok(WriteResult::Applied(current + 1))
      })
      .await?;

    match result {
      WriteResult::Applied(v) => Ok(ApplyOutcome::Applied { version: v as u64 }),
      WriteResult::Conflict => {
        debug!(%day_plan_id, %kind, expected_version, "stale association version");
        Ok(ApplyOutcome::Conflict)
      }
      WriteResult::Missing => Ok(ApplyOutcome::Missing),
      WriteResult::NotOwner => {
        debug!(%day_plan_id, %user_id, "write by non-owner refused");
        Ok(ApplyOutcome::NotOwner)
      }
    }
  }
}
