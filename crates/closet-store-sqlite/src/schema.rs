//! SQL schema for the Closet SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per user per calendar date. The version columns count committed
-- writes to each association group and back the optimistic conflict check.
CREATE TABLE IF NOT EXISTS day_plans (
    day_plan_id     TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    plan_date       TEXT NOT NULL,   -- YYYY-MM-DD
    created_at      TEXT NOT NULL,   -- ISO 8601 UTC
    items_version   INTEGER NOT NULL DEFAULT 0,
    outfits_version INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_id, plan_date)
);

-- Link tables. Rows are only ever inserted or deleted, never updated.
CREATE TABLE IF NOT EXISTS day_plan_items (
    day_plan_id TEXT NOT NULL REFERENCES day_plans(day_plan_id) ON DELETE CASCADE,
    entity_id   TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    PRIMARY KEY (day_plan_id, entity_id)
);

CREATE TABLE IF NOT EXISTS day_plan_outfits (
    day_plan_id TEXT NOT NULL REFERENCES day_plans(day_plan_id) ON DELETE CASCADE,
    entity_id   TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    PRIMARY KEY (day_plan_id, entity_id)
);

CREATE INDEX IF NOT EXISTS day_plans_user_date_idx   ON day_plans(user_id, plan_date);
CREATE INDEX IF NOT EXISTS day_plan_items_entity_idx   ON day_plan_items(entity_id, user_id);
CREATE INDEX IF NOT EXISTS day_plan_outfits_entity_idx ON day_plan_outfits(entity_id, user_id);

PRAGMA user_version = 1;
";
