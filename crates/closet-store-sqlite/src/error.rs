//! Error type for `closet-store-sqlite`.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("user {user_id} already has a day plan for {date}")]
  DuplicateDayPlan { user_id: Uuid, date: NaiveDate },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
