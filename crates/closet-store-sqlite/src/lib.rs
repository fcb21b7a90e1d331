//! SQLite backend for Closet day plans and their associations.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every association write is a single
//! `IMMEDIATE` transaction guarded by a per-group version counter.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
