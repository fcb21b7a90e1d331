//! Core types and services for Closet day-plan associations.
//!
//! This crate has no HTTP or database dependencies. It owns
//! the ownership check, the set reconciler, and the orchestration that keeps a
//! day plan's items and outfits consistent; storage is reached only through
//! the traits in [`store`].

// Native `async fn` in traits; the trait signatures spell out their `Send`
// bounds explicitly.
#![allow(async_fn_in_trait)]

pub mod association;
pub mod day_plan;
pub mod error;
pub mod guard;
pub mod reconcile;
pub mod service;
pub mod store;

pub use error::{Error, Result};
pub use service::AssociationService;

#[cfg(test)]
mod tests;
