//! Core types and trait definitions for the Backstage theater catalog.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// Backends implement `CatalogStore` with native `async fn`; the trait itself
// spells out the `Send` futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod geo;
pub mod media;
pub mod performance;
pub mod schedule;
pub mod session;
pub mod slug;
pub mod store;
pub mod theater;

pub use error::{Error, Result};
