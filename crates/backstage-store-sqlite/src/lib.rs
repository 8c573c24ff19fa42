//! SQLite backend for the Backstage catalog.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each store call runs one closure on
//! that thread; multi-statement writes run inside a single transaction.

mod encode;
mod performances;
mod schema;
mod sessions;
mod store;
mod theaters;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
