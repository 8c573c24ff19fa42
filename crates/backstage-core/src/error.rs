//! Error types for `backstage-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("update contains no fields")]
  EmptyUpdate,

  #[error("theater not found: {0}")]
  TheaterNotFound(String),

  #[error("performance not found: {0}")]
  PerformanceNotFound(i64),

  #[error("slug already in use: {0}")]
  SlugConflict(String),

  /// One or more referenced theater ids do not exist.
  #[error("theater_id(s) do not exist: {0:?}")]
  MissingTheaters(Vec<i64>),

  #[error("performance_id does not exist: {0}")]
  MissingPerformance(i64),

  /// A theater cannot be deleted while sessions still point at it.
  #[error("theater {id} is referenced by {sessions} session(s)")]
  TheaterInUse { id: i64, sessions: u64 },

  #[error("storage backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
