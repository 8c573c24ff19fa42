//! Sessions: single scheduled occurrences of a performance at a theater.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub id:             i64,
  pub starts_at:      DateTime<Utc>,
  pub theater_id:     i64,
  pub performance_id: Option<i64>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// A batch of sessions sharing one theater and (optionally) one performance.
///
/// Input to [`crate::store::CatalogStore::schedule_sessions`]; the store
/// checks both references before writing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBatch {
  pub theater_id:     i64,
  pub performance_id: Option<i64>,
  pub starts:         Vec<DateTime<Utc>>,
}

/// Parameters for [`crate::store::CatalogStore::list_sessions`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionQuery {
  pub theater_id:     Option<i64>,
  pub performance_id: Option<i64>,
}
