//! Session rows: scheduling batches, listing, and loading a performance's
//! sessions.

use std::collections::BTreeMap;

use backstage_core::session::{Session, SessionBatch, SessionQuery};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter, types::Value};

use crate::{
  Result,
  encode::{RawSession, SESSION_COLUMNS, encode_dt, stored_precision},
  theaters,
};

/// Insert one session per start time. Callers have already checked the
/// references and own the surrounding transaction.
pub fn insert_all(
  conn: &Connection,
  theater_id: i64,
  performance_id: Option<i64>,
  starts: &[DateTime<Utc>],
  now: DateTime<Utc>,
) -> Result<Vec<Session>> {
  let now = stored_precision(now);
  let mut stmt = conn.prepare(
    "INSERT INTO sessions (starts_at, theater_id, performance_id, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?4)",
  )?;

  let mut out = Vec::with_capacity(starts.len());
  for &starts_at in starts {
    let starts_at = stored_precision(starts_at);
    stmt.execute(params![encode_dt(starts_at), theater_id, performance_id, encode_dt(now)])?;
    out.push(Session {
      id: conn.last_insert_rowid(),
      starts_at,
      theater_id,
      performance_id,
      created_at: now,
      updated_at: now,
    });
  }
  Ok(out)
}

/// Check both references, then write the whole batch in one transaction.
pub fn schedule(conn: &mut Connection, batch: SessionBatch, now: DateTime<Utc>) -> Result<Vec<Session>> {
  let tx = conn.transaction()?;

  let missing = theaters::missing_ids(&tx, &[batch.theater_id])?;
  if !missing.is_empty() {
    return Err(backstage_core::Error::MissingTheaters(missing).into());
  }
  if let Some(performance_id) = batch.performance_id {
    let exists = tx
      .query_row(
        "SELECT 1 FROM performances WHERE id = ?1",
        params![performance_id],
        |_| Ok(()),
      )
      .optional()?
      .is_some();
    if !exists {
      return Err(backstage_core::Error::MissingPerformance(performance_id).into());
    }
  }

  let sessions = insert_all(&tx, batch.theater_id, batch.performance_id, &batch.starts, now)?;
  tx.commit()?;
  Ok(sessions)
}

pub fn list(conn: &Connection, query: &SessionQuery) -> Result<Vec<Session>> {
  let mut clauses: Vec<&str> = Vec::new();
  let mut values: Vec<Value> = Vec::new();
  if let Some(id) = query.theater_id {
    clauses.push("theater_id = ?");
    values.push(Value::Integer(id));
  }
  if let Some(id) = query.performance_id {
    clauses.push("performance_id = ?");
    values.push(Value::Integer(id));
  }

  let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions");
  if !clauses.is_empty() {
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
  }
  sql.push_str(" ORDER BY starts_at, id");

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(values), RawSession::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSession::into_session).collect()
}

/// Sessions of each listed performance, ordered by start time. Ids without
/// sessions map to an empty list.
pub fn for_performances(conn: &Connection, ids: &[i64]) -> Result<BTreeMap<i64, Vec<Session>>> {
  let mut grouped: BTreeMap<i64, Vec<Session>> =
    ids.iter().map(|&id| (id, Vec::new())).collect();
  if ids.is_empty() {
    return Ok(grouped);
  }

  let placeholders = vec!["?"; ids.len()].join(", ");
  let sql = format!(
    "SELECT {SESSION_COLUMNS} FROM sessions
     WHERE performance_id IN ({placeholders})
     ORDER BY starts_at, id"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(ids.iter().copied()), RawSession::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  for raw in raws {
    let session = raw.into_session()?;
    if let Some(pid) = session.performance_id {
      grouped.entry(pid).or_default().push(session);
    }
  }
  Ok(grouped)
}
