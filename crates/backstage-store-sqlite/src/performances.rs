//! Performance queries and writes, including full-text search over the
//! `performances_fts` index.

use backstage_core::performance::{
  NewPerformance, Performance, PerformancePatch, PerformanceQuery, SessionSlot,
  normalize_tags,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter, types::Value};

use crate::{
  Result,
  encode::{
    PERFORMANCE_COLUMNS, RawPerformance, encode_classification, encode_crew, encode_dt,
    encode_strings, stored_precision, text,
  },
  sessions, theaters,
};

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn find(conn: &Connection, id: i64) -> Result<Option<Performance>> {
  let sql = format!("SELECT {PERFORMANCE_COLUMNS} FROM performances p WHERE p.id = ?1");
  let Some(raw) = conn
    .query_row(&sql, params![id], RawPerformance::from_row)
    .optional()?
  else {
    return Ok(None);
  };
  let mut by_id = sessions::for_performances(conn, &[id])?;
  let sessions = by_id.remove(&id).unwrap_or_default();
  raw.into_performance(sessions).map(Some)
}

fn find_required(conn: &Connection, id: i64) -> Result<Performance> {
  find(conn, id)?.ok_or_else(|| backstage_core::Error::PerformanceNotFound(id).into())
}

pub fn list(conn: &Connection, query: &PerformanceQuery) -> Result<Vec<Performance>> {
  query.validate()?;

  let mut clauses: Vec<String> = Vec::new();
  let mut values: Vec<Value> = Vec::new();

  if let Some(expr) = query.q.as_deref().and_then(fts_match) {
    clauses.push(
      "p.id IN (SELECT rowid FROM performances_fts WHERE performances_fts MATCH ?)".into(),
    );
    values.push(text(expr));
  }
  if let Some(season) = query.season {
    clauses.push("p.season = ?".into());
    values.push(Value::Integer(season.into()));
  }
  if let Some(classification) = query.classification {
    clauses.push("p.classification = ?".into());
    values.push(text(encode_classification(classification)));
  }
  for tag in query.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
    clauses.push("EXISTS (SELECT 1 FROM json_each(p.tags) WHERE json_each.value = ?)".into());
    values.push(text(tag));
  }
  if query.filters_sessions() {
    // One session has to satisfy the theater and date conditions together.
    let mut inner = String::from("SELECT 1 FROM sessions s WHERE s.performance_id = p.id");
    if let Some(theater_id) = query.theater_id {
      inner.push_str(" AND s.theater_id = ?");
      values.push(Value::Integer(theater_id));
    }
    if let Some(from) = query.date_from {
      inner.push_str(" AND s.starts_at >= ?");
      values.push(text(encode_dt(from)));
    }
    if let Some(to) = query.date_to {
      inner.push_str(" AND s.starts_at <= ?");
      values.push(text(encode_dt(to)));
    }
    clauses.push(format!("EXISTS ({inner})"));
  }

  let mut sql = format!("SELECT {PERFORMANCE_COLUMNS} FROM performances p");
  if !clauses.is_empty() {
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
  }
  sql.push_str(" ORDER BY p.season DESC, p.name, p.id LIMIT ? OFFSET ?");
  values.push(Value::Integer(query.limit() as i64));
  values.push(Value::Integer(query.skip() as i64));

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(values), RawPerformance::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let ids: Vec<i64> = raws.iter().map(|r| r.id).collect();
  let mut by_id = sessions::for_performances(conn, &ids)?;
  raws
    .into_iter()
    .map(|raw| {
      let sessions = by_id.remove(&raw.id).unwrap_or_default();
      raw.into_performance(sessions)
    })
    .collect()
}

/// Build an FTS5 query requiring every whitespace-separated term. Terms are
/// quoted so operators and column filters in user input stay literal. Terms
/// without a letter or digit tokenize to nothing and are dropped.
fn fts_match(q: &str) -> Option<String> {
  let terms: Vec<String> = q
    .split_whitespace()
    .filter(|t| t.chars().any(char::is_alphanumeric))
    .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
    .collect();
  if terms.is_empty() {
    None
  } else {
    Some(terms.join(" AND "))
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn insert(
  conn: &mut Connection,
  input: NewPerformance,
  now: DateTime<Utc>,
) -> Result<Performance> {
  input.validate()?;
  let now = stored_precision(now);

  let tx = conn.transaction()?;
  require_theaters(&tx, &input.theater_ids())?;

  tx.execute(
    "INSERT INTO performances (
       name, synopsis, tags, classification, season, dramaturgy, direction,
       cast_list, crew, banner, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
    params![
      input.name.trim(),
      input.synopsis,
      encode_strings(&normalize_tags(input.tags))?,
      encode_classification(input.classification),
      input.season,
      encode_strings(&input.dramaturgy)?,
      encode_strings(&input.direction)?,
      encode_strings(&input.cast)?,
      encode_crew(&input.crew)?,
      input.banner,
      encode_dt(now),
    ],
  )?;
  let id = tx.last_insert_rowid();
  insert_slots(&tx, id, &input.sessions, now)?;

  let performance = find_required(&tx, id)?;
  tx.commit()?;
  Ok(performance)
}

pub fn update(
  conn: &mut Connection,
  id: i64,
  mut patch: PerformancePatch,
  now: DateTime<Utc>,
) -> Result<Performance> {
  patch.validate()?;
  let now = stored_precision(now);

  let tx = conn.transaction()?;
  let mut performance = find_required(&tx, id)?;
  require_theaters(&tx, &patch.theater_ids())?;

  let replacement = patch.sessions.take();
  patch.apply_to(&mut performance, now);

  tx.execute(
    "UPDATE performances SET
       name = ?2, synopsis = ?3, tags = ?4, classification = ?5, season = ?6,
       dramaturgy = ?7, direction = ?8, cast_list = ?9, crew = ?10,
       banner = ?11, updated_at = ?12
     WHERE id = ?1",
    params![
      id,
      performance.name,
      performance.synopsis,
      encode_strings(&performance.tags)?,
      encode_classification(performance.classification),
      performance.season,
      encode_strings(&performance.dramaturgy)?,
      encode_strings(&performance.direction)?,
      encode_strings(&performance.cast)?,
      encode_crew(&performance.crew)?,
      performance.banner,
      encode_dt(performance.updated_at),
    ],
  )?;

  if let Some(slots) = replacement {
    tx.execute("DELETE FROM sessions WHERE performance_id = ?1", params![id])?;
    insert_slots(&tx, id, &slots, now)?;
  }

  let performance = find_required(&tx, id)?;
  tx.commit()?;
  Ok(performance)
}

/// Delete a performance and the sessions it owns.
pub fn delete(conn: &mut Connection, id: i64) -> Result<()> {
  let tx = conn.transaction()?;
  tx.execute("DELETE FROM sessions WHERE performance_id = ?1", params![id])?;
  let removed = tx.execute("DELETE FROM performances WHERE id = ?1", params![id])?;
  if removed == 0 {
    return Err(backstage_core::Error::PerformanceNotFound(id).into());
  }
  tx.commit()?;
  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn require_theaters(conn: &Connection, ids: &[i64]) -> Result<()> {
  let missing = theaters::missing_ids(conn, ids)?;
  if missing.is_empty() {
    Ok(())
  } else {
    Err(backstage_core::Error::MissingTheaters(missing).into())
  }
}

fn insert_slots(
  conn: &Connection,
  performance_id: i64,
  slots: &[SessionSlot],
  now: DateTime<Utc>,
) -> Result<()> {
  for slot in slots {
    sessions::insert_all(conn, slot.theater_id, Some(performance_id), &[slot.starts_at], now)?;
  }
  Ok(())
}
