//! Theater queries and writes. Every function here runs on the connection
//! thread, inside a `tokio_rusqlite::Connection::call` closure.

use std::collections::BTreeSet;

use backstage_core::{
  slug::fold,
  theater::{NewTheater, Theater, TheaterPatch, TheaterQuery},
};
use chrono::{DateTime, Utc};
use rusqlite::{
  Connection, ErrorCode, OptionalExtension as _, params, params_from_iter,
  types::Value,
};

use crate::{
  Error, Result,
  encode::{RawTheater, THEATER_COLUMNS, encode_dt, stored_precision, text},
};

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Resolve an id-or-slug key. A numeric key matching an id wins over a slug
/// that happens to look like a number.
pub fn find(conn: &Connection, key: &str) -> Result<Option<Theater>> {
  let id = key.parse::<i64>().ok();
  let sql = format!(
    "SELECT {THEATER_COLUMNS} FROM theaters
     WHERE id = ?1 OR slug = ?2
     ORDER BY CASE WHEN id = ?1 THEN 0 ELSE 1 END
     LIMIT 1"
  );
  conn
    .query_row(&sql, params![id, key], RawTheater::from_row)
    .optional()?
    .map(RawTheater::into_theater)
    .transpose()
}

fn find_required(conn: &Connection, key: &str) -> Result<Theater> {
  find(conn, key)?
    .ok_or_else(|| backstage_core::Error::TheaterNotFound(key.to_owned()).into())
}

pub fn list(conn: &Connection, query: &TheaterQuery) -> Result<Vec<Theater>> {
  query.validate()?;

  let mut clauses: Vec<&str> = Vec::new();
  let mut values: Vec<Value> = Vec::new();

  if let Some(name) = query.name.as_deref().filter(|s| !s.is_empty()) {
    clauses.push("instr(fold(name), ?) > 0");
    values.push(text(fold(name)));
  }
  for (clause, value) in [
    ("fold(city) = ?", &query.city),
    ("fold(state) = ?", &query.state),
    ("fold(neighborhood) = ?", &query.neighborhood),
  ] {
    if let Some(v) = value {
      clauses.push(clause);
      values.push(text(fold(v)));
    }
  }
  if let Some(slug) = &query.slug {
    clauses.push("slug = ?");
    values.push(text(slug.as_str()));
  }
  if query.near.is_some() {
    clauses.push("lng IS NOT NULL AND lat IS NOT NULL");
  }

  let mut sql = format!("SELECT {THEATER_COLUMNS} FROM theaters");
  if !clauses.is_empty() {
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
  }

  let Some(center) = query.near else {
    sql.push_str(" ORDER BY name COLLATE NOCASE, id LIMIT ? OFFSET ?");
    values.push(Value::Integer(query.limit() as i64));
    values.push(Value::Integer(query.skip() as i64));
    return collect(conn, &sql, values);
  };

  // Proximity: distances are computed here, so paginate after sorting.
  let mut ranked: Vec<(f64, Theater)> = collect(conn, &sql, values)?
    .into_iter()
    .filter_map(|t| {
      let d = t.location.as_ref()?.distance_m(&center);
      Some((d, t))
    })
    .filter(|(d, _)| query.max_distance_m.is_none_or(|max| *d <= max))
    .collect();
  ranked.sort_by(|(da, a), (db, b)| da.total_cmp(db).then(a.id.cmp(&b.id)));

  Ok(
    ranked
      .into_iter()
      .skip(query.skip())
      .take(query.limit())
      .map(|(_, t)| t)
      .collect(),
  )
}

fn collect(conn: &Connection, sql: &str, values: Vec<Value>) -> Result<Vec<Theater>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params_from_iter(values), RawTheater::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTheater::into_theater).collect()
}

/// Of the given theater ids, those with no row. One query for the batch.
pub fn missing_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<i64>> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }
  let placeholders = vec!["?"; ids.len()].join(", ");
  let sql = format!("SELECT id FROM theaters WHERE id IN ({placeholders})");
  let mut stmt = conn.prepare(&sql)?;
  let found = stmt
    .query_map(params_from_iter(ids.iter().copied()), |r| r.get::<_, i64>(0))?
    .collect::<rusqlite::Result<BTreeSet<_>>>()?;

  let mut missing: Vec<i64> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
  missing.sort_unstable();
  missing.dedup();
  Ok(missing)
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn insert(conn: &mut Connection, input: NewTheater, now: DateTime<Utc>) -> Result<Theater> {
  input.validate()?;
  let slug = input.resolved_slug()?;
  let now = stored_precision(now);

  let tx = conn.transaction()?;
  if slug_taken(&tx, &slug, None)? {
    return Err(backstage_core::Error::SlugConflict(slug).into());
  }

  let mut theater = Theater {
    id: 0,
    name: input.name.trim().to_owned(),
    slug,
    address: input.address,
    location: input.location,
    contacts: input.contacts,
    photo: input.photo,
    created_at: now,
    updated_at: now,
  };
  theater.address.country.make_ascii_uppercase();

  let a = &theater.address;
  let c = &theater.contacts;
  tx.execute(
    "INSERT INTO theaters (
       name, slug, street, number, neighborhood, city, state, postal_code,
       country, lng, lat, website, instagram, phone, email, photo,
       created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
    params![
      theater.name,
      theater.slug,
      a.street,
      a.number,
      a.neighborhood,
      a.city,
      a.state,
      a.postal_code,
      a.country,
      theater.location.map(|p| p.lng),
      theater.location.map(|p| p.lat),
      c.website,
      c.instagram,
      c.phone,
      c.email,
      theater.photo,
      encode_dt(now),
      encode_dt(now),
    ],
  )
  .map_err(|e| slug_conflict(e, &theater.slug))?;
  theater.id = tx.last_insert_rowid();
  tx.commit()?;

  Ok(theater)
}

pub fn update(
  conn: &mut Connection,
  key: &str,
  patch: TheaterPatch,
  now: DateTime<Utc>,
) -> Result<Theater> {
  patch.validate()?;

  let tx = conn.transaction()?;
  let mut theater = find_required(&tx, key)?;
  if let Some(slug) = &patch.slug
    && slug_taken(&tx, slug, Some(theater.id))?
  {
    return Err(backstage_core::Error::SlugConflict(slug.clone()).into());
  }

  patch.apply_to(&mut theater, stored_precision(now));
  theater.address.country.make_ascii_uppercase();

  let a = &theater.address;
  let c = &theater.contacts;
  tx.execute(
    "UPDATE theaters SET
       name = ?2, slug = ?3, street = ?4, number = ?5, neighborhood = ?6,
       city = ?7, state = ?8, postal_code = ?9, country = ?10, lng = ?11,
       lat = ?12, website = ?13, instagram = ?14, phone = ?15, email = ?16,
       photo = ?17, updated_at = ?18
     WHERE id = ?1",
    params![
      theater.id,
      theater.name,
      theater.slug,
      a.street,
      a.number,
      a.neighborhood,
      a.city,
      a.state,
      a.postal_code,
      a.country,
      theater.location.map(|p| p.lng),
      theater.location.map(|p| p.lat),
      c.website,
      c.instagram,
      c.phone,
      c.email,
      theater.photo,
      encode_dt(theater.updated_at),
    ],
  )
  .map_err(|e| slug_conflict(e, &theater.slug))?;
  tx.commit()?;

  Ok(theater)
}

/// Delete a theater no session refers to. Returns the deleted id.
pub fn delete(conn: &mut Connection, key: &str) -> Result<i64> {
  let tx = conn.transaction()?;
  let theater = find_required(&tx, key)?;

  let sessions: i64 = tx.query_row(
    "SELECT COUNT(*) FROM sessions WHERE theater_id = ?1",
    params![theater.id],
    |r| r.get(0),
  )?;
  if sessions > 0 {
    return Err(
      backstage_core::Error::TheaterInUse { id: theater.id, sessions: sessions as u64 }
        .into(),
    );
  }

  tx.execute("DELETE FROM theaters WHERE id = ?1", params![theater.id])?;
  tx.commit()?;
  Ok(theater.id)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn slug_taken(conn: &Connection, slug: &str, except: Option<i64>) -> Result<bool> {
  let taken = conn
    .query_row(
      "SELECT 1 FROM theaters WHERE slug = ?1 AND (?2 IS NULL OR id <> ?2)",
      params![slug, except],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  Ok(taken)
}

/// Map a UNIQUE violation on the slug index to the domain conflict.
fn slug_conflict(e: rusqlite::Error, slug: &str) -> Error {
  match &e {
    rusqlite::Error::SqliteFailure(err, Some(msg))
      if err.code == ErrorCode::ConstraintViolation && msg.contains("theaters.slug") =>
    {
      backstage_core::Error::SlugConflict(slug.to_owned()).into()
    }
    _ => e.into(),
  }
}
