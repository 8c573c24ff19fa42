//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 strings in UTC
//! (microsecond precision, `Z` suffix) so that text comparison orders them
//! chronologically. List and crew fields are stored as compact JSON.

use backstage_core::{
  geo::GeoPoint,
  performance::{Classification, CrewRole, Performance},
  session::Session,
  theater::{Address, Contacts, Theater},
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Truncate to the precision the database keeps, so values handed back to
/// callers compare equal to what a later read returns.
pub fn stored_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
  DateTime::from_timestamp_micros(dt.timestamp_micros()).unwrap_or(dt)
}

// ─── Classification ──────────────────────────────────────────────────────────

pub fn encode_classification(c: Classification) -> &'static str { c.as_str() }

pub fn decode_classification(s: &str) -> Result<Classification> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown classification: {s:?}")))
}

// ─── JSON lists ──────────────────────────────────────────────────────────────

pub fn encode_strings(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_strings(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_crew(crew: &[CrewRole]) -> Result<String> {
  Ok(serde_json::to_string(crew)?)
}

pub fn decode_crew(s: &str) -> Result<Vec<CrewRole>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Theater row ─────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawTheater`].
pub const THEATER_COLUMNS: &str = "id, name, slug, street, number, neighborhood, \
  city, state, postal_code, country, lng, lat, website, instagram, phone, \
  email, photo, created_at, updated_at";

/// Raw values read directly from a `theaters` row.
pub struct RawTheater {
  pub id:           i64,
  pub name:         String,
  pub slug:         String,
  pub street:       String,
  pub number:       Option<String>,
  pub neighborhood: Option<String>,
  pub city:         String,
  pub state:        String,
  pub postal_code:  Option<String>,
  pub country:      String,
  pub lng:          Option<f64>,
  pub lat:          Option<f64>,
  pub website:      Option<String>,
  pub instagram:    Option<String>,
  pub phone:        Option<String>,
  pub email:        Option<String>,
  pub photo:        Option<String>,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawTheater {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      name:         row.get(1)?,
      slug:         row.get(2)?,
      street:       row.get(3)?,
      number:       row.get(4)?,
      neighborhood: row.get(5)?,
      city:         row.get(6)?,
      state:        row.get(7)?,
      postal_code:  row.get(8)?,
      country:      row.get(9)?,
      lng:          row.get(10)?,
      lat:          row.get(11)?,
      website:      row.get(12)?,
      instagram:    row.get(13)?,
      phone:        row.get(14)?,
      email:        row.get(15)?,
      photo:        row.get(16)?,
      created_at:   row.get(17)?,
      updated_at:   row.get(18)?,
    })
  }

  pub fn into_theater(self) -> Result<Theater> {
    let location = match (self.lng, self.lat) {
      (Some(lng), Some(lat)) => Some(
        GeoPoint::new(lng, lat)
          .map_err(|e| Error::Decode(format!("theater {}: {e}", self.id)))?,
      ),
      _ => None,
    };

    Ok(Theater {
      id: self.id,
      name: self.name,
      slug: self.slug,
      address: Address {
        street:       self.street,
        number:       self.number,
        neighborhood: self.neighborhood,
        city:         self.city,
        state:        self.state,
        postal_code:  self.postal_code,
        country:      self.country,
      },
      location,
      contacts: Contacts {
        website:   self.website,
        instagram: self.instagram,
        phone:     self.phone,
        email:     self.email,
      },
      photo: self.photo,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Performance row ─────────────────────────────────────────────────────────

/// Column list (prefixed with the `p` alias) matching [`RawPerformance`].
pub const PERFORMANCE_COLUMNS: &str = "p.id, p.name, p.synopsis, p.tags, \
  p.classification, p.season, p.dramaturgy, p.direction, p.cast_list, p.crew, \
  p.banner, p.created_at, p.updated_at";

/// Raw values read directly from a `performances` row.
pub struct RawPerformance {
  pub id:             i64,
  pub name:           String,
  pub synopsis:       String,
  pub tags:           String,
  pub classification: String,
  pub season:         i32,
  pub dramaturgy:     String,
  pub direction:      String,
  pub cast_list:      String,
  pub crew:           String,
  pub banner:         Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawPerformance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      name:           row.get(1)?,
      synopsis:       row.get(2)?,
      tags:           row.get(3)?,
      classification: row.get(4)?,
      season:         row.get(5)?,
      dramaturgy:     row.get(6)?,
      direction:      row.get(7)?,
      cast_list:      row.get(8)?,
      crew:           row.get(9)?,
      banner:         row.get(10)?,
      created_at:     row.get(11)?,
      updated_at:     row.get(12)?,
    })
  }

  /// Decode the row; `sessions` are loaded separately by the caller.
  pub fn into_performance(self, sessions: Vec<Session>) -> Result<Performance> {
    Ok(Performance {
      id: self.id,
      name: self.name,
      synopsis: self.synopsis,
      tags: decode_strings(&self.tags)?,
      classification: decode_classification(&self.classification)?,
      season: self.season,
      dramaturgy: decode_strings(&self.dramaturgy)?,
      direction: decode_strings(&self.direction)?,
      cast: decode_strings(&self.cast_list)?,
      crew: decode_crew(&self.crew)?,
      sessions,
      banner: self.banner,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Session row ─────────────────────────────────────────────────────────────

pub const SESSION_COLUMNS: &str =
  "id, starts_at, theater_id, performance_id, created_at, updated_at";

/// Raw values read directly from a `sessions` row.
pub struct RawSession {
  pub id:             i64,
  pub starts_at:      String,
  pub theater_id:     i64,
  pub performance_id: Option<i64>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      starts_at:      row.get(1)?,
      theater_id:     row.get(2)?,
      performance_id: row.get(3)?,
      created_at:     row.get(4)?,
      updated_at:     row.get(5)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      id:             self.id,
      starts_at:      decode_dt(&self.starts_at)?,
      theater_id:     self.theater_id,
      performance_id: self.performance_id,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Dynamic parameters ──────────────────────────────────────────────────────

pub fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sortable() {
    let a = Utc.with_ymd_and_hms(2025, 1, 8, 19, 0, 0).unwrap();
    let b = a + chrono::Duration::milliseconds(1500);
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea, "2025-01-08T19:00:00.000000Z");
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }
}
