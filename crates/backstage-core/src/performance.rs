//! Performances: shows with credits, tags and scheduled sessions.

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  media::validate_base64_image,
  session::Session,
  theater::MAX_PAGE_LIMIT,
};

// ─── Classification ──────────────────────────────────────────────────────────

/// Age rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
  /// Suitable for all ages.
  #[serde(rename = "Livre")]
  Livre,
  #[serde(rename = "10")]
  Ten,
  #[serde(rename = "12")]
  Twelve,
  #[serde(rename = "14")]
  Fourteen,
  #[serde(rename = "16")]
  Sixteen,
  #[serde(rename = "18")]
  Eighteen,
}

impl Classification {
  /// The label used on the wire and in the database.
  /// Must match the serde renames above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Livre => "Livre",
      Self::Ten => "10",
      Self::Twelve => "12",
      Self::Fourteen => "14",
      Self::Sixteen => "16",
      Self::Eighteen => "18",
    }
  }
}

impl fmt::Display for Classification {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Classification {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "Livre" => Ok(Self::Livre),
      "10" => Ok(Self::Ten),
      "12" => Ok(Self::Twelve),
      "14" => Ok(Self::Fourteen),
      "16" => Ok(Self::Sixteen),
      "18" => Ok(Self::Eighteen),
      other => Err(Error::validation(format!(
        "unknown classification {other:?}; expected Livre, 10, 12, 14, 16 or 18"
      ))),
    }
  }
}

// ─── Credits ─────────────────────────────────────────────────────────────────

/// A crew function and the people credited for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewRole {
  pub role:   String,
  #[serde(default)]
  pub people: Vec<String>,
}

// ─── Sessions inside a performance payload ───────────────────────────────────

/// A session as written inline with a performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSlot {
  pub theater_id: i64,
  #[serde(alias = "when")]
  pub starts_at:  DateTime<Utc>,
}

fn theater_ids(slots: &[SessionSlot]) -> Vec<i64> {
  slots
    .iter()
    .map(|s| s.theater_id)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

// ─── Performance ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
  pub id:             i64,
  pub name:           String,
  pub synopsis:       String,
  pub tags:           Vec<String>,
  pub classification: Classification,
  /// The year this run belongs to.
  pub season:         i32,
  pub dramaturgy:     Vec<String>,
  pub direction:      Vec<String>,
  pub cast:           Vec<String>,
  pub crew:           Vec<CrewRole>,
  /// Ordered by start time.
  pub sessions:       Vec<Session>,
  pub banner:         Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Trim tags, drop blanks and duplicates; first occurrence wins.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
  let mut seen = BTreeSet::new();
  tags
    .into_iter()
    .map(|t| t.trim().to_owned())
    .filter(|t| !t.is_empty() && seen.insert(t.clone()))
    .collect()
}

// ─── NewPerformance ──────────────────────────────────────────────────────────

/// Input to [`crate::store::CatalogStore::create_performance`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPerformance {
  pub name:           String,
  pub synopsis:       String,
  #[serde(default)]
  pub tags:           Vec<String>,
  pub classification: Classification,
  pub season:         i32,
  #[serde(default)]
  pub dramaturgy:     Vec<String>,
  #[serde(default)]
  pub direction:      Vec<String>,
  #[serde(default)]
  pub cast:           Vec<String>,
  #[serde(default)]
  pub crew:           Vec<CrewRole>,
  #[serde(default)]
  pub sessions:       Vec<SessionSlot>,
  pub banner:         Option<String>,
}

impl NewPerformance {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("name must not be blank"));
    }
    validate_crew(&self.crew)?;
    if let Some(banner) = &self.banner {
      validate_base64_image("banner", banner)?;
    }
    Ok(())
  }

  /// Distinct theater ids referenced by the sessions, ascending.
  pub fn theater_ids(&self) -> Vec<i64> { theater_ids(&self.sessions) }
}

fn validate_crew(crew: &[CrewRole]) -> Result<()> {
  if crew.iter().any(|c| c.role.trim().is_empty()) {
    return Err(Error::validation("crew roles must not be blank"));
  }
  Ok(())
}

// ─── PerformancePatch ────────────────────────────────────────────────────────

/// A partial update. `sessions`, when present, replaces the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformancePatch {
  pub name:           Option<String>,
  pub synopsis:       Option<String>,
  pub tags:           Option<Vec<String>>,
  pub classification: Option<Classification>,
  pub season:         Option<i32>,
  pub dramaturgy:     Option<Vec<String>>,
  pub direction:      Option<Vec<String>>,
  pub cast:           Option<Vec<String>>,
  pub crew:           Option<Vec<CrewRole>>,
  pub sessions:       Option<Vec<SessionSlot>>,
  pub banner:         Option<String>,
}

impl PerformancePatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.synopsis.is_none()
      && self.tags.is_none()
      && self.classification.is_none()
      && self.season.is_none()
      && self.dramaturgy.is_none()
      && self.direction.is_none()
      && self.cast.is_none()
      && self.crew.is_none()
      && self.sessions.is_none()
      && self.banner.is_none()
  }

  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(Error::EmptyUpdate);
    }
    if let Some(name) = &self.name
      && name.trim().is_empty()
    {
      return Err(Error::validation("name must not be blank"));
    }
    if let Some(crew) = &self.crew {
      validate_crew(crew)?;
    }
    if let Some(banner) = &self.banner {
      validate_base64_image("banner", banner)?;
    }
    Ok(())
  }

  /// Distinct theater ids referenced by replacement sessions, if any.
  pub fn theater_ids(&self) -> Vec<i64> {
    self.sessions.as_deref().map(theater_ids).unwrap_or_default()
  }

  /// Write the supplied scalar and list fields into `performance` and refresh
  /// `updated_at`. `sessions` is left for the store to persist.
  pub fn apply_to(self, performance: &mut Performance, now: DateTime<Utc>) {
    if let Some(name) = self.name {
      performance.name = name.trim().to_owned();
    }
    if let Some(synopsis) = self.synopsis {
      performance.synopsis = synopsis;
    }
    if let Some(tags) = self.tags {
      performance.tags = normalize_tags(tags);
    }
    if let Some(classification) = self.classification {
      performance.classification = classification;
    }
    if let Some(season) = self.season {
      performance.season = season;
    }
    if let Some(dramaturgy) = self.dramaturgy {
      performance.dramaturgy = dramaturgy;
    }
    if let Some(direction) = self.direction {
      performance.direction = direction;
    }
    if let Some(cast) = self.cast {
      performance.cast = cast;
    }
    if let Some(crew) = self.crew {
      performance.crew = crew;
    }
    if let Some(banner) = self.banner {
      performance.banner = Some(banner);
    }
    performance.updated_at = now;
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

pub const DEFAULT_PERFORMANCE_LIMIT: usize = 50;

/// Parameters for [`crate::store::CatalogStore::list_performances`].
/// All filters combine with AND.
#[derive(Debug, Clone, Default)]
pub struct PerformanceQuery {
  /// Free text over name, synopsis and tags; every term must match.
  pub q:              Option<String>,
  pub season:         Option<i32>,
  pub classification: Option<Classification>,
  /// Every listed tag must be present.
  pub tags:           Vec<String>,
  /// Some session must be at this theater (and inside the date range, if
  /// one is given).
  pub theater_id:     Option<i64>,
  pub date_from:      Option<DateTime<Utc>>,
  pub date_to:        Option<DateTime<Utc>>,
  pub skip:           Option<usize>,
  pub limit:          Option<usize>,
}

impl PerformanceQuery {
  pub fn validate(&self) -> Result<()> {
    if let (Some(from), Some(to)) = (self.date_from, self.date_to)
      && to < from
    {
      return Err(Error::validation("date_to is before date_from"));
    }
    Ok(())
  }

  pub fn skip(&self) -> usize { self.skip.unwrap_or(0) }

  pub fn limit(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_PERFORMANCE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
  }

  /// Whether any session-level filter is set.
  pub fn filters_sessions(&self) -> bool {
    self.theater_id.is_some() || self.date_from.is_some() || self.date_to.is_some()
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn performance() -> Performance {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Performance {
      id:             1,
      name:           "Roda Viva".into(),
      synopsis:       "Um cantor popular é moído pela indústria cultural.".into(),
      tags:           vec!["musical".into(), "classico".into()],
      classification: Classification::Sixteen,
      season:         2025,
      dramaturgy:     vec!["Chico Buarque".into()],
      direction:      vec!["José Celso Martinez Corrêa".into()],
      cast:           vec![],
      crew:           vec![],
      sessions:       vec![],
      banner:         None,
      created_at:     ts,
      updated_at:     ts,
    }
  }

  #[test]
  fn classification_labels_roundtrip_through_serde() {
    for c in [
      Classification::Livre,
      Classification::Ten,
      Classification::Twelve,
      Classification::Fourteen,
      Classification::Sixteen,
      Classification::Eighteen,
    ] {
      let json = serde_json::to_value(c).unwrap();
      assert_eq!(json, serde_json::Value::String(c.as_str().to_owned()));
      assert_eq!(c.as_str().parse::<Classification>().unwrap(), c);
    }
    assert!("PG-13".parse::<Classification>().is_err());
  }

  #[test]
  fn tags_are_trimmed_and_deduplicated() {
    let tags = normalize_tags(vec![
      " drama ".into(),
      "comedia".into(),
      "drama".into(),
      "".into(),
    ]);
    assert_eq!(tags, ["drama", "comedia"]);
  }

  #[test]
  fn session_slot_accepts_when_alias() {
    let slot: SessionSlot = serde_json::from_value(serde_json::json!({
      "theater_id": 4, "when": "2025-06-01T20:00:00Z"
    }))
    .unwrap();
    assert_eq!(slot.theater_id, 4);
  }

  #[test]
  fn theater_ids_are_distinct() {
    let at = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
    let patch = PerformancePatch {
      sessions: Some(vec![
        SessionSlot { theater_id: 3, starts_at: at },
        SessionSlot { theater_id: 1, starts_at: at },
        SessionSlot { theater_id: 3, starts_at: at },
      ]),
      ..Default::default()
    };
    assert_eq!(patch.theater_ids(), [1, 3]);
  }

  #[test]
  fn empty_patch_is_rejected() {
    assert!(matches!(
      PerformancePatch::default().validate(),
      Err(Error::EmptyUpdate)
    ));
  }

  #[test]
  fn patch_changes_only_supplied_fields() {
    let mut p = performance();
    let before = p.clone();
    let later = before.updated_at + chrono::Duration::hours(1);

    PerformancePatch { season: Some(2026), ..Default::default() }.apply_to(&mut p, later);

    assert_eq!(p.season, 2026);
    assert_eq!(p.name, before.name);
    assert_eq!(p.tags, before.tags);
    assert_eq!(p.classification, before.classification);
    assert_eq!(p.updated_at, later);
  }

  #[test]
  fn patched_name_is_trimmed() {
    let mut p = performance();
    let later = p.updated_at;
    PerformancePatch { name: Some("  Roda Viva \n".into()), ..Default::default() }
      .apply_to(&mut p, later);
    assert_eq!(p.name, "Roda Viva");
  }

  #[test]
  fn invalid_banner_is_rejected() {
    let patch = PerformancePatch { banner: Some("%%%".into()), ..Default::default() };
    assert!(patch.validate().is_err());
  }
}
