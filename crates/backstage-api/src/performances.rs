//! Handlers for `/performances` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/performances` | `q`, `season`, `classification`, `tags` (comma-separated), `theater_id`, `date_from`, `date_to`, `skip`, `limit` |
//! | `POST`   | `/performances` | 201; every session theater must exist |
//! | `GET`    | `/performances/{id}` | |
//! | `PATCH`  | `/performances/{id}` | `sessions`, when given, replaces the list |
//! | `DELETE` | `/performances/{id}` | 204; sessions go with it |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use backstage_core::{
  performance::{
    Classification, NewPerformance, Performance, PerformancePatch, PerformanceQuery,
  },
  store::CatalogStore,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub q:              Option<String>,
  pub season:         Option<i32>,
  pub classification: Option<String>,
  /// Comma-separated; every tag must be present.
  pub tags:           Option<String>,
  pub theater_id:     Option<i64>,
  pub date_from:      Option<String>,
  pub date_to:        Option<String>,
  pub skip:           Option<usize>,
  pub limit:          Option<usize>,
}

impl TryFrom<ListParams> for PerformanceQuery {
  type Error = ApiError;

  fn try_from(p: ListParams) -> Result<Self, ApiError> {
    let classification = p
      .classification
      .as_deref()
      .filter(|s| !s.is_empty())
      .map(str::parse::<Classification>)
      .transpose()?;
    let tags: Vec<String> = p
      .tags
      .as_deref()
      .map(|raw| {
        raw
          .split(',')
          .map(str::trim)
          .filter(|t| !t.is_empty())
          .map(str::to_owned)
          .collect()
      })
      .unwrap_or_default();

    let query = PerformanceQuery {
      q: p.q.filter(|q| !q.trim().is_empty()),
      season: p.season,
      classification,
      tags,
      theater_id: p.theater_id,
      date_from: p.date_from.as_deref().map(|s| parse_bound(s, false)).transpose()?,
      date_to: p.date_to.as_deref().map(|s| parse_bound(s, true)).transpose()?,
      skip: p.skip,
      limit: p.limit,
    };
    query.validate()?;
    Ok(query)
  }
}

/// Parse a date-range bound. Accepts RFC 3339, a naive date-time (read as
/// UTC) or a bare date; a bare upper bound covers the whole day.
pub fn parse_bound(raw: &str, upper: bool) -> Result<DateTime<Utc>, ApiError> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
    return Ok(dt.and_utc());
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
    return Ok(dt.and_utc());
  }
  if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    let bound = if upper {
      date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
      date.and_hms_opt(0, 0, 0)
    };
    if let Some(dt) = bound {
      return Ok(dt.and_utc());
    }
  }
  Err(ApiError::BadRequest(format!(
    "invalid date {raw:?}: expected YYYY-MM-DD or an RFC 3339 date-time"
  )))
}

/// `GET /performances`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Performance>>, ApiError>
where
  S: CatalogStore,
{
  let query = PerformanceQuery::try_from(params)?;
  let performances = state
    .store
    .list_performances(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(performances))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /performances`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewPerformance>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  let performance = state
    .store
    .create_performance(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(performance)))
}

// ─── Get / update / delete ───────────────────────────────────────────────────

/// `GET /performances/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Performance>, ApiError>
where
  S: CatalogStore,
{
  let performance = state
    .store
    .get_performance(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(backstage_core::Error::PerformanceNotFound(id))?;
  Ok(Json(performance))
}

/// `PATCH /performances/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Json(patch): Json<PerformancePatch>,
) -> Result<Json<Performance>, ApiError>
where
  S: CatalogStore,
{
  let performance = state
    .store
    .update_performance(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(performance))
}

/// `DELETE /performances/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore,
{
  state.store.delete_performance(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
