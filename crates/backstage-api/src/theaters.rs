//! Handlers for `/theaters` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/theaters` | Filters: `name`, `city`, `state`, `neighborhood`, `slug`, `near_lng`+`near_lat`[+`max_distance_m`], `skip`, `limit` |
//! | `POST`   | `/theaters` | 201; slug derived from the name when absent |
//! | `GET`    | `/theaters/{key}` | `key` is an id or a slug |
//! | `PATCH`  | `/theaters/{key}` | Partial update |
//! | `DELETE` | `/theaters/{key}` | 204; 409 while sessions refer to it |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use backstage_core::{
  geo::GeoPoint,
  store::CatalogStore,
  theater::{NewTheater, Theater, TheaterPatch, TheaterQuery},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub name:           Option<String>,
  pub city:           Option<String>,
  pub state:          Option<String>,
  pub neighborhood:   Option<String>,
  pub slug:           Option<String>,
  pub near_lng:       Option<f64>,
  pub near_lat:       Option<f64>,
  pub max_distance_m: Option<f64>,
  pub skip:           Option<usize>,
  pub limit:          Option<usize>,
}

impl TryFrom<ListParams> for TheaterQuery {
  type Error = ApiError;

  fn try_from(p: ListParams) -> Result<Self, ApiError> {
    let near = match (p.near_lng, p.near_lat) {
      (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)?),
      (None, None) => None,
      _ => {
        return Err(ApiError::BadRequest(
          "near_lng and near_lat must be given together".into(),
        ));
      }
    };
    let query = TheaterQuery {
      name: p.name,
      city: p.city,
      state: p.state,
      neighborhood: p.neighborhood,
      slug: p.slug,
      near,
      max_distance_m: p.max_distance_m,
      skip: p.skip,
      limit: p.limit,
    };
    query.validate()?;
    Ok(query)
  }
}

/// `GET /theaters`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Theater>>, ApiError>
where
  S: CatalogStore,
{
  let query = TheaterQuery::try_from(params)?;
  let theaters = state.store.list_theaters(&query).await.map_err(ApiError::store)?;
  Ok(Json(theaters))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /theaters`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewTheater>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  let theater = state.store.create_theater(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(theater)))
}

// ─── Get / update / delete ───────────────────────────────────────────────────

/// `GET /theaters/{key}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
) -> Result<Json<Theater>, ApiError>
where
  S: CatalogStore,
{
  let theater = state
    .store
    .get_theater(&key)
    .await
    .map_err(ApiError::store)?
    .ok_or(backstage_core::Error::TheaterNotFound(key))?;
  Ok(Json(theater))
}

/// `PATCH /theaters/{key}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
  Json(patch): Json<TheaterPatch>,
) -> Result<Json<Theater>, ApiError>
where
  S: CatalogStore,
{
  let theater = state
    .store
    .update_theater(&key, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(theater))
}

/// `DELETE /theaters/{key}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore,
{
  state.store.delete_theater(&key).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
