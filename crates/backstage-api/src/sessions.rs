//! Handlers for `/sessions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sessions` | `{"mode":"rule"\|"manual", ...}`; 201 `{mode, count, sessions}` |
//! | `GET`  | `/sessions` | Optional `?theater_id=&performance_id=` |
//! | `GET`  | `/sessions/by-performance/{id}` | 404 if the performance is unknown |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use backstage_core::{
  schedule::SessionPlan,
  session::{Session, SessionQuery},
  store::CatalogStore,
};
use serde::Serialize;

use crate::{AppState, error::ApiError};

/// Response body of `POST /sessions`.
#[derive(Debug, Serialize)]
pub struct Scheduled {
  pub mode:     &'static str,
  pub count:    usize,
  pub sessions: Vec<Session>,
}

/// `POST /sessions`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(plan): Json<SessionPlan>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  let batch = plan.expand()?;
  let sessions = state
    .store
    .schedule_sessions(batch)
    .await
    .map_err(ApiError::store)?;
  let body = Scheduled { mode: plan.mode(), count: sessions.len(), sessions };
  Ok((StatusCode::CREATED, Json(body)))
}

/// `GET /sessions`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<Session>>, ApiError>
where
  S: CatalogStore,
{
  let sessions = state.store.list_sessions(&query).await.map_err(ApiError::store)?;
  Ok(Json(sessions))
}

/// `GET /sessions/by-performance/{id}`
pub async fn by_performance<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Session>>, ApiError>
where
  S: CatalogStore,
{
  state
    .store
    .get_performance(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(backstage_core::Error::PerformanceNotFound(id))?;

  let query = SessionQuery { performance_id: Some(id), ..Default::default() };
  let sessions = state.store.list_sessions(&query).await.map_err(ApiError::store)?;
  Ok(Json(sessions))
}
