//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use backstage_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

use crate::postal::LookupError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A domain or storage failure reported by the catalog.
  #[error(transparent)]
  Domain(#[from] CoreError),

  #[error(transparent)]
  Lookup(#[from] LookupError),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  /// Classify a store error through its conversion into the domain error.
  pub fn store<E: Into<CoreError>>(e: E) -> Self { Self::Domain(e.into()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Domain(core) => match core {
        CoreError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
        CoreError::EmptyUpdate
        | CoreError::MissingPerformance(_)
        | CoreError::MissingTheaters(_) => (StatusCode::BAD_REQUEST, core.to_string()),
        CoreError::TheaterNotFound(_) | CoreError::PerformanceNotFound(_) => {
          (StatusCode::NOT_FOUND, core.to_string())
        }
        CoreError::SlugConflict(_) | CoreError::TheaterInUse { .. } => {
          (StatusCode::CONFLICT, core.to_string())
        }
        CoreError::Backend(e) => {
          tracing::error!(error = %e, "store failure");
          (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
        }
      },
      ApiError::Lookup(e) => match e {
        LookupError::InvalidCountry(_) | LookupError::InvalidPostalCode(_) => {
          (StatusCode::BAD_REQUEST, e.to_string())
        }
        LookupError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
        LookupError::Upstream(_) => {
          tracing::warn!(error = %e, "postal lookup failed");
          (StatusCode::BAD_GATEWAY, e.to_string())
        }
        LookupError::Client(_) => {
          tracing::error!(error = %e, "postal client unusable");
          (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
        }
      },
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
    };

    let body = match &self {
      ApiError::Domain(CoreError::MissingTheaters(ids)) => {
        json!({ "error": message, "missing_theater_ids": ids })
      }
      _ => json!({ "error": message }),
    };
    (status, Json(body)).into_response()
  }
}
