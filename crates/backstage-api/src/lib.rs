//! JSON REST API for Backstage.
//!
//! Exposes an axum [`Router`] backed by any [`CatalogStore`]. Middleware
//! (tracing, CORS, request ids) and transport are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = backstage_api::api_router(AppState::new(store, postal));
//! ```

pub mod error;
pub mod health;
pub mod performances;
pub mod postal;
pub mod sessions;
pub mod theaters;

use std::sync::Arc;

use axum::{Router, routing::get};
use backstage_core::store::CatalogStore;

pub use error::ApiError;
use postal::PostalClient;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CatalogStore> {
  pub store:  Arc<S>,
  pub postal: Arc<PostalClient>,
}

impl<S: CatalogStore> AppState<S> {
  pub fn new(store: S, postal: PostalClient) -> Self {
    Self { store: Arc::new(store), postal: Arc::new(postal) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: CatalogStore + Clone + 'static,
{
  Router::new()
    .route("/health", get(health::handler))
    // Theaters
    .route("/theaters", get(theaters::list::<S>).post(theaters::create::<S>))
    .route(
      "/theaters/{key}",
      get(theaters::get_one::<S>)
        .patch(theaters::update::<S>)
        .delete(theaters::delete::<S>),
    )
    // Performances
    .route(
      "/performances",
      get(performances::list::<S>).post(performances::create::<S>),
    )
    .route(
      "/performances/{id}",
      get(performances::get_one::<S>)
        .patch(performances::update::<S>)
        .delete(performances::delete::<S>),
    )
    // Sessions
    .route("/sessions", get(sessions::list::<S>).post(sessions::create::<S>))
    .route("/sessions/by-performance/{id}", get(sessions::by_performance::<S>))
    // Utilities
    .route("/utils/address-by-zip", get(postal::address_by_zip::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
