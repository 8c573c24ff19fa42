//! The `CatalogStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `backstage-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  performance::{NewPerformance, Performance, PerformancePatch, PerformanceQuery},
  session::{Session, SessionBatch, SessionQuery},
  theater::{NewTheater, Theater, TheaterPatch, TheaterQuery},
};

/// Abstraction over a Backstage catalog backend.
///
/// Every write is all-or-nothing: a failed validation or reference check
/// leaves the store untouched. `created_at`/`updated_at` and ids are always
/// assigned by the store.
///
/// The backend error must convert into [`crate::Error`] so callers can tell
/// domain failures (not found, conflict, ...) from storage failures.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Theaters ──────────────────────────────────────────────────────────

  /// List theaters matching `query`. With a proximity center the results are
  /// ordered by distance, otherwise by name.
  fn list_theaters<'a>(
    &'a self,
    query: &'a TheaterQuery,
  ) -> impl Future<Output = Result<Vec<Theater>, Self::Error>> + Send + 'a;

  /// Look a theater up by id or slug. A numeric key is tried as an id first.
  fn get_theater<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Theater>, Self::Error>> + Send + 'a;

  /// Persist a new theater, deriving its slug from the name when absent.
  ///
  /// Fails with [`crate::Error::SlugConflict`] if the slug is taken.
  fn create_theater(
    &self,
    input: NewTheater,
  ) -> impl Future<Output = Result<Theater, Self::Error>> + Send + '_;

  /// Apply a partial update to the theater identified by `key`.
  fn update_theater<'a>(
    &'a self,
    key: &'a str,
    patch: TheaterPatch,
  ) -> impl Future<Output = Result<Theater, Self::Error>> + Send + 'a;

  /// Delete a theater. Fails with [`crate::Error::TheaterInUse`] while any
  /// session references it.
  fn delete_theater<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Performances ──────────────────────────────────────────────────────

  /// List performances matching `query`, ordered by season (newest first)
  /// then name.
  fn list_performances<'a>(
    &'a self,
    query: &'a PerformanceQuery,
  ) -> impl Future<Output = Result<Vec<Performance>, Self::Error>> + Send + 'a;

  fn get_performance(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Performance>, Self::Error>> + Send + '_;

  /// Persist a performance and its sessions.
  ///
  /// Every referenced theater must exist; otherwise nothing is written and
  /// [`crate::Error::MissingTheaters`] lists the unknown ids.
  fn create_performance(
    &self,
    input: NewPerformance,
  ) -> impl Future<Output = Result<Performance, Self::Error>> + Send + '_;

  /// Apply a partial update. Supplied sessions replace the existing ones
  /// under the same theater check as [`Self::create_performance`].
  fn update_performance(
    &self,
    id: i64,
    patch: PerformancePatch,
  ) -> impl Future<Output = Result<Performance, Self::Error>> + Send + '_;

  /// Delete a performance together with its sessions.
  fn delete_performance(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Insert a batch of sessions after checking the theater and performance
  /// references.
  fn schedule_sessions(
    &self,
    batch: SessionBatch,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + '_;

  /// List sessions ordered by start time.
  fn list_sessions<'a>(
    &'a self,
    query: &'a SessionQuery,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + 'a;
}
