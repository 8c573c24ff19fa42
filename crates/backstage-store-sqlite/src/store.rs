//! [`SqliteStore`]: the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use backstage_core::{
  performance::{NewPerformance, Performance, PerformancePatch, PerformanceQuery},
  session::{Session, SessionBatch, SessionQuery},
  store::CatalogStore,
  theater::{NewTheater, Theater, TheaterPatch, TheaterQuery},
};
use backstage_core::slug::fold;
use chrono::Utc;
use rusqlite::functions::FunctionFlags;
use tracing::{debug, info};

use crate::{Error, Result, performances, schema::SCHEMA, sessions, theaters};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Backstage catalog backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// SQL `fold(text)`: the case- and accent-insensitive key used by the theater
/// text filters. SQLite's own `LIKE` and `NOCASE` only fold ASCII.
fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| fold(&s))),
  )
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Theaters ──────────────────────────────────────────────────────────────

  async fn list_theaters(&self, query: &TheaterQuery) -> Result<Vec<Theater>> {
    let query = query.clone();
    self.conn.call(move |conn| Ok(theaters::list(conn, &query))).await?
  }

  async fn get_theater(&self, key: &str) -> Result<Option<Theater>> {
    let key = key.to_owned();
    self.conn.call(move |conn| Ok(theaters::find(conn, &key))).await?
  }

  async fn create_theater(&self, input: NewTheater) -> Result<Theater> {
    let now = Utc::now();
    let theater = self
      .conn
      .call(move |conn| Ok(theaters::insert(conn, input, now)))
      .await??;
    info!(id = theater.id, slug = %theater.slug, "theater created");
    Ok(theater)
  }

  async fn update_theater(&self, key: &str, patch: TheaterPatch) -> Result<Theater> {
    let key = key.to_owned();
    let now = Utc::now();
    let theater = self
      .conn
      .call(move |conn| Ok(theaters::update(conn, &key, patch, now)))
      .await??;
    info!(id = theater.id, "theater updated");
    Ok(theater)
  }

  async fn delete_theater(&self, key: &str) -> Result<()> {
    let key = key.to_owned();
    let id = self
      .conn
      .call(move |conn| Ok(theaters::delete(conn, &key)))
      .await??;
    info!(id, "theater deleted");
    Ok(())
  }

  // ── Performances ──────────────────────────────────────────────────────────

  async fn list_performances(&self, query: &PerformanceQuery) -> Result<Vec<Performance>> {
    let query = query.clone();
    self
      .conn
      .call(move |conn| Ok(performances::list(conn, &query)))
      .await?
  }

  async fn get_performance(&self, id: i64) -> Result<Option<Performance>> {
    self.conn.call(move |conn| Ok(performances::find(conn, id))).await?
  }

  async fn create_performance(&self, input: NewPerformance) -> Result<Performance> {
    let now = Utc::now();
    let performance = self
      .conn
      .call(move |conn| Ok(performances::insert(conn, input, now)))
      .await??;
    info!(
      id = performance.id,
      sessions = performance.sessions.len(),
      "performance created"
    );
    Ok(performance)
  }

  async fn update_performance(
    &self,
    id: i64,
    patch: PerformancePatch,
  ) -> Result<Performance> {
    let now = Utc::now();
    let performance = self
      .conn
      .call(move |conn| Ok(performances::update(conn, id, patch, now)))
      .await??;
    info!(id, "performance updated");
    Ok(performance)
  }

  async fn delete_performance(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| Ok(performances::delete(conn, id)))
      .await??;
    info!(id, "performance deleted");
    Ok(())
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn schedule_sessions(&self, batch: SessionBatch) -> Result<Vec<Session>> {
    let now = Utc::now();
    let theater_id = batch.theater_id;
    let created = self
      .conn
      .call(move |conn| Ok(sessions::schedule(conn, batch, now)))
      .await??;
    info!(theater_id, count = created.len(), "sessions scheduled");
    Ok(created)
  }

  async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>> {
    let query = query.clone();
    self.conn.call(move |conn| Ok(sessions::list(conn, &query))).await?
  }
}
