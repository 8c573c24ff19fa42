//! HTTP server wiring for Backstage: configuration loading and the
//! middleware stack around [`backstage_api::api_router`].

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use axum::{
  Router,
  http::{HeaderName, HeaderValue, Method, header::CONTENT_TYPE},
};
use backstage_api::{
  AppState, api_router,
  postal::{DEFAULT_VIACEP_BASE_URL, DEFAULT_ZIPPOPOTAM_BASE_URL, PostalConfig},
};
use backstage_core::store::CatalogStore;
use serde::Deserialize;
use tower_http::{
  cors::CorsLayer,
  request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
  trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, read from `backstage.toml` and
/// `BACKSTAGE_*` environment variables. Every key has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub database_path:       PathBuf,
  pub cors_origins:        Vec<String>,
  pub viacep_base_url:     String,
  pub zippopotam_base_url: String,
  pub lookup_timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "0.0.0.0".to_owned(),
      port:                8000,
      database_path:       PathBuf::from("backstage.db"),
      cors_origins:        vec![
        "http://localhost:5173".to_owned(),
        "http://127.0.0.1:5173".to_owned(),
      ],
      viacep_base_url:     DEFAULT_VIACEP_BASE_URL.to_owned(),
      zippopotam_base_url: DEFAULT_ZIPPOPOTAM_BASE_URL.to_owned(),
      lookup_timeout_secs: 6,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn postal(&self) -> PostalConfig {
    PostalConfig {
      viacep_base_url:     self.viacep_base_url.clone(),
      zippopotam_base_url: self.zippopotam_base_url.clone(),
      timeout:             Duration::from_secs(self.lookup_timeout_secs),
    }
  }
}

/// Read `path` (if it exists), then let `BACKSTAGE_*` variables override it.
/// `BACKSTAGE_CORS_ORIGINS` is a comma-separated list.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("BACKSTAGE")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors_origins"),
    )
    .build()
    .with_context(|| format!("failed to read config from {path:?}"))?;

  let mut cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  cfg.database_path = expand_tilde(&cfg.database_path);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ─────────────────────────────────────────────────────────────

/// Build the full application with its middleware stack (applied bottom-up):
///
/// 1. CORS
/// 2. Set request ID on incoming requests
/// 3. Request/response tracing
/// 4. Propagate request ID to the response
pub fn build_app<S>(state: AppState<S>, config: &ServerConfig) -> anyhow::Result<Router>
where
  S: CatalogStore + Clone + 'static,
{
  let cors = build_cors_layer(&config.cors_origins)?;
  let request_id_header = HeaderName::from_static("x-request-id");

  Ok(
    api_router(state)
      .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
      .layer(
        TraceLayer::new_for_http()
          .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
          .on_response(DefaultOnResponse::new().level(Level::INFO)),
      )
      .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
      .layer(cors),
  )
}

/// CORS for the configured browser origins. A malformed origin is a
/// startup error.
pub fn build_cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
  let origins = origins
    .iter()
    .map(|o| {
      o.parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin {o:?}"))
    })
    .collect::<anyhow::Result<Vec<_>>>()?;

  Ok(
    CorsLayer::new()
      .allow_origin(origins)
      .allow_methods([
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
      ])
      .allow_headers([CONTENT_TYPE])
      .allow_credentials(true)
      .max_age(Duration::from_secs(3600)),
  )
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use backstage_api::postal::PostalClient;
  use backstage_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn app() -> Router {
    let config = ServerConfig::default();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = AppState::new(store, PostalClient::new(config.postal()).unwrap());
    build_app(state, &config).unwrap()
  }

  #[test]
  fn defaults_match_documented_values() {
    let cfg = ServerConfig::default();
    assert_eq!(cfg.address(), "0.0.0.0:8000");
    assert_eq!(cfg.database_path, PathBuf::from("backstage.db"));
    assert_eq!(cfg.postal().timeout, Duration::from_secs(6));
    assert_eq!(cfg.cors_origins.len(), 2);
  }

  #[test]
  fn partial_toml_keeps_other_defaults() {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 9001\ncors_origins = [\"https://backstage.example\"]",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap();
    let cfg: ServerConfig = settings.try_deserialize().unwrap();
    assert_eq!(cfg.port, 9001);
    assert_eq!(cfg.cors_origins, ["https://backstage.example"]);
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.lookup_timeout_secs, 6);
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/data/backstage.db")),
      PathBuf::from(home).join("data/backstage.db")
    );
    assert_eq!(expand_tilde(Path::new("/srv/b.db")), PathBuf::from("/srv/b.db"));
  }

  #[test]
  fn bad_cors_origin_is_an_error() {
    assert!(build_cors_layer(&["bad\norigin".to_owned()]).is_err());
  }

  #[tokio::test]
  async fn responses_carry_a_request_id() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app().await.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
  }

  #[tokio::test]
  async fn configured_origin_passes_preflight() {
    let req = Request::builder()
      .method("OPTIONS")
      .uri("/theaters")
      .header(header::ORIGIN, "http://localhost:5173")
      .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
      .body(Body::empty())
      .unwrap();
    let resp = app().await.oneshot(req).await.unwrap();
    assert_eq!(
      resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
      "http://localhost:5173"
    );
  }
}
