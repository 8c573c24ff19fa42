//! Address lookup by postal code.
//!
//! Brazilian codes (CEP) go to ViaCEP; every other country goes to
//! Zippopotam. One attempt per request, bounded by the client timeout.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/utils/address-by-zip` | `?country=XX&postal_code=...` |

use std::time::Duration;

use axum::{
  Json,
  extract::{Query, State},
};
use backstage_core::store::CatalogStore;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{AppState, error::ApiError};

pub const DEFAULT_VIACEP_BASE_URL: &str = "https://viacep.com.br";
pub const DEFAULT_ZIPPOPOTAM_BASE_URL: &str = "https://api.zippopotam.us";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(6);

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LookupError {
  #[error("country must be a two-letter code, got {0:?}")]
  InvalidCountry(String),

  #[error("invalid postal code {0:?}")]
  InvalidPostalCode(String),

  #[error("postal code {postal_code} not found for {country}")]
  NotFound { country: String, postal_code: String },

  /// The upstream service failed or answered with something unusable.
  #[error("address service unavailable: {0}")]
  Upstream(String),

  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),
}

impl From<reqwest::Error> for LookupError {
  fn from(e: reqwest::Error) -> Self { Self::Upstream(e.to_string()) }
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostalConfig {
  pub viacep_base_url:     String,
  pub zippopotam_base_url: String,
  pub timeout:             Duration,
}

impl Default for PostalConfig {
  fn default() -> Self {
    Self {
      viacep_base_url:     DEFAULT_VIACEP_BASE_URL.to_owned(),
      zippopotam_base_url: DEFAULT_ZIPPOPOTAM_BASE_URL.to_owned(),
      timeout:             DEFAULT_LOOKUP_TIMEOUT,
    }
  }
}

/// The address fields a lookup can fill in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressLookup {
  pub street:       String,
  pub neighborhood: Option<String>,
  pub city:         String,
  pub state:        String,
  pub postal_code:  String,
  pub country:      String,
}

/// Shared lookup client. Cheap to clone: [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct PostalClient {
  client: Client,
  config: PostalConfig,
}

impl PostalClient {
  pub fn new(config: PostalConfig) -> Result<Self, LookupError> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(LookupError::Client)?;
    Ok(Self { client, config })
  }

  pub async fn lookup(
    &self,
    country: &str,
    postal_code: &str,
  ) -> Result<AddressLookup, LookupError> {
    let cc = normalize_country(country)?;
    let code = postal_code.trim();
    if code.chars().count() < 2 {
      return Err(LookupError::InvalidPostalCode(code.to_owned()));
    }

    if cc == "BR" {
      let cep = normalize_cep(code)?;
      let url = format!(
        "{}/ws/{cep}/json/",
        self.config.viacep_base_url.trim_end_matches('/')
      );
      debug!(%url, "querying viacep");
      let body: Value = self
        .client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
      parse_viacep(&body, code)
    } else {
      let zip: String = code.chars().filter(|c| *c != ' ').collect();
      let url = format!(
        "{}/{}/{zip}",
        self.config.zippopotam_base_url.trim_end_matches('/'),
        cc.to_ascii_lowercase()
      );
      debug!(%url, "querying zippopotam");
      let resp = self.client.get(&url).send().await?;
      if resp.status() == StatusCode::NOT_FOUND {
        return Err(LookupError::NotFound { country: cc, postal_code: zip });
      }
      let body: Value = resp.error_for_status()?.json().await?;
      parse_zippopotam(&body, &cc, &zip)
    }
  }
}

// ─── Normalisation and parsing ───────────────────────────────────────────────

pub fn normalize_country(raw: &str) -> Result<String, LookupError> {
  let cc = raw.trim().to_ascii_uppercase();
  if cc.len() == 2 && cc.chars().all(|c| c.is_ascii_alphabetic()) {
    Ok(cc)
  } else {
    Err(LookupError::InvalidCountry(raw.to_owned()))
  }
}

/// Keep the digits of a CEP; exactly eight are required.
pub fn normalize_cep(raw: &str) -> Result<String, LookupError> {
  let cep: String = raw.chars().filter(char::is_ascii_digit).collect();
  if cep.len() == 8 {
    Ok(cep)
  } else {
    Err(LookupError::InvalidPostalCode(raw.to_owned()))
  }
}

fn text(body: &Value, key: &str) -> Option<String> {
  body
    .get(key)
    .and_then(Value::as_str)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

pub fn parse_viacep(body: &Value, requested: &str) -> Result<AddressLookup, LookupError> {
  // ViaCEP flags unknown codes with `"erro": true` (older: `"erro": "true"`).
  let missing = match body.get("erro") {
    Some(Value::Bool(flag)) => *flag,
    Some(Value::String(s)) => s == "true",
    _ => false,
  };
  if missing {
    return Err(LookupError::NotFound {
      country:     "BR".to_owned(),
      postal_code: requested.to_owned(),
    });
  }
  if !body.is_object() {
    return Err(LookupError::Upstream("unexpected ViaCEP response".to_owned()));
  }

  Ok(AddressLookup {
    street:       text(body, "logradouro").unwrap_or_default(),
    neighborhood: text(body, "bairro"),
    city:         text(body, "localidade").unwrap_or_default(),
    state:        text(body, "uf").unwrap_or_default(),
    postal_code:  text(body, "cep").unwrap_or_else(|| requested.to_owned()),
    country:      "BR".to_owned(),
  })
}

pub fn parse_zippopotam(
  body: &Value,
  country: &str,
  zip: &str,
) -> Result<AddressLookup, LookupError> {
  let Some(place) = body
    .get("places")
    .and_then(Value::as_array)
    .and_then(|places| places.first())
  else {
    return Err(LookupError::NotFound {
      country:     country.to_owned(),
      postal_code: zip.to_owned(),
    });
  };

  Ok(AddressLookup {
    street:       String::new(),
    neighborhood: None,
    city:         text(place, "place name").unwrap_or_default(),
    state:        text(place, "state abbreviation")
      .or_else(|| text(place, "state"))
      .unwrap_or_default(),
    postal_code:  text(body, "post code").unwrap_or_else(|| zip.to_owned()),
    country:      country.to_owned(),
  })
}

// ─── Handler ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LookupParams {
  pub country:     String,
  pub postal_code: String,
}

/// `GET /utils/address-by-zip?country=XX&postal_code=...`
pub async fn address_by_zip<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<LookupParams>,
) -> Result<Json<AddressLookup>, ApiError>
where
  S: CatalogStore,
{
  let address = state.postal.lookup(&params.country, &params.postal_code).await?;
  Ok(Json(address))
}
