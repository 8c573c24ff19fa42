//! Router-level tests over an in-memory store.

use axum::{
  Json, Router,
  body::Body,
  extract::Path,
  http::{Request, StatusCode, header},
  routing::get,
};
use backstage_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{
  AppState, api_router,
  postal::{PostalClient, PostalConfig},
};

async fn make_state(postal: PostalConfig) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  AppState::new(store, PostalClient::new(postal).expect("postal client"))
}

async fn state() -> AppState<SqliteStore> { make_state(PostalConfig::default()).await }

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = api_router(state.clone())
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, json)
}

fn theater_body(name: &str) -> Value {
  json!({
    "name": name,
    "address": { "street": "Rua Jaceguai", "number": "520", "city": "São Paulo", "state": "SP" },
    "location": { "type": "Point", "coordinates": [-46.641, -23.555] }
  })
}

async fn create_theater(state: &AppState<SqliteStore>, name: &str) -> i64 {
  let (status, body) = send(state, "POST", "/theaters", Some(theater_body(name))).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["id"].as_i64().unwrap()
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
  let s = state().await;
  let (status, body) = send(&s, "GET", "/health", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "status": "ok" }));
}

// ─── Theaters ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn theater_crud_roundtrip() {
  let s = state().await;
  let (status, created) = send(&s, "POST", "/theaters", Some(theater_body("Teatro Oficina"))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["slug"], "teatro-oficina");
  assert_eq!(created["address"]["country"], "BR");
  assert_eq!(created["location"]["type"], "Point");

  let (status, by_slug) = send(&s, "GET", "/theaters/teatro-oficina", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(by_slug, created);

  let uri = format!("/theaters/{}", created["id"]);
  let (status, patched) = send(&s, "PATCH", &uri, Some(json!({ "name": "Oficina" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(patched["name"], "Oficina");
  assert_eq!(patched["slug"], "teatro-oficina");

  let (status, _) = send(&s, "DELETE", &uri, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, body) = send(&s, "GET", &uri, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn duplicate_slug_is_409() {
  let s = state().await;
  create_theater(&s, "Teatro Oficina").await;
  let (status, body) = send(&s, "POST", "/theaters", Some(theater_body("Teatro Oficina"))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("teatro-oficina"));
}

#[tokio::test]
async fn invalid_theater_payloads_are_400() {
  let s = state().await;

  let mut blank = theater_body("   ");
  blank["slug"] = json!("ok-slug");
  let (status, _) = send(&s, "POST", "/theaters", Some(blank)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let mut bad_photo = theater_body("Teatro");
  bad_photo["photo"] = json!("data:image/png;base64,@@@");
  let (status, _) = send(&s, "POST", "/theaters", Some(bad_photo)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  create_theater(&s, "Teatro").await;
  let (status, body) = send(&s, "PATCH", "/theaters/teatro", Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "update contains no fields");
}

#[tokio::test]
async fn theater_list_supports_proximity_params() {
  let s = state().await;
  create_theater(&s, "Teatro Oficina").await;

  let (status, body) =
    send(&s, "GET", "/theaters?near_lng=-46.64&near_lat=-23.55&max_distance_m=2000", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);

  let (status, body) =
    send(&s, "GET", "/theaters?near_lng=-43.17&near_lat=-22.90&max_distance_m=2000", None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(body.as_array().unwrap().is_empty());

  let (status, _) = send(&s, "GET", "/theaters?near_lng=-46.64", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&s, "GET", "/theaters?max_distance_m=10", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn referenced_theater_delete_is_409() {
  let s = state().await;
  let theater_id = create_theater(&s, "Teatro Oficina").await;
  let (status, _) = send(
    &s,
    "POST",
    "/sessions",
    Some(json!({
      "mode": "manual",
      "theater_id": theater_id,
      "sessions": [{ "date": "2025-05-02", "hour": "20:00" }]
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, _) = send(&s, "DELETE", "/theaters/teatro-oficina", None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

// ─── Performances ────────────────────────────────────────────────────────────

#[tokio::test]
async fn performance_with_unknown_theater_is_rejected_with_ids() {
  let s = state().await;
  let theater_id = create_theater(&s, "Teatro Oficina").await;

  let (status, body) = send(
    &s,
    "POST",
    "/performances",
    Some(json!({
      "name": "Roda Viva",
      "synopsis": "",
      "classification": "16",
      "season": 2025,
      "sessions": [
        { "theater_id": theater_id, "starts_at": "2025-05-02T20:00:00Z" },
        { "theater_id": 999, "starts_at": "2025-05-03T20:00:00Z" }
      ]
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["missing_theater_ids"], json!([999]));

  let (_, list) = send(&s, "GET", "/performances", None).await;
  assert_eq!(list, json!([]));
}

#[tokio::test]
async fn performance_lifecycle_and_filters() {
  let s = state().await;
  let theater_id = create_theater(&s, "Teatro Oficina").await;

  let (status, created) = send(
    &s,
    "POST",
    "/performances",
    Some(json!({
      "name": "Ópera do Malandro",
      "synopsis": "Comédia musical",
      "tags": ["musical", "comedia", "musical"],
      "classification": "Livre",
      "season": 2025,
      "crew": [{ "role": "Cenografia", "people": ["Hélio Eichbauer"] }],
      "sessions": [{ "theater_id": theater_id, "when": "2025-05-02T20:00:00Z" }]
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  assert_eq!(created["tags"], json!(["musical", "comedia"]));
  assert_eq!(created["sessions"].as_array().unwrap().len(), 1);
  let uri = format!("/performances/{}", created["id"]);

  for (query, expected) in [
    ("q=opera", 1),
    ("q=opera%20tragedia", 0),
    ("tags=musical,comedia", 1),
    ("tags=musical,drama", 0),
    ("classification=Livre", 1),
    ("season=2024", 0),
    (&format!("theater_id={theater_id}&date_from=2025-05-02&date_to=2025-05-02") as &str, 1),
    ("date_from=2025-06-01", 0),
  ] {
    let (status, body) = send(&s, "GET", &format!("/performances?{query}"), None).await;
    assert_eq!(status, StatusCode::OK, "{query}");
    assert_eq!(body.as_array().unwrap().len(), expected, "{query}");
  }

  let (status, patched) = send(&s, "PATCH", &uri, Some(json!({ "season": 2026 }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(patched["season"], 2026);
  assert_eq!(patched["name"], created["name"]);
  assert_eq!(patched["created_at"], created["created_at"]);

  let (status, _) = send(&s, "DELETE", &uri, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&s, "GET", &uri, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send(&s, "DELETE", &uri, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn text_filters_tolerate_accents_case_and_punctuation() {
  let s = state().await;
  create_theater(&s, "ÓPERA DE ARAME").await;
  let (status, _) = send(
    &s,
    "POST",
    "/performances",
    Some(json!({ "name": "Roda Viva", "synopsis": "", "classification": "14", "season": 2025 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  for uri in [
    "/theaters?name=%C3%B3pera",
    "/theaters?city=S%C3%83O%20PAULO",
    "/performances?q=roda%20-%20viva",
  ] {
    let (status, body) = send(&s, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK, "{uri}");
    assert_eq!(body.as_array().unwrap().len(), 1, "{uri}");
  }
}

#[tokio::test]
async fn invalid_list_params_are_400() {
  let s = state().await;
  for query in ["classification=PG", "date_from=tomorrow", "date_from=2025-02-01&date_to=2025-01-01"] {
    let (status, body) = send(&s, "GET", &format!("/performances?{query}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
    assert!(body["error"].is_string());
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rule_mode_creates_two_wednesday_sessions() {
  let s = state().await;
  let theater_id = create_theater(&s, "Teatro Oficina").await;
  let (_, performance) = send(
    &s,
    "POST",
    "/performances",
    Some(json!({ "name": "Roda Viva", "synopsis": "", "classification": "16", "season": 2025 })),
  )
  .await;
  let performance_id = performance["id"].as_i64().unwrap();

  let (status, body) = send(
    &s,
    "POST",
    "/sessions",
    Some(json!({
      "mode": "rule",
      "start_date": "2025-01-01",
      "end_date": "2025-01-14",
      "rules": { "2": ["19:00"] },
      "theater_id": theater_id,
      "performance_id": performance_id
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["mode"], "rule");
  assert_eq!(body["count"], 2);
  assert_eq!(body["sessions"][0]["starts_at"], "2025-01-01T19:00:00Z");
  assert_eq!(body["sessions"][1]["starts_at"], "2025-01-08T19:00:00Z");

  let (status, listed) =
    send(&s, "GET", &format!("/sessions/by-performance/{performance_id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listed, body["sessions"]);

  let (_, by_theater) = send(&s, "GET", &format!("/sessions?theater_id={theater_id}"), None).await;
  assert_eq!(by_theater.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn session_plan_errors() {
  let s = state().await;
  let theater_id = create_theater(&s, "Teatro Oficina").await;

  let reversed = json!({
    "mode": "rule",
    "start_date": "2025-02-01",
    "end_date": "2025-01-01",
    "rules": { "0": ["19:00"] },
    "theater_id": theater_id
  });
  let (status, _) = send(&s, "POST", "/sessions", Some(reversed)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let unknown_theater = json!({
    "mode": "manual",
    "theater_id": 404,
    "sessions": [{ "date": "2025-05-02", "hour": "20:00" }]
  });
  let (status, body) = send(&s, "POST", "/sessions", Some(unknown_theater)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["missing_theater_ids"], json!([404]));

  let (status, _) = send(&s, "GET", "/sessions/by-performance/77", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Address lookup ──────────────────────────────────────────────────────────

/// A local stand-in for ViaCEP and Zippopotam.
async fn fake_postal_service() -> String {
  async fn viacep(Path(cep): Path<String>) -> Json<Value> {
    if cep == "01310100" {
      Json(json!({
        "cep": "01310-100",
        "logradouro": "Avenida Paulista",
        "bairro": "Bela Vista",
        "localidade": "São Paulo",
        "uf": "SP"
      }))
    } else {
      Json(json!({ "erro": true }))
    }
  }

  async fn zippopotam(Path((cc, zip)): Path<(String, String)>) -> Result<Json<Value>, StatusCode> {
    if cc == "us" && zip == "90210" {
      Ok(Json(json!({
        "post code": "90210",
        "places": [{ "place name": "Beverly Hills", "state": "California", "state abbreviation": "CA" }]
      })))
    } else {
      Err(StatusCode::NOT_FOUND)
    }
  }

  let app = Router::new()
    .route("/ws/{cep}/json/", get(viacep))
    .route("/{cc}/{zip}", get(zippopotam));
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{addr}")
}

#[tokio::test]
async fn address_lookup_uses_both_services() {
  let base = fake_postal_service().await;
  let s = make_state(PostalConfig {
    viacep_base_url: base.clone(),
    zippopotam_base_url: base,
    ..Default::default()
  })
  .await;

  let (status, body) =
    send(&s, "GET", "/utils/address-by-zip?country=br&postal_code=01310-100", None).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["street"], "Avenida Paulista");
  assert_eq!(body["country"], "BR");

  let (status, _) =
    send(&s, "GET", "/utils/address-by-zip?country=BR&postal_code=99999-999", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&s, "GET", "/utils/address-by-zip?country=BR&postal_code=123", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) =
    send(&s, "GET", "/utils/address-by-zip?country=US&postal_code=90210", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["city"], "Beverly Hills");
  assert_eq!(body["state"], "CA");

  let (status, _) = send(&s, "GET", "/utils/address-by-zip?country=US&postal_code=00000", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&s, "GET", "/utils/address-by-zip?country=USA&postal_code=90210", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_address_service_is_502() {
  // Reserve a port, then free it so connections are refused.
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let s = make_state(PostalConfig {
    viacep_base_url: format!("http://{addr}"),
    ..Default::default()
  })
  .await;
  let (status, _) =
    send(&s, "GET", "/utils/address-by-zip?country=BR&postal_code=01310100", None).await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
}
