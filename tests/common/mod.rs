#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::{Path as UrlPath, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};

use tasas_bridge::config::{AppConfig, ServiceAccountKey};
use tasas_bridge::notifier::WebhookNotifier;
use tasas_bridge::sheets::SheetBackend;
use tasas_bridge::state::AppState;
use tasas_bridge::store::RateStore;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_key.pem");

/// Serve `router` on a free local port for the lifetime of the current test runtime.
pub async fn serve(router: Router) -> Result<String> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let base_url = format!("http://127.0.0.1:{}", port);
    wait_ready(&base_url, Duration::from_secs(5)).await?;
    Ok(base_url)
}

async fn wait_ready(base_url: &str, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() > deadline {
            break;
        }
        if tokio::net::TcpStream::connect(base_url.trim_start_matches("http://")).await.is_ok() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    anyhow::bail!("server did not become ready on {} within {:?}", base_url, timeout)
}

/// Config as the server would build it from the environment, pointed at test doubles.
pub fn test_config(webhook_url: &str, static_dir: &Path) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("GSHEET_ID", "test-sheet".to_string()),
        ("ZAPIER_WEBHOOK_URL", webhook_url.to_string()),
        ("STATIC_DIR", static_dir.display().to_string()),
        ("API_ENABLE_REQUEST_LOGGING", "false".to_string()),
    ]);
    AppConfig::from_lookup(|name| vars.get(name).cloned()).expect("test config")
}

/// Start the bridge over `sheet` and a webhook at `webhook_url`.
pub async fn spawn_bridge(sheet: Arc<dyn SheetBackend>, webhook_url: &str, static_dir: &Path) -> Result<String> {
    let config = test_config(webhook_url, static_dir);
    let state = AppState::new(
        RateStore::new(sheet),
        Arc::new(WebhookNotifier::new(config.webhook.url.clone())),
    );
    serve(tasas_bridge::app(state, &config)).await
}

// ---------------------------------------------------------------------------
// Fake webhook

#[derive(Clone)]
pub struct FakeWebhook {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl FakeWebhook {
    /// A catch hook answering every POST with `status`.
    pub async fn start(status: StatusCode) -> Result<Self> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route("/hooks/catch", post(catch_hook))
            .with_state((received.clone(), status));
        let base_url = serve(router).await?;
        Ok(Self {
            url: format!("{}/hooks/catch", base_url),
            received,
        })
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

async fn catch_hook(
    State((received, status)): State<(Arc<Mutex<Vec<Value>>>, StatusCode)>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    received.lock().unwrap().push(payload);
    (status, Json(json!({ "status": "success" })))
}

/// A URL nothing listens on.
pub fn unreachable_url() -> String {
    let port = portpicker::pick_unused_port().expect("free port");
    format!("http://127.0.0.1:{}/hooks/catch", port)
}

// ---------------------------------------------------------------------------
// Fake Google (OAuth token endpoint + Sheets v4 values API)

pub const FAKE_TOKEN: &str = "ya29.test-token";

#[derive(Debug, Default)]
pub struct FakeGoogleState {
    pub tabs: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub token_requests: usize,
    pub reject_tokens: bool,
    pub reads: Vec<String>,
    pub writes: Vec<(String, Value)>,
    pub unauthorized_calls: usize,
}

#[derive(Clone)]
pub struct FakeGoogle {
    pub base_url: String,
    pub state: Arc<Mutex<FakeGoogleState>>,
}

impl FakeGoogle {
    pub async fn start(tabs: &[&str], rows: Vec<Vec<Value>>) -> Result<Self> {
        let state = Arc::new(Mutex::new(FakeGoogleState {
            tabs: tabs.iter().map(|t| t.to_string()).collect(),
            rows,
            ..Default::default()
        }));
        let router = Router::new()
            .route("/token", post(token))
            .route("/v4/spreadsheets/:id", get(spreadsheet_meta))
            .route("/v4/spreadsheets/:id/values/:range", get(values_get).put(values_update))
            .with_state(state.clone());
        let base_url = serve(router).await?;
        Ok(Self { base_url, state })
    }

    pub fn api_base(&self) -> String {
        format!("{}/v4", self.base_url)
    }

    pub fn service_account_key(&self) -> ServiceAccountKey {
        let raw = json!({
            "type": "service_account",
            "client_email": "bridge@test-project.iam.gserviceaccount.com",
            "private_key": TEST_PRIVATE_KEY,
            "private_key_id": "test-kid",
            "token_uri": format!("{}/token", self.base_url),
        });
        ServiceAccountKey::from_json(&raw.to_string()).expect("test key")
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeGoogleState> {
        self.state.lock().unwrap()
    }
}

type Shared = Arc<Mutex<FakeGoogleState>>;

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    state.token_requests += 1;

    let grant_ok = form.get("grant_type").map(String::as_str) == Some("urn:ietf:params:oauth:grant-type:jwt-bearer");
    let has_assertion = form.get("assertion").is_some_and(|a| a.split('.').count() == 3);
    if state.reject_tokens || !grant_ok || !has_assertion {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_grant" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "access_token": FAKE_TOKEN, "expires_in": 3599, "token_type": "Bearer" })),
    )
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", FAKE_TOKEN))
}

async fn spreadsheet_meta(State(state): State<Shared>, headers: HeaderMap) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    if !authorized(&headers) {
        state.unauthorized_calls += 1;
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthenticated" })));
    }
    let sheets: Vec<Value> = state
        .tabs
        .iter()
        .map(|title| json!({ "properties": { "title": title } }))
        .collect();
    (StatusCode::OK, Json(json!({ "sheets": sheets })))
}

async fn values_get(
    State(state): State<Shared>,
    UrlPath((_id, range)): UrlPath<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    if !authorized(&headers) {
        state.unauthorized_calls += 1;
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthenticated" })));
    }
    state.reads.push(range.clone());
    (
        StatusCode::OK,
        Json(json!({ "range": range, "majorDimension": "ROWS", "values": state.rows })),
    )
}

async fn values_update(
    State(state): State<Shared>,
    UrlPath((_id, range)): UrlPath<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    if !authorized(&headers) {
        state.unauthorized_calls += 1;
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthenticated" })));
    }

    if let (Some((row, col)), Some(value)) = (parse_a1_cell(&range), body.pointer("/values/0/0")) {
        let rows = &mut state.rows;
        if rows.len() < row {
            rows.resize_with(row, Vec::new);
        }
        let cells = &mut rows[row - 1];
        if cells.len() < col {
            cells.resize(col, json!(""));
        }
        cells[col - 1] = value.clone();
    }
    state.writes.push((range.clone(), body));
    (StatusCode::OK, Json(json!({ "updatedRange": range, "updatedCells": 1 })))
}

/// `'Tab'!B3` -> (3, 2), both 1-based.
pub fn parse_a1_cell(range: &str) -> Option<(usize, usize)> {
    let cell = range.rsplit('!').next()?;
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let row: usize = cell[letters.len()..].parse().ok()?;
    let col = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1));
    (row > 0 && col > 0).then_some((row, col))
}
