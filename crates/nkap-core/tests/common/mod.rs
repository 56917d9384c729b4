#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use nkap_core::api::{ApiClient, ClientConfig};
use nkap_core::auth::MemoryStore;

/// Token the stub server accepts.
pub const VALID_TOKEN: &str = "T1";

/// How long the "slow" routes stall before answering.
pub const STALL: Duration = Duration::from_secs(2);

type Reply = (StatusCode, Json<Value>);

//===========
// Stub State
//===========
#[derive(Clone, Default)]
pub struct StubState {
    pub auth_headers: Arc<Mutex<Vec<Option<String>>>>,
    pub headers: Arc<Mutex<Vec<HeaderMap>>>,
    /// Once set, the server stops honouring `VALID_TOKEN`.
    pub revoked: Arc<AtomicBool>,
    pub hits: Arc<AtomicUsize>,
    pub flaky_hits: Arc<AtomicUsize>,
    pub logout_hits: Arc<AtomicUsize>,
    pub upload_bodies: Arc<Mutex<Vec<String>>>,
}

impl StubState {
    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().expect("lock").clone()
    }

    pub fn last_auth_header(&self) -> Option<String> {
        self.auth_headers().last().cloned().flatten()
    }

    /// A header of the most recent request, as text.
    pub fn last_header(&self, name: header::HeaderName) -> Option<String> {
        self.headers
            .lock()
            .expect("lock")
            .last()
            .and_then(|h| h.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    fn record(&self, headers: &HeaderMap) -> Option<String> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth_headers.lock().expect("lock").push(auth.clone());
        self.headers.lock().expect("lock").push(headers.clone());
        auth
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let sent = self.record(headers);
        !self.revoked.load(Ordering::SeqCst)
            && sent.as_deref() == Some(format!("Bearer {}", VALID_TOKEN).as_str())
    }
}

fn unauthenticated() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthenticated." })),
    )
}

fn user_json() -> Value {
    json!({
        "id": 7,
        "nom": "Ndiaye",
        "prenom": "Fatou",
        "email": "fatou@example.com",
        "solde": "2500.00",
        "code_parrainage": "FAT007"
    })
}

//=========
// Handlers
//=========
async fn balance(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    if !s.authorized(&headers) {
        return unauthenticated();
    }
    (StatusCode::OK, Json(json!({ "success": true, "solde": "2500.00" })))
}

async fn profile(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    if !s.authorized(&headers) {
        return unauthenticated();
    }
    (StatusCode::OK, Json(json!({ "success": true, "user": user_json() })))
}

async fn login(State(s): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    s.record(&headers);
    if body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(json!({ "success": true, "token": VALID_TOKEN, "user": user_json() })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Identifiants incorrects" })),
        )
    }
}

async fn logout(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    s.record(&headers);
    s.logout_hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn forbidden(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    s.record(&headers);
    tokio::time::sleep(Duration::from_millis(150)).await;
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "message": "Token révoqué" })),
    )
}

async fn slow_reject(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    s.record(&headers);
    tokio::time::sleep(Duration::from_millis(300)).await;
    unauthenticated()
}

async fn slow(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    s.record(&headers);
    tokio::time::sleep(STALL).await;
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn invalid(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    s.record(&headers);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "success": false, "message": "Montant invalide" })),
    )
}

async fn echo(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    s.record(&headers);
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn secure_upload(State(s): State<StubState>, headers: HeaderMap, _body: Bytes) -> Reply {
    if !s.authorized(&headers) {
        return unauthenticated();
    }
    (StatusCode::OK, Json(json!({ "success": true, "url": "https://cdn.test/secure" })))
}

async fn refused(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    s.record(&headers);
    (
        StatusCode::OK,
        Json(json!({ "success": false, "message": "Tontine complète" })),
    )
}

async fn flaky(State(s): State<StubState>, headers: HeaderMap) -> Reply {
    s.record(&headers);
    let attempt = s.flaky_hits.fetch_add(1, Ordering::SeqCst);
    if attempt < 2 {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "Maintenance" })),
        )
    } else {
        (StatusCode::OK, Json(json!({ "success": true, "solde": 100 })))
    }
}

async fn transactions(
    State(s): State<StubState>,
    headers: HeaderMap,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Reply {
    if !s.authorized(&headers) {
        return unauthenticated();
    }
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "transactions": {
                "current_page": page,
                "last_page": 3,
                "data": [{ "id": page, "type": "recharge", "montant": "1000" }]
            }
        })),
    )
}

fn uploaded_file_name(body: &str) -> String {
    body.split("filename=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap_or_default()
        .to_string()
}

async fn upload(State(s): State<StubState>, headers: HeaderMap, body: Bytes) -> Reply {
    s.record(&headers);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = String::from_utf8_lossy(&body).to_string();
    s.upload_bodies.lock().expect("lock").push(text.clone());

    if !content_type.starts_with("multipart/form-data") || !text.contains("name=\"image\"") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Aucune image" })),
        );
    }

    let filename = uploaded_file_name(&text);
    if filename.starts_with("reject") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "success": false, "message": "Format non supporté" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "url": format!("https://cdn.test/{}", filename) })),
    )
}

async fn slow_upload(State(s): State<StubState>, headers: HeaderMap, _body: Bytes) -> Reply {
    s.record(&headers);
    tokio::time::sleep(STALL).await;
    (StatusCode::OK, Json(json!({ "success": true, "url": "https://cdn.test/late" })))
}

//=============
// App Factory
//=============
pub async fn spawn_stub() -> (String, StubState) {
    let state = StubState::default();
    let app = Router::new()
        .route("/api/nkap/solde", get(balance))
        .route("/api/nkap/profil", get(profile))
        .route("/api/nkap/connexion", post(login))
        .route("/api/nkap/deconnexion", post(logout))
        .route("/api/nkap/forbidden", get(forbidden))
        .route("/api/nkap/slow-reject", get(slow_reject))
        .route("/api/nkap/slow", get(slow))
        .route("/api/nkap/invalid", post(invalid))
        .route("/api/nkap/tontines/rejoindre", post(refused))
        .route("/api/nkap/flaky", get(flaky).post(flaky))
        .route("/api/nkap/transactions", get(transactions))
        .route("/api/nkap/business/upload-image", post(upload))
        .route("/api/nkap/slow-upload", post(slow_upload))
        .route("/api/nkap/secure-upload", post(secure_upload))
        .route("/api/nkap/echo", get(echo).post(echo))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Failed to read stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub server failed");
    });

    (format!("http://{}/api/nkap", addr), state)
}

/// Base URL pointing at a port nobody listens on.
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe");
    let addr = listener.local_addr().expect("Failed to read probe address");
    drop(listener);
    format!("http://{}/api/nkap", addr)
}

//================
// Client Helpers
//================
pub fn client_with(config: ClientConfig) -> (ApiClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let api = ApiClient::new(config, store.clone()).expect("Failed to build client");
    (api, store)
}

pub fn client(base_url: &str) -> (ApiClient, Arc<MemoryStore>) {
    client_with(ClientConfig::new(base_url))
}

/// Register a handler that counts its invocations.
pub fn count_unauthorized(api: &ApiClient) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    api.set_unauthorized_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    calls
}
