//! Shared test fixtures: in-memory database, fake external boundaries,
//! and request builders for driving the router with `oneshot`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use clauseguard_api::analyze::{AnalysisBackend, BackendError};
use clauseguard_api::billing::CheckoutGateway;
use clauseguard_api::extract::{ExtractError, ExtractedText, PageText, TextExtractor};
use clauseguard_api::identity::IdentityProvider;
use clauseguard_api::{build_router, AppState, StateOptions};
use clauseguard_common::db::init_memory_database;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Identity fake: a fixed token -> user map; unknown tokens resolve to
/// nothing, exactly like a provider rejection.
pub struct FakeIdentity {
    users: HashMap<String, String>,
}

impl FakeIdentity {
    /// Two known users: `tok-a` -> `user-a`, `tok-b` -> `user-b`
    pub fn standard() -> Arc<Self> {
        let mut users = HashMap::new();
        users.insert("tok-a".to_string(), "user-a".to_string());
        users.insert("tok-b".to_string(), "user-b".to_string());
        Arc::new(Self { users })
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn resolve(&self, token: &str) -> Option<String> {
        self.users.get(token).cloned()
    }
}

/// Analysis fake returning a canned raw response, counting invocations
pub struct FakeAnalyzer {
    pub response: Mutex<String>,
    pub calls: AtomicU32,
}

impl FakeAnalyzer {
    pub fn returning(raw: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(raw.to_string()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisBackend for FakeAnalyzer {
    async fn analyze(&self, _document_text: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.lock().unwrap().clone())
    }
}

/// Extractor fake yielding one page of text, counting invocations
pub struct FakeExtractor {
    pub calls: AtomicU32,
}

impl FakeExtractor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextExtractor for FakeExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExtractedText {
            pages: vec![PageText {
                number: 1,
                text: "The tenant shall indemnify the landlord.".to_string(),
            }],
        })
    }
}

/// Extractor fake that fails every input
pub struct UnreadableExtractor;

impl TextExtractor for UnreadableExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
        Err(ExtractError::Unreadable)
    }
}

/// Checkout fake recording the attributed user
pub struct FakeCheckout {
    pub last_user: Mutex<Option<String>>,
}

impl FakeCheckout {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            last_user: Mutex::new(None),
        })
    }
}

#[async_trait]
impl CheckoutGateway for FakeCheckout {
    async fn create_session(
        &self,
        _price_id: &str,
        user_id: Option<&str>,
    ) -> anyhow::Result<String> {
        *self.last_user.lock().unwrap() = user_id.map(String::from);
        Ok("https://pay.example/session/cs_test".to_string())
    }
}

/// Everything a test needs to drive the app and inspect side effects
pub struct TestApp {
    pub router: axum::Router,
    pub db: SqlitePool,
    pub analyzer: Arc<FakeAnalyzer>,
    pub extractor: Arc<FakeExtractor>,
    pub checkout: Arc<FakeCheckout>,
}

/// Build the app with fakes and an in-memory database.
pub async fn setup_app(analyzer_response: &str) -> TestApp {
    let db = init_memory_database().await.expect("init memory db");
    let analyzer = FakeAnalyzer::returning(analyzer_response);
    let extractor = FakeExtractor::new();
    let checkout = FakeCheckout::new();

    let state = AppState::new(
        db.clone(),
        FakeIdentity::standard(),
        analyzer.clone(),
        extractor.clone(),
        checkout.clone(),
        StateOptions {
            webhook_secret: WEBHOOK_SECRET.to_string(),
            analysis_max_retries: 0,
            ..Default::default()
        },
    );

    TestApp {
        router: build_router(state),
        db,
        analyzer,
        extractor,
        checkout,
    }
}

/// A well-formed backend response with `count` identical risks
pub fn valid_analysis(count: usize) -> String {
    let risk = r#"{"title": "Indemnity", "clause": "Tenant shall indemnify landlord.",
                   "page": 1, "citations": ["UCC 2-719"], "blindSpot": "One-sided indemnity."}"#;
    let risks: Vec<&str> = std::iter::repeat(risk).take(count).collect();
    format!(
        r#"{{"summary": "An overview of the agreement.", "risks": [{}]}}"#,
        risks.join(",")
    )
}

const BOUNDARY: &str = "clauseguard-test-boundary";

/// Multipart upload request with a single `file` field
pub fn upload_request(token: Option<&str>, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/documents")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Multipart request without any `file` field
pub fn upload_request_without_file(token: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    Request::builder()
        .method("POST")
        .uri("/api/documents")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}

/// GET request with optional bearer token
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// JSON POST request with optional bearer token
pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Extract JSON body from a response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Insert an active subscription row directly
pub async fn activate_subscription(db: &SqlitePool, user_id: &str) {
    sqlx::query(
        "INSERT INTO subscriptions (id, user_id, status, effective_since)
         VALUES (?, ?, 'active', '2026-01-01T00:00:00Z')",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .execute(db)
    .await
    .expect("insert subscription");
}

/// Insert a document row directly with a controlled id and timestamp
pub async fn seed_document(db: &SqlitePool, id: &str, user_id: &str, uploaded_at: &str) {
    sqlx::query(
        "INSERT INTO documents (id, user_id, filename, uploaded_at, summary, risks)
         VALUES (?, ?, 'seed.pdf', ?, 'seeded summary', '[]')",
    )
    .bind(id)
    .bind(user_id)
    .bind(uploaded_at)
    .execute(db)
    .await
    .expect("insert document");
}
