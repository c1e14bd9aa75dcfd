//! clauseguard-api library - contract-analysis intake service
//!
//! Wires the document-intake pipeline (identity -> entitlement ->
//! extraction -> analysis -> persistence) and the billing webhook
//! channel into one axum application.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod analyze;
pub mod api;
pub mod billing;
pub mod db;
pub mod entitlement;
pub mod error;
pub mod extract;
pub mod identity;

use analyze::AnalysisBackend;
use billing::CheckoutGateway;
use extract::TextExtractor;
use identity::IdentityProvider;

/// Runtime knobs carried into application state
#[derive(Debug, Clone)]
pub struct StateOptions {
    /// Shared secret verifying webhook signatures
    pub webhook_secret: String,
    /// Accepted webhook timestamp skew in seconds
    pub signature_tolerance_secs: i64,
    /// Additional analysis attempts after the first
    pub analysis_max_retries: u32,
    /// Upload size cap in bytes
    pub max_upload_bytes: usize,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            signature_tolerance_secs: 300,
            analysis_max_retries: 2,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Application state shared across HTTP handlers.
///
/// Every external collaborator sits behind a trait object injected here;
/// handlers hold no hidden globals and tests swap in fakes.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Identity provider boundary (bearer token -> user id)
    pub identity: Arc<dyn IdentityProvider>,
    /// Generative analysis backend boundary
    pub analyzer: Arc<dyn AnalysisBackend>,
    /// Uploaded-binary text extraction boundary
    pub extractor: Arc<dyn TextExtractor>,
    /// Payment processor checkout boundary
    pub checkout: Arc<dyn CheckoutGateway>,
    /// Runtime options
    pub options: StateOptions,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        identity: Arc<dyn IdentityProvider>,
        analyzer: Arc<dyn AnalysisBackend>,
        extractor: Arc<dyn TextExtractor>,
        checkout: Arc<dyn CheckoutGateway>,
        options: StateOptions,
    ) -> Self {
        Self {
            db,
            identity,
            analyzer,
            extractor,
            checkout,
            options,
        }
    }
}

/// Build application router.
///
/// Authentication is per-handler: most routes resolve the bearer
/// credential, the webhook authenticates by signature instead, and
/// health plus checkout creation accept anonymous callers.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.options.max_upload_bytes;

    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/documents",
            post(api::submit_document).get(api::entitlement_probe),
        )
        .route("/api/documents/:id", get(api::get_document))
        .route("/api/history", get(api::list_history))
        .route("/api/feedback", post(api::submit_feedback))
        .route("/api/billing/checkout", post(api::create_checkout_session))
        .route("/api/billing/webhook", post(api::billing_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
