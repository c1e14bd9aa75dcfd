//! Document intake, retrieval, and entitlement probe
//!
//! The submit handler is the full pipeline: authenticate, authorize
//! against the free-tier/subscription policy, extract text, invoke the
//! analysis backend, persist, and return the canonical record. A request
//! either fully succeeds or fully fails; nothing partial is stored.

use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::analyze::{self, AnalysisError};
use crate::db;
use crate::entitlement::{self, Entitlement};
use crate::error::{ApiError, ApiResult};
use crate::identity::resolve_user;
use crate::AppState;

async fn require_user(state: &AppState, headers: &HeaderMap) -> ApiResult<String> {
    resolve_user(state.identity.as_ref(), headers)
        .await
        .ok_or(ApiError::Unauthenticated)
}

/// POST /api/documents
///
/// Multipart upload with a `file` field. The entitlement check runs
/// before any extraction or backend work so a denied caller costs
/// nothing downstream.
pub async fn submit_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let user_id = require_user(&state, &headers).await?;

    if entitlement::authorize(&state.db, &user_id).await? == Entitlement::Deny {
        return Err(ApiError::EntitlementDenied);
    }

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed upload body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "document.pdf".to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Malformed upload body: {}", e)))?;
            file = Some((filename, bytes.to_vec()));
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::Validation("No file provided".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".to_string()));
    }

    let extracted = state
        .extractor
        .extract(&bytes)
        .map_err(|_| ApiError::UnreadableDocument)?;

    let analysis = analyze::invoke(
        state.analyzer.as_ref(),
        state.options.analysis_max_retries,
        &extracted,
    )
    .await
    .map_err(|e| match e {
        AnalysisError::Format(msg) => ApiError::AnalysisFormat(msg),
        AnalysisError::Upstream(msg) => ApiError::UpstreamUnavailable(msg),
    })?;

    let document = db::documents::insert(&state.db, &user_id, &filename, &analysis)
        .await
        .map_err(ApiError::Persistence)?;

    info!(
        user_id,
        document_id = %document.id,
        risks = document.risks.len(),
        "Document analyzed and stored"
    );

    Ok(Json(json!({ "document": document })))
}

/// GET /api/documents
///
/// Entitlement probe so a client can redirect to billing before
/// attempting an upload that would be denied.
pub async fn entitlement_probe(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let user_id = require_user(&state, &headers).await?;

    let count = entitlement::document_count(&state.db, &user_id).await?;
    let paid = entitlement::is_paid(&state.db, &user_id).await?;

    Ok(Json(json!({ "count": count, "paid": paid })))
}

/// GET /api/documents/:id
///
/// Ownership-scoped fetch; an id owned by someone else 404s.
pub async fn get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = require_user(&state, &headers).await?;

    let document = db::documents::get(&state.db, &id, &user_id)
        .await
        .map_err(ApiError::Persistence)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(json!({ "document": document })))
}

/// GET /api/history
///
/// The caller's documents, newest first, summary fields only.
pub async fn list_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let user_id = require_user(&state, &headers).await?;

    let documents = db::documents::list(&state.db, &user_id)
        .await
        .map_err(ApiError::Persistence)?;

    Ok(Json(json!({ "documents": documents })))
}
