//! Feedback capture
//!
//! Any authenticated user may rate any existing document; ownership is
//! not checked. Rows are append-only and duplicates are allowed.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::identity::resolve_user;
use crate::AppState;

/// POST /api/feedback
///
/// Body: `{"documentId": string, "liked": bool}`. The body is validated
/// by hand so a mistyped field is a 400, and the document must exist
/// (dangling feedback ids are rejected rather than appended).
pub async fn submit_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let document_id = body
        .get("documentId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("documentId is required".to_string()))?
        .to_string();
    let liked = body
        .get("liked")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::Validation("liked (boolean) is required".to_string()))?;

    let user_id = resolve_user(state.identity.as_ref(), &headers)
        .await
        .ok_or(ApiError::Unauthenticated)?;

    let exists = db::documents::exists(&state.db, &document_id)
        .await
        .map_err(ApiError::Persistence)?;
    if !exists {
        return Err(ApiError::NotFound);
    }

    db::feedback::insert(&state.db, &user_id, &document_id, liked)
        .await
        .map_err(ApiError::Persistence)?;

    Ok(Json(json!({ "success": true })))
}
