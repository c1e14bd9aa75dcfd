//! Billing endpoints: webhook consumer and checkout session creation
//!
//! The webhook is unauthenticated by credential; the signature header is
//! its authentication. Signature-valid deliveries are always
//! acknowledged 2xx even when semantically ignored, so the processor
//! does not retry them; signature failures and malformed bodies are
//! rejected non-2xx to trigger redelivery.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::billing::{self, BillingEvent};
use crate::error::{ApiError, ApiResult};
use crate::identity::resolve_user;
use crate::AppState;

/// Signature header set by the payment processor
const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/billing/webhook
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Signature)?;

    billing::verify_signature(
        &body,
        signature,
        &state.options.webhook_secret,
        state.options.signature_tolerance_secs,
        billing::unix_now(),
    )
    .map_err(|e| {
        warn!("Webhook rejected: {}", e);
        ApiError::Signature
    })?;

    let event: BillingEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Malformed webhook body: {}", e)))?;

    billing::apply_event(&state.db, &event)
        .await
        .map_err(ApiError::Persistence)?;

    Ok(Json(json!({ "received": true })))
}

/// POST /api/billing/checkout
///
/// Body: `{"priceId": string}`. Works for anonymous callers; an
/// authenticated caller's user id rides along as session metadata so the
/// completion webhook can attribute the subscription.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let price_id = body
        .get("priceId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("priceId is required".to_string()))?;

    let user_id = resolve_user(state.identity.as_ref(), &headers).await;

    let url = state
        .checkout
        .create_session(price_id, user_id.as_deref())
        .await
        .map_err(|e| ApiError::UpstreamUnavailable(e.to_string()))?;

    Ok(Json(json!({ "url": url })))
}
