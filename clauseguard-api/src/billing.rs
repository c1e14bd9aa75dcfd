//! Billing: webhook event consumer and checkout session creation
//!
//! Inbound webhook deliveries are authenticated by an HMAC-SHA256
//! signature header (`t=<unix>,v1=<hex>`), signed over `"{t}.{payload}"`.
//! A signature failure rejects the whole delivery; a signature-valid
//! event is always acknowledged 2xx, even when semantically ignored, so
//! the processor never enters a retry storm over event types we do not
//! handle.

use async_trait::async_trait;
use chrono::Utc;
use clauseguard_common::config::BillingConfig;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Event type that activates a subscription
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Signature verification failure; the delivery must be rejected non-2xx
/// so the processor retries it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,

    #[error("timestamp outside tolerance")]
    StaleTimestamp,

    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a webhook signature header against the raw payload.
///
/// `now` is passed in rather than read from the clock so the tolerance
/// window is testable.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::StaleTimestamp);
    }

    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice is constant-time
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

/// Signed event pushed by the payment processor
#[derive(Debug, Deserialize)]
pub struct BillingEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: EventObject,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventObject {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Apply a signature-verified event.
///
/// Returns `true` when state was mutated. Unhandled event types, and
/// completed checkouts missing a user id, are logged and acknowledged
/// without mutation.
pub async fn apply_event(pool: &SqlitePool, event: &BillingEvent) -> Result<bool, sqlx::Error> {
    if event.event_type != CHECKOUT_COMPLETED {
        tracing::info!(event_type = %event.event_type, "Ignoring unhandled billing event");
        return Ok(false);
    }

    match event.data.object.metadata.get("user_id") {
        Some(user_id) if !user_id.is_empty() => {
            crate::db::subscriptions::insert_active(pool, user_id).await?;
            tracing::info!(user_id, "Subscription activated via checkout event");
            Ok(true)
        }
        _ => {
            tracing::warn!("Checkout completed event without user_id metadata; acknowledged");
            Ok(false)
        }
    }
}

/// Boundary to the payment processor's hosted checkout flow
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Create a hosted checkout session, returning its redirect URL.
    /// The authenticated user id, when present, rides along as metadata
    /// so the completion webhook can attribute the subscription.
    async fn create_session(
        &self,
        price_id: &str,
        user_id: Option<&str>,
    ) -> anyhow::Result<String>;
}

/// Stripe-compatible checkout client (form-encoded REST API)
pub struct StripeCheckout {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    url: Option<String>,
}

impl StripeCheckout {
    pub fn new(config: &BillingConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let base = config.public_base_url.trim_end_matches('/');
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            success_url: format!("{}/upload", base),
            cancel_url: format!("{}/pricing", base),
        })
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckout {
    async fn create_session(
        &self,
        price_id: &str,
        user_id: Option<&str>,
    ) -> anyhow::Result<String> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "subscription".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("line_items[0][price]".into(), price_id.into()),
            ("line_items[0][quantity]".into(), "1".into()),
            ("success_url".into(), self.success_url.clone()),
            ("cancel_url".into(), self.cancel_url.clone()),
        ];
        if let Some(user_id) = user_id {
            params.push(("metadata[user_id]".into(), user_id.into()));
        }

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("checkout session creation failed with status {}", status);
        }

        let session: SessionResponse = response.json().await?;
        session
            .url
            .ok_or_else(|| anyhow::anyhow!("checkout session response carried no URL"))
    }
}

/// Current unix time, for tolerance checks at the handler boundary
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}
