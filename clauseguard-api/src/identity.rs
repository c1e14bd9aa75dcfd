//! Identity resolution
//!
//! Turns an opaque bearer credential into a stable user id via the
//! external identity provider. Every unauthenticated state (missing
//! token, rejected token, provider error) collapses to `None`; callers
//! respond 401 without distinguishing the cause.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use clauseguard_common::config::IdentityConfig;
use serde::Deserialize;
use std::time::Duration;

/// Boundary to the external identity provider.
///
/// Stateless and side-effect-free beyond the provider round-trip; fakes
/// implement this in tests.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange a bearer token for a stable user id, or `None` if the
    /// token cannot be resolved for any reason.
    async fn resolve(&self, token: &str) -> Option<String>;
}

/// HTTP identity provider client
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, token: &str) -> Option<String> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header("apikey", &self.service_key)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            tracing::debug!("Identity provider rejected token: {}", response.status());
            return None;
        }

        let user: UserResponse = response.json().await.ok()?;
        if user.id.is_empty() {
            return None;
        }
        Some(user.id)
    }
}

/// Pull the bearer token out of the Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the calling user from request headers.
///
/// The single authentication entry point used by every protected handler.
pub async fn resolve_user(
    provider: &dyn IdentityProvider,
    headers: &HeaderMap,
) -> Option<String> {
    let token = bearer_token(headers)?;
    provider.resolve(token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn missing_or_malformed_header_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
