//! Entitlement gate
//!
//! Policy: exactly one free document per identity, lifetime; any further
//! submission requires an active subscription. The decision is evaluated
//! fresh against the store on every submission attempt because
//! subscription state can change between calls.
//!
//! Known race: the count check and the later insert are separate
//! round-trips, so two concurrent submissions by a free user can both
//! pass the check before either commits. Closing it would require a
//! transaction spanning count + insert.

use crate::db;
use crate::error::{ApiError, ApiResult};
use sqlx::SqlitePool;

/// Outcome of an entitlement check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    Allow,
    Deny,
}

/// Count of documents owned by the user
pub async fn document_count(pool: &SqlitePool, user_id: &str) -> ApiResult<i64> {
    db::documents::count_for_user(pool, user_id)
        .await
        .map_err(ApiError::Persistence)
}

/// True iff at least one subscription row for the user is active
pub async fn is_paid(pool: &SqlitePool, user_id: &str) -> ApiResult<bool> {
    db::subscriptions::has_active(pool, user_id)
        .await
        .map_err(ApiError::Persistence)
}

/// Decide whether the user may submit another document
pub async fn authorize(pool: &SqlitePool, user_id: &str) -> ApiResult<Entitlement> {
    let count = document_count(pool, user_id).await?;
    if count == 0 {
        return Ok(Entitlement::Allow);
    }
    if is_paid(pool, user_id).await? {
        return Ok(Entitlement::Allow);
    }
    tracing::warn!(user_id, count, "Submission denied: free tier exhausted");
    Ok(Entitlement::Deny)
}
