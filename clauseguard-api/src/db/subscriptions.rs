//! Subscription state rows
//!
//! Append-only: the billing event consumer inserts an 'active' row on a
//! completed checkout, and paid status is simply "at least one active
//! row exists". No expiry or cancellation path is modeled.

use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// True iff the user currently has at least one active subscription row
pub async fn has_active(pool: &SqlitePool, user_id: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscriptions WHERE user_id = ? AND status = 'active'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Record a subscription activation for the user
pub async fn insert_active(pool: &SqlitePool, user_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, user_id, status, effective_since)
        VALUES (?, ?, 'active', ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    .execute(pool)
    .await?;
    Ok(())
}
