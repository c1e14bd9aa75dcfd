//! Feedback recorder
//!
//! Append-only like/dislike signals. Multiple rows per (user, document)
//! pair are permitted; there is no uniqueness constraint at this layer.

use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Append one feedback row
pub async fn insert(
    pool: &SqlitePool,
    user_id: &str,
    document_id: &str,
    liked: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO feedback (id, user_id, document_id, liked, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(document_id)
    .bind(liked)
    .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    .execute(pool)
    .await?;
    Ok(())
}
