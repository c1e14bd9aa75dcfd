//! Document store adapter
//!
//! Persists analysis results keyed by owner and id. Records are
//! immutable once inserted; history listing orders newest-first with a
//! deterministic id tiebreak for equal timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use clauseguard_common::types::{ContractAnalysis, Document, HistoryEntry, RiskFlag};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn encode_risks(risks: &[RiskFlag]) -> Result<String, sqlx::Error> {
    serde_json::to_string(risks).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

fn decode_risks(raw: &str) -> Result<Vec<RiskFlag>, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Insert a validated analysis result and return the canonical record.
///
/// The id and upload timestamp are server-assigned here; a failed insert
/// leaves no row behind and therefore consumes no free-tier quota.
pub async fn insert(
    pool: &SqlitePool,
    user_id: &str,
    filename: &str,
    analysis: &ContractAnalysis,
) -> Result<Document, sqlx::Error> {
    let id = Uuid::new_v4();
    let uploaded_at = Utc::now();
    // Fixed-width timestamps keep lexicographic order chronological
    let uploaded_at_str = uploaded_at.to_rfc3339_opts(SecondsFormat::Micros, true);

    sqlx::query(
        r#"
        INSERT INTO documents (id, user_id, filename, uploaded_at, summary, risks)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id)
    .bind(filename)
    .bind(&uploaded_at_str)
    .bind(&analysis.summary)
    .bind(encode_risks(&analysis.risks)?)
    .execute(pool)
    .await?;

    Ok(Document {
        id,
        user_id: user_id.to_string(),
        filename: filename.to_string(),
        uploaded_at,
        summary: analysis.summary.clone(),
        risks: analysis.risks.clone(),
    })
}

/// Ownership-scoped fetch.
///
/// An id owned by another user is indistinguishable from an absent id;
/// both return `None` so document existence never leaks across owners.
pub async fn get(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Document>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, filename, uploaded_at, summary, risks
        FROM documents
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let id_str: String = row.get("id");
            let uploaded_at_str: String = row.get("uploaded_at");
            let risks_str: String = row.get("risks");
            Ok(Some(Document {
                id: Uuid::parse_str(&id_str)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
                user_id: row.get("user_id"),
                filename: row.get("filename"),
                uploaded_at: decode_timestamp(&uploaded_at_str)?,
                summary: row.get("summary"),
                risks: decode_risks(&risks_str)?,
            }))
        }
        None => Ok(None),
    }
}

/// History listing for one owner, newest first.
pub async fn list(pool: &SqlitePool, user_id: &str) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, filename, uploaded_at
        FROM documents
        WHERE user_id = ?
        ORDER BY uploaded_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let id_str: String = row.get("id");
        let uploaded_at_str: String = row.get("uploaded_at");
        entries.push(HistoryEntry {
            id: Uuid::parse_str(&id_str).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            filename: row.get("filename"),
            uploaded_at: decode_timestamp(&uploaded_at_str)?,
        });
    }
    Ok(entries)
}

/// Count of documents owned by the user
pub async fn count_for_user(pool: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Whether a document id exists at all, regardless of owner
pub async fn exists(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}
