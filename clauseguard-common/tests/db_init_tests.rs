//! Database initialization tests
//!
//! Covers first-run creation, idempotent re-initialization, and the
//! in-memory variant used by the API integration tests.

use clauseguard_common::db::{init_database, init_memory_database};
use sqlx::Row;

#[tokio::test]
async fn test_init_creates_database_and_schema() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("clauseguard.db");

    let pool = init_database(&db_path).await.expect("init database");
    assert!(db_path.exists());

    // All three tables present and queryable
    for table in ["documents", "subscriptions", "feedback"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await
            .expect("table exists");
        assert_eq!(count, 0, "{} starts empty", table);
    }
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("clauseguard.db");

    let pool = init_database(&db_path).await.expect("first init");
    sqlx::query(
        "INSERT INTO documents (id, user_id, filename, uploaded_at, summary, risks)
         VALUES ('d1', 'u1', 'contract.pdf', '2026-01-01T00:00:00Z', 's', '[]')",
    )
    .execute(&pool)
    .await
    .expect("insert");
    pool.close().await;

    // Second init must not drop existing data
    let pool = init_database(&db_path).await.expect("second init");
    let row = sqlx::query("SELECT filename FROM documents WHERE id = 'd1'")
        .fetch_one(&pool)
        .await
        .expect("row survived re-init");
    let filename: String = row.get("filename");
    assert_eq!(filename, "contract.pdf");
}

#[tokio::test]
async fn test_init_creates_parent_directories() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("nested").join("deeper").join("clauseguard.db");

    init_database(&db_path).await.expect("init with missing parents");
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_memory_database_has_schema() {
    let pool = init_memory_database().await.expect("init memory db");

    sqlx::query(
        "INSERT INTO subscriptions (id, user_id, status, effective_since)
         VALUES ('s1', 'u1', 'active', '2026-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .expect("insert into memory schema");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE status = 'active'")
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(count, 1);
}
