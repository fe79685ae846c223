//! Tests for database initialization and graceful degradation

use recap_common::db::init::{get_setting_i64, init_database};
use recap_common::plan::ANONYMOUS_OWNER_ID;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recap.db");

    let result = init_database(&db_path).await;
    assert!(
        result.is_ok(),
        "Database initialization failed: {:?}",
        result.err()
    );

    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recap.db");

    let pool1 = init_database(&db_path).await.unwrap();
    drop(pool1);

    // Opening the same file again must succeed and keep existing data
    let pool2 = init_database(&db_path).await;
    assert!(
        pool2.is_ok(),
        "Failed to open existing database: {:?}",
        pool2.err()
    );
}

#[tokio::test]
async fn test_anonymous_sentinel_seeded() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recap.db");

    let pool = init_database(&db_path).await.unwrap();

    let plan: String = sqlx::query_scalar("SELECT plan FROM owners WHERE guid = ?")
        .bind(ANONYMOUS_OWNER_ID.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(plan, "anonymous");

    // Re-running init must not duplicate the sentinel
    drop(pool);
    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM owners WHERE plan = 'anonymous'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recap.db");

    let pool = init_database(&db_path).await.unwrap();

    let ttl = get_setting_i64(&pool, "usage_cache_ttl_seconds", -1)
        .await
        .unwrap();
    assert_eq!(ttl, 30);

    let timeout = get_setting_i64(&pool, "database_busy_timeout_ms", -1)
        .await
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[tokio::test]
async fn test_summary_uniqueness_constraint() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recap.db");

    let pool = init_database(&db_path).await.unwrap();

    let owner = ANONYMOUS_OWNER_ID.to_string();
    sqlx::query("INSERT INTO summaries (guid, owner_id, video_id, content) VALUES (?, ?, ?, ?)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&owner)
        .bind("dQw4w9WgXcQ")
        .bind("first")
        .execute(&pool)
        .await
        .unwrap();

    // Second insert for the same (owner, video) must violate UNIQUE
    let dup = sqlx::query(
        "INSERT INTO summaries (guid, owner_id, video_id, content) VALUES (?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&owner)
    .bind("dQw4w9WgXcQ")
    .bind("second")
    .execute(&pool)
    .await;

    assert!(dup.is_err(), "UNIQUE(owner_id, video_id) not enforced");
}
