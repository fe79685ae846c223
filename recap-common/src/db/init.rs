//! Database initialization
//!
//! Creates the database on first run, applies pragmas, creates tables and
//! seeds the anonymous sentinel owner and default settings. All statements
//! are idempotent, so startup is safe against an existing database.

use crate::plan::ANONYMOUS_OWNER_ID;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    apply_pragmas(&pool).await?;

    // Schema creation (idempotent - safe to call multiple times)
    create_schema_version_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_owners_table(&pool).await?;
    create_summaries_table(&pool).await?;
    create_usage_events_table(&pool).await?;

    init_default_settings(&pool).await?;

    // Apply configurable busy timeout from settings
    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    Ok(pool)
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL mode allows concurrent readers with one writer; multiple service
    // instances share the database file, so write concurrency matters here
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    // Default busy timeout; re-applied from settings after init
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_owners_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS owners (
            guid TEXT PRIMARY KEY,
            plan TEXT NOT NULL DEFAULT 'free',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Seed the anonymous sentinel owner if it doesn't exist. All
    // unauthenticated visitors share this row; signals in event/summary
    // metadata disambiguate individual visitors.
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO owners (guid, plan)
        VALUES (?, 'anonymous')
        "#,
    )
    .bind(ANONYMOUS_OWNER_ID.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_summaries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            guid TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES owners(guid),
            video_id TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            archived INTEGER NOT NULL DEFAULT 0,
            claimed_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(owner_id, video_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_summaries_owner ON summaries(owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_usage_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS usage_events (
            guid TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            summary_id TEXT,
            video_id TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_usage_events_owner_type \
         ON usage_events(owner_id, event_type)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values. NULL values
/// are reset to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "usage_cache_ttl_seconds", "30").await?;
    ensure_setting(pool, "database_busy_timeout_ms", "5000").await?;

    Ok(())
}

/// Insert a setting with its default value if missing or NULL
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read a setting as an integer, falling back to a default
pub async fn get_setting_i64(pool: &SqlitePool, key: &str, default_value: i64) -> Result<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT CAST(value AS INTEGER) FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.unwrap_or(default_value))
}
