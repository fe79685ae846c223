//! Summary store queries
//!
//! Rows are unique per (owner_id, video_id): resubmission updates content
//! in place and never creates a second row. Inserts never write the usage
//! event themselves; the guard runs insert + event in one transaction so
//! the ledger and the summaries table move together. Functions take a
//! generic executor so they compose into caller transactions.

use chrono::{NaiveDateTime, Utc};
use recap_common::db::models::Summary;
use recap_common::plan::ANONYMOUS_OWNER_ID;
use recap_common::{Error, Result};
use sqlx::Sqlite;
use uuid::Uuid;

/// Fetch a summary by id
pub async fn get_by_id<'e, E>(executor: E, summary_id: &str) -> Result<Option<Summary>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let summary = sqlx::query_as::<_, Summary>("SELECT * FROM summaries WHERE guid = ?")
        .bind(summary_id)
        .fetch_optional(executor)
        .await?;

    Ok(summary)
}

/// Fetch the summary for (owner, video) if one exists
pub async fn find_by_owner_video<'e, E>(
    executor: E,
    owner_id: &str,
    video_id: &str,
) -> Result<Option<Summary>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let summary =
        sqlx::query_as::<_, Summary>("SELECT * FROM summaries WHERE owner_id = ? AND video_id = ?")
            .bind(owner_id)
            .bind(video_id)
            .fetch_optional(executor)
            .await?;

    Ok(summary)
}

/// Insert a new summary row and return it
pub async fn insert_summary<'e, E>(
    executor: E,
    owner_id: &str,
    video_id: &str,
    content: &str,
    metadata_json: &str,
) -> Result<Summary>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let guid = Uuid::new_v4().to_string();

    let summary = sqlx::query_as::<_, Summary>(
        r#"
        INSERT INTO summaries (guid, owner_id, video_id, content, metadata)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&guid)
    .bind(owner_id)
    .bind(video_id)
    .bind(content)
    .bind(metadata_json)
    .fetch_one(executor)
    .await?;

    Ok(summary)
}

/// Update content and metadata of an existing row (idempotent resubmission)
pub async fn update_summary<'e, E>(
    executor: E,
    summary_id: &str,
    content: &str,
    metadata_json: &str,
) -> Result<Summary>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let summary = sqlx::query_as::<_, Summary>(
        r#"
        UPDATE summaries
        SET content = ?, metadata = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        RETURNING *
        "#,
    )
    .bind(content)
    .bind(metadata_json)
    .bind(summary_id)
    .fetch_optional(executor)
    .await?;

    summary.ok_or_else(|| Error::NotFound(format!("Summary {}", summary_id)))
}

/// Transfer ownership during a claim: new owner, stripped metadata,
/// claim timestamp
pub async fn reassign_owner<'e, E>(
    executor: E,
    summary_id: &str,
    new_owner_id: &str,
    metadata_json: &str,
) -> Result<Summary>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let summary = sqlx::query_as::<_, Summary>(
        r#"
        UPDATE summaries
        SET owner_id = ?, metadata = ?, claimed_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        RETURNING *
        "#,
    )
    .bind(new_owner_id)
    .bind(metadata_json)
    .bind(Utc::now().naive_utc())
    .bind(summary_id)
    .fetch_optional(executor)
    .await?;

    summary.ok_or_else(|| Error::NotFound(format!("Summary {}", summary_id)))
}

/// Delete a summary row (claim dedup discards the anonymous copy)
pub async fn delete_summary<'e, E>(executor: E, summary_id: &str) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM summaries WHERE guid = ?")
        .bind(summary_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Count non-archived summaries owned (free-tier lifetime usage)
pub async fn count_active_for_owner<'e, E>(executor: E, owner_id: &str) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM summaries WHERE owner_id = ? AND archived = 0")
            .bind(owner_id)
            .fetch_one(executor)
            .await?;

    Ok(count)
}

/// Count summaries an owner created at or after the given instant
/// (pro-tier monthly usage)
pub async fn count_created_since<'e, E>(
    executor: E,
    owner_id: &str,
    since: NaiveDateTime,
) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM summaries WHERE owner_id = ? AND archived = 0 AND created_at >= ?",
    )
    .bind(owner_id)
    .bind(since)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Count sentinel-owned summaries whose stored fingerprint or client IP
/// equals either provided signal (artifact side of the anonymous counts)
pub async fn count_matching_signals<'e, E>(
    executor: E,
    fingerprint: Option<&str>,
    client_ip: Option<&str>,
) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM summaries
        WHERE owner_id = ?1
          AND (
                (?2 IS NOT NULL AND json_extract(metadata, '$.fingerprint') = ?2)
             OR (?3 IS NOT NULL AND json_extract(metadata, '$.client_ip') = ?3)
          )
        "#,
    )
    .bind(ANONYMOUS_OWNER_ID.to_string())
    .bind(fingerprint)
    .bind(client_ip)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// All sentinel-owned summaries carrying the given fingerprint
/// (auto-claim candidates)
pub async fn list_sentinel_by_fingerprint<'e, E>(
    executor: E,
    fingerprint: &str,
) -> Result<Vec<Summary>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let summaries = sqlx::query_as::<_, Summary>(
        r#"
        SELECT * FROM summaries
        WHERE owner_id = ?
          AND json_extract(metadata, '$.fingerprint') = ?
        ORDER BY created_at
        "#,
    )
    .bind(ANONYMOUS_OWNER_ID.to_string())
    .bind(fingerprint)
    .fetch_all(executor)
    .await?;

    Ok(summaries)
}
