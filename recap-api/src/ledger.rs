//! Usage ledger queries
//!
//! Append-only log of consumption events. One `summary_created` row is
//! written per new summary, in the same transaction as the summary insert;
//! rows are never mutated or deleted. Functions take a generic executor so
//! the same query can run against the pool or inside a caller's
//! transaction.

use recap_common::db::models::{EventMetadata, UsageEvent, EVENT_SUMMARY_CREATED};
use recap_common::plan::ANONYMOUS_OWNER_ID;
use recap_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

/// Append one immutable usage event, returning its guid
pub async fn record_event<'e, E>(
    executor: E,
    owner_id: &str,
    summary_id: Option<&str>,
    video_id: Option<&str>,
    metadata: &EventMetadata,
) -> Result<String>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO usage_events (guid, owner_id, event_type, summary_id, video_id, metadata)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(owner_id)
    .bind(metadata.event_type())
    .bind(summary_id)
    .bind(video_id)
    .bind(metadata.to_json()?)
    .execute(executor)
    .await?;

    Ok(guid)
}

/// All events for one owner, oldest first
pub async fn events_for_owner<'e, E>(executor: E, owner_id: &str) -> Result<Vec<UsageEvent>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let events = sqlx::query_as::<_, UsageEvent>(
        "SELECT * FROM usage_events WHERE owner_id = ? ORDER BY created_at",
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await?;

    Ok(events)
}

/// Count sentinel-owned creation events whose stored fingerprint or
/// client IP equals either provided signal (OR-match by design: one
/// matching signal alone identifies a repeat visitor).
///
/// Pass a single signal to get one of the four independent counts the
/// anonymous policy takes the maximum of.
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
        SELECT COUNT(*) FROM usage_events
        WHERE owner_id = ?1
          AND event_type = ?2
          AND (
                (?3 IS NOT NULL AND json_extract(metadata, '$.fingerprint') = ?3)
             OR (?4 IS NOT NULL AND json_extract(metadata, '$.client_ip') = ?4)
          )
        "#,
    )
    .bind(ANONYMOUS_OWNER_ID.to_string())
    .bind(EVENT_SUMMARY_CREATED)
    .bind(fingerprint)
    .bind(client_ip)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Count creation events for one owner
pub async fn count_creation_events<'e, E>(executor: E, owner_id: &str) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM usage_events WHERE owner_id = ? AND event_type = ?",
    )
    .bind(owner_id)
    .bind(EVENT_SUMMARY_CREATED)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Audit the creation invariant for one owner: the number of creation
/// events must equal the number of distinct video ids across those events
/// (a mismatch means some video consumed quota twice).
///
/// A violation is logged for operators and surfaced as an error; it is
/// never silently corrected.
pub async fn verify_creation_invariant(db: &Pool<Sqlite>, owner_id: &str) -> Result<()> {
    let (events, distinct_videos): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(DISTINCT video_id)
        FROM usage_events
        WHERE owner_id = ? AND event_type = ?
        "#,
    )
    .bind(owner_id)
    .bind(EVENT_SUMMARY_CREATED)
    .fetch_one(db)
    .await?;

    if events != distinct_videos {
        tracing::error!(
            owner_id,
            creation_events = events,
            distinct_videos,
            "Usage ledger invariant violated: a video consumed quota more than once"
        );
        return Err(Error::InvariantViolation(format!(
            "owner {}: {} creation events for {} distinct videos",
            owner_id, events, distinct_videos
        )));
    }

    Ok(())
}
