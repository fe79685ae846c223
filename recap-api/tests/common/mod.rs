//! Test utilities shared by the integration suites

use recap_api::summarizer::PlaceholderSummarizer;
use recap_api::AppState;
use recap_common::db::init::init_database;
use recap_common::db::models::EventMetadata;
use recap_common::plan::ANONYMOUS_OWNER_ID;
use recap_common::Plan;
use std::sync::Arc;
use tempfile::TempDir;

pub const URL_A: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";
pub const URL_B: &str = "https://www.youtube.com/watch?v=bbbbbbbbbbb";
pub const URL_C: &str = "https://www.youtube.com/watch?v=ccccccccccc";
pub const URL_D: &str = "https://www.youtube.com/watch?v=ddddddddddd";

/// Application state over a temporary database.
///
/// The TempDir must be kept alive for the duration of the test.
pub async fn test_state_with_ttl(cache_ttl_secs: u64) -> (TempDir, AppState) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("recap-test.db");
    let pool = init_database(&db_path).await.unwrap();

    let state = AppState::new(pool, cache_ttl_secs, 5000, Arc::new(PlaceholderSummarizer));
    (temp_dir, state)
}

pub async fn test_state() -> (TempDir, AppState) {
    test_state_with_ttl(60).await
}

/// Set an owner's plan directly (plan sync is out of scope for the service)
pub async fn set_plan(state: &AppState, owner_id: &str, plan: Plan) {
    sqlx::query("INSERT OR IGNORE INTO owners (guid, plan) VALUES (?, ?)")
        .bind(owner_id)
        .bind(plan.to_db_string())
        .execute(&state.db)
        .await
        .unwrap();
    sqlx::query("UPDATE owners SET plan = ? WHERE guid = ?")
        .bind(plan.to_db_string())
        .bind(owner_id)
        .execute(&state.db)
        .await
        .unwrap();
}

/// Count usage events of one type for an owner
pub async fn event_count(state: &AppState, owner_id: &str, event_type: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM usage_events WHERE owner_id = ? AND event_type = ?")
        .bind(owner_id)
        .bind(event_type)
        .fetch_one(&state.db)
        .await
        .unwrap()
}

/// Count summaries owned
pub async fn summary_count(state: &AppState, owner_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM summaries WHERE owner_id = ?")
        .bind(owner_id)
        .fetch_one(&state.db)
        .await
        .unwrap()
}

/// Seed a sentinel-owned summary plus its creation event directly,
/// bypassing the guard (for claim-path fixtures that need more anonymous
/// artifacts than the quota would allow)
pub async fn seed_anonymous_summary(
    state: &AppState,
    video_id: &str,
    fingerprint: &str,
    client_ip: &str,
) -> String {
    let sentinel = ANONYMOUS_OWNER_ID.to_string();
    let metadata = format!(
        r#"{{"fingerprint":"{}","client_ip":"{}"}}"#,
        fingerprint, client_ip
    );

    let summary = recap_api::store::insert_summary(
        &state.db,
        &sentinel,
        video_id,
        "seeded content",
        &metadata,
    )
    .await
    .unwrap();

    recap_api::ledger::record_event(
        &state.db,
        &sentinel,
        Some(&summary.guid),
        Some(video_id),
        &EventMetadata::SummaryCreated {
            fingerprint: Some(fingerprint.to_string()),
            client_ip: Some(client_ip.to_string()),
            plan: Plan::Anonymous,
        },
    )
    .await
    .unwrap();

    summary.guid
}
