//! Claim and auto-claim behavior

mod common;

use common::*;
use recap_api::identity::ClientSignals;
use recap_api::{ledger, store};
use recap_common::db::models::{EVENT_CLAIMED, EVENT_SUMMARY_CREATED};
use recap_common::plan::ANONYMOUS_OWNER_ID;
use recap_common::Error;

fn visitor(fingerprint: &str, client_ip: &str) -> ClientSignals {
    ClientSignals {
        fingerprint: Some(fingerprint.to_string()),
        client_ip: client_ip.to_string(),
    }
}

#[tokio::test]
async fn test_claim_missing_summary_is_not_found() {
    let (_tmp, state) = test_state().await;

    let result = state.claims.claim("u1", "no-such-summary").await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_claim_is_single_use() {
    let (_tmp, state) = test_state().await;

    let created = state
        .guard
        .create_anonymous(&visitor("fp1", "1.2.3.4"), URL_A)
        .await
        .unwrap();

    state.claims.claim("u1", &created.summary.guid).await.unwrap();

    // Second claim of the same artifact, by anyone, is refused
    let again = state.claims.claim("u2", &created.summary.guid).await;
    assert!(matches!(again, Err(Error::AlreadyClaimed(_))));
    let self_again = state.claims.claim("u1", &created.summary.guid).await;
    assert!(matches!(self_again, Err(Error::AlreadyClaimed(_))));
}

#[tokio::test]
async fn test_claim_transfers_ownership_and_strips_signals() {
    let (_tmp, state) = test_state().await;
    let sentinel = ANONYMOUS_OWNER_ID.to_string();

    let created = state
        .guard
        .create_anonymous(&visitor("fp1", "1.2.3.4"), URL_A)
        .await
        .unwrap();

    let claimed = state.claims.claim("u1", &created.summary.guid).await.unwrap();

    assert_eq!(claimed.owner_id, "u1");
    assert!(claimed.claimed_at.is_some());

    // Identity signals left the metadata; provenance stays
    let metadata = claimed.metadata_doc().unwrap();
    assert_eq!(metadata.fingerprint, None);
    assert_eq!(metadata.client_ip, None);
    assert!(metadata.source_url.is_some());

    // Audit event exists for the new owner and is quota-exempt: the
    // owner's creation-event count is still zero
    assert_eq!(event_count(&state, "u1", EVENT_CLAIMED).await, 1);
    assert_eq!(event_count(&state, "u1", EVENT_SUMMARY_CREATED).await, 0);

    // The creation event stays with the sentinel ledger
    assert_eq!(event_count(&state, &sentinel, EVENT_SUMMARY_CREATED).await, 1);

    // The claimed artifact counts toward the owner's lifetime total
    let usage = state.guard.get_usage("u1").await.unwrap();
    assert_eq!(usage.current_usage, 1);
}

#[tokio::test]
async fn test_claim_dedup_keeps_single_artifact_per_video() {
    let (_tmp, state) = test_state().await;
    let sentinel = ANONYMOUS_OWNER_ID.to_string();

    // Owner already created this video themselves
    let own = state.guard.create("u1", URL_A).await.unwrap();

    // An anonymous visitor created the same video
    let anon = state
        .guard
        .create_anonymous(&visitor("fp1", "1.2.3.4"), URL_A)
        .await
        .unwrap();

    let result = state.claims.claim("u1", &anon.summary.guid).await.unwrap();

    // The existing summary wins; the anonymous copy is gone
    assert_eq!(result.guid, own.summary.guid);
    assert_eq!(summary_count(&state, "u1").await, 1);
    assert_eq!(summary_count(&state, &sentinel).await, 0);

    // Dedup writes no claimed event
    assert_eq!(event_count(&state, "u1", EVENT_CLAIMED).await, 0);
}

#[tokio::test]
async fn test_auto_claim_collects_matching_fingerprints() {
    let (_tmp, state) = test_state().await;
    let sentinel = ANONYMOUS_OWNER_ID.to_string();

    // Seeded directly: the anonymous quota would never allow one visitor
    // three artifacts, but historical data can hold them
    seed_anonymous_summary(&state, "aaaaaaaaaaa", "fp1", "1.2.3.4").await;
    seed_anonymous_summary(&state, "bbbbbbbbbbb", "fp1", "5.6.7.8").await;
    seed_anonymous_summary(&state, "ccccccccccc", "fp2", "1.2.3.4").await;

    let claimed = state.claims.auto_claim("u1", "fp1").await.unwrap();
    assert_eq!(claimed.len(), 2);
    assert_eq!(summary_count(&state, "u1").await, 2);

    // The fp2 artifact stays with the sentinel
    assert_eq!(summary_count(&state, &sentinel).await, 1);
}

#[tokio::test]
async fn test_auto_claim_skips_failures_without_aborting() {
    let (_tmp, state) = test_state().await;

    seed_anonymous_summary(&state, "aaaaaaaaaaa", "fp1", "1.2.3.4").await;
    seed_anonymous_summary(&state, "bbbbbbbbbbb", "fp1", "1.2.3.4").await;

    // Corrupt one candidate's metadata so its claim fails mid-batch
    sqlx::query(
        r#"UPDATE summaries SET metadata = '{"fingerprint":"fp1","client_ip":42}'
           WHERE video_id = 'aaaaaaaaaaa'"#,
    )
    .execute(&state.db)
    .await
    .unwrap();

    let claimed = state.claims.auto_claim("u1", "fp1").await.unwrap();

    // The healthy candidate was still claimed
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].video_id, "bbbbbbbbbbb");
}

#[tokio::test]
async fn test_auto_claim_dedups_against_existing_summaries() {
    let (_tmp, state) = test_state().await;
    let sentinel = ANONYMOUS_OWNER_ID.to_string();

    let own = state.guard.create("u1", URL_A).await.unwrap();
    seed_anonymous_summary(&state, "aaaaaaaaaaa", "fp1", "1.2.3.4").await;
    seed_anonymous_summary(&state, "bbbbbbbbbbb", "fp1", "1.2.3.4").await;

    let claimed = state.claims.auto_claim("u1", "fp1").await.unwrap();
    assert_eq!(claimed.len(), 2);

    // (u1, video A) still resolves to the original artifact, count 1
    let for_a = store::find_by_owner_video(&state.db, "u1", "aaaaaaaaaaa")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(for_a.guid, own.summary.guid);
    assert_eq!(summary_count(&state, "u1").await, 2);
    assert_eq!(summary_count(&state, &sentinel).await, 0);
}

#[tokio::test]
async fn test_claim_event_carries_audit_payload() {
    let (_tmp, state) = test_state().await;

    let anon = state
        .guard
        .create_anonymous(&visitor("fp1", "1.1.1.1"), URL_A)
        .await
        .unwrap();
    state.claims.claim("u1", &anon.summary.guid).await.unwrap();

    let events = ledger::events_for_owner(&state.db, "u1").await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EVENT_CLAIMED);
    assert_eq!(
        events[0].summary_id.as_deref(),
        Some(anon.summary.guid.as_str())
    );
    assert_eq!(events[0].video_id.as_deref(), Some("aaaaaaaaaaa"));

    let payload: serde_json::Value = serde_json::from_str(&events[0].metadata).unwrap();
    assert_eq!(payload["claimed_from"], ANONYMOUS_OWNER_ID.to_string());
    assert_eq!(payload["plan"], "free");
}
