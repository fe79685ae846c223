//! Usage guard
//!
//! The single orchestration layer over identity, quota, ledger, store and
//! cache: every summary-creating request and every usage report passes
//! through here.
//!
//! Ordering matters: the (owner, video) existence check runs before any
//! quota decision, because an idempotent resubmission must succeed and must
//! never consume quota twice. The anonymous tier re-checks its signal
//! counts inside the same transaction that writes the summary and its
//! usage event; SQLite serializes the racing write transactions, so only
//! one of two concurrent first requests can commit the first event, and
//! the loser retries against the committed state. Authenticated tiers skip
//! that serialization; the accepted worst case under pathological
//! concurrency is one extra over-limit summary.

use crate::cache::ReadThroughCache;
use crate::identity::ClientSignals;
use crate::quota::{self, QuotaDecision};
use crate::summarizer::Summarizer;
use crate::{ledger, owners, store, video};
use chrono::Utc;
use recap_common::db::retry::retry_on_lock;
use recap_common::db::models::{EventMetadata, Summary, SummaryMetadata};
use recap_common::plan::ANONYMOUS_OWNER_ID;
use recap_common::{Error, Plan, Result};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of a create call: the summary plus whether this request created it
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub summary: Summary,
    pub created: bool,
}

pub struct UsageGuard {
    db: Pool<Sqlite>,
    cache: Arc<ReadThroughCache<i64>>,
    cache_ttl: Duration,
    lock_max_wait_ms: u64,
    summarizer: Arc<dyn Summarizer>,
}

impl UsageGuard {
    pub fn new(
        db: Pool<Sqlite>,
        cache: Arc<ReadThroughCache<i64>>,
        cache_ttl: Duration,
        lock_max_wait_ms: u64,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            db,
            cache,
            cache_ttl,
            lock_max_wait_ms,
            summarizer,
        }
    }

    /// Create (or idempotently return) a summary for an authenticated owner
    pub async fn create(&self, owner_id: &str, url: &str) -> Result<CreateOutcome> {
        let video_id = video::validate_video_url(url)?;

        if owner_id == ANONYMOUS_OWNER_ID.to_string() {
            return Err(Error::Validation(
                "Anonymous requests use the anonymous endpoint".to_string(),
            ));
        }

        let owner = owners::get_or_create_owner(&self.db, owner_id).await?;
        let plan = owner.plan_tier()?;

        // Resubmission path: same artifact back, no quota consumed
        if let Some(existing) = store::find_by_owner_video(&self.db, owner_id, &video_id).await? {
            let refreshed = self.enrich(existing).await;
            return Ok(CreateOutcome {
                summary: refreshed,
                created: false,
            });
        }

        let decision = self.owner_usage_decision(owner_id, plan).await?;
        if !decision.allowed {
            return Err(quota_error(decision));
        }

        let metadata = SummaryMetadata {
            source_url: Some(url.to_string()),
            ..Default::default()
        }
        .to_json()?;

        let event = EventMetadata::SummaryCreated {
            fingerprint: None,
            client_ip: None,
            plan,
        };

        let mut tx = self.db.begin().await?;
        let summary = match store::insert_summary(&mut *tx, owner_id, &video_id, "", &metadata).await
        {
            Ok(summary) => summary,
            // A racing request for the same video committed between the
            // pre-check and this insert; its transaction already wrote the
            // usage event, so fall back to the idempotent path
            Err(e) if e.is_unique_violation() => {
                tx.rollback().await?;
                let existing = store::find_by_owner_video(&self.db, owner_id, &video_id)
                    .await?
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "Summary for ({}, {}) vanished after unique conflict",
                            owner_id, video_id
                        ))
                    })?;
                let refreshed = self.enrich(existing).await;
                return Ok(CreateOutcome {
                    summary: refreshed,
                    created: false,
                });
            }
            Err(e) => return Err(e),
        };
        ledger::record_event(
            &mut *tx,
            owner_id,
            Some(&summary.guid),
            Some(&video_id),
            &event,
        )
        .await?;
        tx.commit().await?;

        self.cache
            .invalidate_prefix(&format!("owner:{}", owner_id))
            .await;

        info!(owner_id, video_id = %video_id, plan = plan.to_db_string(), "Summary created");

        ledger::verify_creation_invariant(&self.db, owner_id).await?;

        let summary = self.enrich(summary).await;
        Ok(CreateOutcome {
            summary,
            created: true,
        })
    }

    /// Create (or idempotently return) a summary for an anonymous visitor
    pub async fn create_anonymous(
        &self,
        signals: &ClientSignals,
        url: &str,
    ) -> Result<CreateOutcome> {
        let video_id = video::validate_video_url(url)?;
        let sentinel = ANONYMOUS_OWNER_ID.to_string();

        // Resubmission path: the sentinel artifact for this video already
        // exists; content refreshes, stored signals stay as first written
        if let Some(existing) = store::find_by_owner_video(&self.db, &sentinel, &video_id).await? {
            let refreshed = self.enrich(existing).await;
            return Ok(CreateOutcome {
                summary: refreshed,
                created: false,
            });
        }

        let metadata = SummaryMetadata {
            fingerprint: signals.fingerprint.clone(),
            client_ip: Some(signals.client_ip.clone()),
            source_url: Some(url.to_string()),
        }
        .to_json()?;

        let event = EventMetadata::SummaryCreated {
            fingerprint: signals.fingerprint.clone(),
            client_ip: Some(signals.client_ip.clone()),
            plan: Plan::Anonymous,
        };

        // Check-and-write in one serialized transaction, retried as a whole
        // on lock contention so the re-check always sees committed state
        let (summary, created) = retry_on_lock("anonymous create", self.lock_max_wait_ms, || {
            let sentinel = sentinel.clone();
            let video_id = video_id.clone();
            let metadata = metadata.clone();
            let event = event.clone();
            async move {
                let mut tx = self.db.begin().await?;

                // A racing request for the same video may have committed
                // since the pre-check; fall back to the idempotent path
                if let Some(existing) =
                    store::find_by_owner_video(&mut *tx, &sentinel, &video_id).await?
                {
                    tx.rollback().await?;
                    return Ok((existing, false));
                }

                let usage = anonymous_usage(&mut tx, signals).await?;
                let decision = quota::evaluate(Plan::Anonymous, usage, Utc::now());
                if !decision.allowed {
                    tx.rollback().await?;
                    return Err(quota_error(decision));
                }

                let summary =
                    store::insert_summary(&mut *tx, &sentinel, &video_id, "", &metadata).await?;
                ledger::record_event(
                    &mut *tx,
                    &sentinel,
                    Some(&summary.guid),
                    Some(&video_id),
                    &event,
                )
                .await?;
                tx.commit().await?;

                Ok((summary, true))
            }
        })
        .await?;

        self.cache.invalidate_prefix("anon:").await;
        self.cache
            .invalidate_prefix(&format!("owner:{}", sentinel))
            .await;

        if created {
            info!(
                video_id = %video_id,
                fingerprint = signals.fingerprint.as_deref().unwrap_or("-"),
                client_ip = %signals.client_ip,
                "Anonymous summary created"
            );
            ledger::verify_creation_invariant(&self.db, &sentinel).await?;
        }

        let summary = self.enrich(summary).await;
        Ok(CreateOutcome { summary, created })
    }

    /// Usage report for an authenticated owner.
    ///
    /// Unknown owners are provisioned on first use just like the create
    /// path, so a fresh account sees its full free-tier allowance instead
    /// of a not-found error.
    pub async fn get_usage(&self, owner_id: &str) -> Result<QuotaDecision> {
        let owner = owners::get_or_create_owner(&self.db, owner_id).await?;
        let plan = owner.plan_tier()?;
        self.owner_usage_decision(owner_id, plan).await
    }

    /// Usage report for an anonymous signal pair
    pub async fn get_anonymous_usage(&self, signals: &ClientSignals) -> Result<QuotaDecision> {
        let key = format!(
            "anon:fp:{}:ip:{}",
            signals.fingerprint.as_deref().unwrap_or("-"),
            signals.client_ip
        );

        let usage = self
            .cache
            .get_or_compute(&key, self.cache_ttl, || async {
                let mut conn = self.db.acquire().await?;
                anonymous_usage(&mut conn, signals).await
            })
            .await?;

        Ok(quota::evaluate(Plan::Anonymous, usage, Utc::now()))
    }

    /// Evaluate quota for an owner from its tier-specific usage count
    async fn owner_usage_decision(&self, owner_id: &str, plan: Plan) -> Result<QuotaDecision> {
        let now = Utc::now();
        let key = format!("owner:{}:usage", owner_id);

        let usage = match plan {
            // Unmetered, no query needed
            Plan::Enterprise => 0,
            Plan::Free => {
                self.cache
                    .get_or_compute(&key, self.cache_ttl, || async {
                        store::count_active_for_owner(&self.db, owner_id).await
                    })
                    .await?
            }
            Plan::Pro => {
                let since = quota::month_start(now).naive_utc();
                self.cache
                    .get_or_compute(&key, self.cache_ttl, || async {
                        store::count_created_since(&self.db, owner_id, since).await
                    })
                    .await?
            }
            Plan::Anonymous => {
                return Err(Error::Validation(
                    "Anonymous usage is keyed by signals, not an owner id".to_string(),
                ))
            }
        };

        Ok(quota::evaluate(plan, usage, now))
    }

    /// Run the summarization pipeline and store its output.
    ///
    /// Never fails the request: the quota was consumed when the artifact
    /// was committed, and a partial enrichment does not undo that.
    async fn enrich(&self, summary: Summary) -> Summary {
        match self.summarizer.summarize(&summary.video_id).await {
            Ok(content) if content != summary.content => {
                match store::update_summary(&self.db, &summary.guid, &content, &summary.metadata)
                    .await
                {
                    Ok(updated) => updated,
                    Err(e) => {
                        warn!(
                            summary_id = %summary.guid,
                            error = %e,
                            "Failed to store enriched content; returning summary as-is"
                        );
                        summary
                    }
                }
            }
            Ok(_) => summary,
            Err(e) => {
                warn!(
                    summary_id = %summary.guid,
                    error = %e,
                    "Summarization failed after quota consumption; artifact kept"
                );
                summary
            }
        }
    }
}

/// Anonymous usage: the maximum across four independent counts
/// (ledger by fingerprint, ledger by IP, summaries by fingerprint,
/// summaries by IP). Taking the maximum prevents bypass by clearing only
/// one signal.
async fn anonymous_usage(conn: &mut SqliteConnection, signals: &ClientSignals) -> Result<i64> {
    let fp = signals.fingerprint.as_deref();
    let ip = signals.client_ip.as_str();

    let mut usage = 0i64;

    if fp.is_some() {
        usage = usage.max(ledger::count_matching_signals(&mut *conn, fp, None).await?);
        usage = usage.max(store::count_matching_signals(&mut *conn, fp, None).await?);
    }

    usage = usage.max(ledger::count_matching_signals(&mut *conn, None, Some(ip)).await?);
    usage = usage.max(store::count_matching_signals(&mut *conn, None, Some(ip)).await?);

    Ok(usage)
}

fn quota_error(decision: QuotaDecision) -> Error {
    Error::QuotaExceeded {
        message: decision
            .reason
            .unwrap_or_else(|| "Quota exceeded".to_string()),
        current_usage: decision.current_usage,
        limit: decision.limit.unwrap_or(0),
    }
}
