//! Claim coordination
//!
//! Migrates an anonymously-created summary to an authenticated owner.
//! Claims are single-use: only sentinel-owned summaries are claimable. If
//! the new owner already has a summary for the same video, the anonymous
//! copy is discarded and the existing one returned, so the owner's total
//! for that video stays at one. The transferred summary counts toward the
//! new owner's lifetime total from then on; the `claimed` audit event
//! never consumes quota.

use crate::cache::ReadThroughCache;
use crate::{ledger, owners, store};
use recap_common::db::models::{EventMetadata, Summary};
use recap_common::plan::ANONYMOUS_OWNER_ID;
use recap_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ClaimCoordinator {
    db: Pool<Sqlite>,
    cache: Arc<ReadThroughCache<i64>>,
}

impl ClaimCoordinator {
    pub fn new(db: Pool<Sqlite>, cache: Arc<ReadThroughCache<i64>>) -> Self {
        Self { db, cache }
    }

    /// Claim one summary for an authenticated owner
    pub async fn claim(&self, new_owner_id: &str, summary_id: &str) -> Result<Summary> {
        let owner = owners::get_or_create_owner(&self.db, new_owner_id).await?;
        let plan = owner.plan_tier()?;

        let sentinel = ANONYMOUS_OWNER_ID.to_string();
        let mut tx = self.db.begin().await?;

        let summary = store::get_by_id(&mut *tx, summary_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Summary {}", summary_id)))?;

        if summary.owner_id != sentinel {
            return Err(Error::AlreadyClaimed(format!(
                "Summary {} already belongs to an account",
                summary_id
            )));
        }

        // Dedup: the owner already created this video themselves
        if let Some(existing) =
            store::find_by_owner_video(&mut *tx, new_owner_id, &summary.video_id).await?
        {
            store::delete_summary(&mut *tx, summary_id).await?;
            tx.commit().await?;

            info!(
                summary_id,
                new_owner_id,
                video_id = %summary.video_id,
                "Claim deduplicated: anonymous copy discarded in favor of existing summary"
            );

            self.invalidate_owner_caches(new_owner_id).await;
            return Ok(existing);
        }

        // Transfer ownership; anonymous-only signals leave the metadata
        let stripped = summary.metadata_doc()?.without_signals().to_json()?;
        let claimed = store::reassign_owner(&mut *tx, summary_id, new_owner_id, &stripped).await?;

        ledger::record_event(
            &mut *tx,
            new_owner_id,
            Some(summary_id),
            Some(&summary.video_id),
            &EventMetadata::Claimed {
                claimed_from: sentinel,
                plan,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            summary_id,
            new_owner_id,
            video_id = %summary.video_id,
            "Summary claimed"
        );

        self.invalidate_owner_caches(new_owner_id).await;
        Ok(claimed)
    }

    /// Claim every sentinel summary matching the fingerprint, best-effort.
    ///
    /// Each claim is independent: one failure is logged and skipped, never
    /// aborting the batch. Returns the summaries now owned by the caller.
    pub async fn auto_claim(&self, new_owner_id: &str, fingerprint: &str) -> Result<Vec<Summary>> {
        let candidates = store::list_sentinel_by_fingerprint(&self.db, fingerprint).await?;

        let mut claimed = Vec::new();
        for candidate in candidates {
            match self.claim(new_owner_id, &candidate.guid).await {
                Ok(summary) => claimed.push(summary),
                Err(e) => {
                    warn!(
                        summary_id = %candidate.guid,
                        new_owner_id,
                        error = %e,
                        "Auto-claim skipped one summary"
                    );
                }
            }
        }

        info!(
            new_owner_id,
            claimed = claimed.len(),
            "Auto-claim batch complete"
        );

        Ok(claimed)
    }

    async fn invalidate_owner_caches(&self, owner_id: &str) {
        // The claim changed both the owner's aggregates and the anonymous
        // signal-matched counts
        self.cache
            .invalidate_prefix(&format!("owner:{}", owner_id))
            .await;
        self.cache.invalidate_prefix("anon:").await;
    }
}
