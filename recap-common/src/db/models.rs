//! Database models
//!
//! Row structs plus the typed views of the JSON metadata columns. Storage
//! stays an open JSON document (no schema migration for new signal fields);
//! the application layer reads and writes it through the tagged types here.

use crate::plan::Plan;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Owner row: an authenticated account or the anonymous sentinel
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Owner {
    pub guid: String,
    pub plan: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Owner {
    /// Parse the stored plan string into the closed tier enum
    pub fn plan_tier(&self) -> Result<Plan> {
        Plan::from_db_string(&self.plan)
            .ok_or_else(|| Error::Internal(format!("Unknown plan in owners table: {}", self.plan)))
    }
}

/// Summary row: one AI-generated summary, unique per (owner_id, video_id)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Summary {
    pub guid: String,
    pub owner_id: String,
    pub video_id: String,
    pub content: String,
    pub metadata: String,
    pub archived: i64,
    pub claimed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Summary {
    /// Parse the metadata JSON column
    pub fn metadata_doc(&self) -> Result<SummaryMetadata> {
        serde_json::from_str(&self.metadata)
            .map_err(|e| Error::Internal(format!("Corrupt summary metadata: {}", e)))
    }
}

/// Usage event row: one immutable consumption-ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsageEvent {
    pub guid: String,
    pub owner_id: String,
    pub event_type: String,
    pub summary_id: Option<String>,
    pub video_id: Option<String>,
    pub metadata: String,
    pub created_at: NaiveDateTime,
}

/// Event type written when a new summary consumes quota
pub const EVENT_SUMMARY_CREATED: &str = "summary_created";

/// Quota-exempt audit event type written when a claim transfers ownership
pub const EVENT_CLAIMED: &str = "claimed";

/// Typed view of the usage_events metadata column, tagged per event type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventMetadata {
    /// Written once per new summary, in the same transaction as the insert
    SummaryCreated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fingerprint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ip: Option<String>,
        plan: Plan,
    },
    /// Audit trail for ownership transfer; never counted against quota
    Claimed {
        claimed_from: String,
        plan: Plan,
    },
}

impl EventMetadata {
    /// Event type string stored in the usage_events.event_type column
    pub fn event_type(&self) -> &'static str {
        match self {
            EventMetadata::SummaryCreated { .. } => EVENT_SUMMARY_CREATED,
            EventMetadata::Claimed { .. } => EVENT_CLAIMED,
        }
    }

    /// Serialize to the JSON document stored in the metadata column
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize event metadata: {}", e)))
    }
}

/// Typed view of the summaries metadata column
///
/// fingerprint/client_ip are present only on sentinel-owned summaries and
/// are stripped during a claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl SummaryMetadata {
    /// Serialize to the JSON document stored in the metadata column
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize summary metadata: {}", e)))
    }

    /// Drop the anonymous-only identity signals (claim privacy step)
    pub fn without_signals(mut self) -> Self {
        self.fingerprint = None;
        self.client_ip = None;
        self
    }
}
