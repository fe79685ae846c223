//! Summarization boundary
//!
//! The AI pipeline is external to this subsystem; the guard only needs
//! something that turns a video id into summary content. Failures after
//! the summary row and its usage event exist never roll that pair back
//! (quota consumption is final once the artifact exists).

use async_trait::async_trait;
use recap_common::Result;

/// Opaque summary producer
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, video_id: &str) -> Result<String>;
}

/// Deterministic stand-in used until the real pipeline is wired up, and by
/// the test suites. Content is a pure function of the video id so
/// idempotent resubmission is observable.
pub struct PlaceholderSummarizer;

#[async_trait]
impl Summarizer for PlaceholderSummarizer {
    async fn summarize(&self, video_id: &str) -> Result<String> {
        Ok(format!("Summary of video {}", video_id))
    }
}
