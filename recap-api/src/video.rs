//! Video URL validation
//!
//! Accepts the YouTube URL shapes the product supports and extracts the
//! 11-character video id. A URL that yields no id is a validation error,
//! not a quota consumption.

use once_cell::sync::Lazy;
use recap_common::{Error, Result};
use regex::Regex;

static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})")
            .expect("valid pattern"),
        Regex::new(r"youtube\.com/watch\?.*v=([a-zA-Z0-9_-]{11})").expect("valid pattern"),
    ]
});

/// Extract the video id from a submitted URL
pub fn extract_video_id(url: &str) -> Option<String> {
    for pattern in VIDEO_ID_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(url) {
            if let Some(id) = captures.get(1) {
                return Some(id.as_str().to_string());
            }
        }
    }

    None
}

/// Extract the video id or fail with a caller-recoverable validation error
pub fn validate_video_url(url: &str) -> Result<String> {
    extract_video_id(url)
        .ok_or_else(|| Error::Validation(format!("Not a recognized video URL: {}", url)))
}
