//! Anonymous identity resolution
//!
//! Derives the signal pair used to recognize a repeat anonymous visitor:
//! a client-supplied fingerprint (request body, falling back to the
//! `x-anon-fp` header) and the server-observed client IP taken from proxy
//! headers. The IP is never read from the request body. Matching against
//! stored signals is deliberately fuzzy (either signal alone identifies a
//! repeat visitor); this is an abuse deterrent, not a security boundary.

use axum::http::HeaderMap;

/// Fallback header carrying the fingerprint when the body omits it
pub const FINGERPRINT_HEADER: &str = "x-anon-fp";

/// Bucket used when no client IP can be observed. Multiple such clients
/// collapse into one bucket; accepted tradeoff.
pub const UNKNOWN_IP: &str = "unknown";

/// Signal pair for anonymous identity matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSignals {
    pub fingerprint: Option<String>,
    pub client_ip: String,
}

impl ClientSignals {
    /// Resolve signals from the request: body fingerprint first, then the
    /// fallback header; IP from proxy headers only.
    pub fn resolve(headers: &HeaderMap, body_fingerprint: Option<&str>) -> Self {
        let fingerprint = body_fingerprint
            .map(str::trim)
            .filter(|fp| !fp.is_empty())
            .map(ToString::to_string)
            .or_else(|| header_value(headers, FINGERPRINT_HEADER));

        ClientSignals {
            fingerprint,
            client_ip: client_ip_from_headers(headers),
        }
    }
}

/// Extract the client IP from proxy headers
///
/// `x-forwarded-for` may carry a chain ("client, proxy1, proxy2"); the
/// first hop is the client. Falls back to `x-real-ip`, then the unknown
/// bucket.
pub fn client_ip_from_headers(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first_hop) = forwarded.split(',').next() {
            let first_hop = first_hop.trim();
            if !first_hop.is_empty() {
                return first_hop.to_string();
            }
        }
    }

    if let Some(real_ip) = header_value(headers, "x-real-ip") {
        return real_ip;
    }

    UNKNOWN_IP.to_string()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
