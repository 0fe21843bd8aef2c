// toolgate-mcp/src/headers.rs
// ============================================================================
// Module: Header Forwarding Filter
// Description: Selects which caller headers become backend call metadata.
// Purpose: Forward an explicit allow-list while stripping hop-by-hop and
// sensitive headers.
// Dependencies: axum
// ============================================================================

//! ## Overview
//! Nothing is forwarded by default: only header names listed in the server's
//! `forward_headers` configuration cross the gateway, and hop-by-hop or
//! cookie-bearing headers are stripped even when listed. `authorization` is
//! forwarded only when explicitly allowed. Matching is case-insensitive and
//! forwarded names are lowercased, as the backend transport requires.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use axum::http::HeaderMap;

// ============================================================================
// SECTION: Filter
// ============================================================================

/// Header names that never cross the gateway, even when allow-listed.
const HARD_BLOCKED_HEADERS: [&str; 10] = [
    "host",
    "connection",
    "content-length",
    "content-type",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "cookie",
    "set-cookie",
];

/// Header name prefixes that never cross the gateway.
const HARD_BLOCKED_PREFIXES: [&str; 2] = ["proxy-", "sec-"];

/// Selects forwarded headers for backend call metadata.
#[derive(Debug, Clone, Default)]
pub struct HeaderFilter {
    /// Lowercased header names the operator chose to forward.
    allowed: BTreeSet<String>,
}

impl HeaderFilter {
    /// Creates a filter from the configured allow-list.
    #[must_use]
    pub fn new(names: &[String]) -> Self {
        Self {
            allowed: names.iter().map(|name| name.to_ascii_lowercase()).collect(),
        }
    }

    /// Returns the forwarded subset of the caller's headers.
    #[must_use]
    pub fn filter(&self, headers: &HeaderMap) -> BTreeMap<String, String> {
        let mut forwarded = BTreeMap::new();
        for (name, value) in headers {
            let name = name.as_str().to_ascii_lowercase();
            if !self.allowed.contains(&name) || is_hard_blocked(&name) {
                continue;
            }
            match value.to_str() {
                Ok(text) => {
                    forwarded.insert(name, text.to_string());
                }
                Err(_) => {
                    tracing::debug!(header = %name, "dropping non-ascii header value");
                }
            }
        }
        forwarded
    }
}

/// Returns whether a lowercased header name is stripped unconditionally.
#[must_use]
pub fn is_hard_blocked(name: &str) -> bool {
    HARD_BLOCKED_HEADERS.contains(&name)
        || HARD_BLOCKED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}
