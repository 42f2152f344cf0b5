//! Error taxonomy for the monitoring core.
//!
//! Every variant is handled at the component boundary where it occurs and
//! downgraded to a degraded-state value (offline status, heuristic
//! location, seed-only topology). Nothing here is allowed to halt the
//! host loop.

use thiserror::Error;

/// Errors produced by the discovery, polling, and resolution components.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Connection error or timeout talking to a relay or collaborator.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// A response arrived but did not have the expected shape.
    #[error("malformed response from {url}: {reason}")]
    Malformed {
        /// Endpoint that produced the response.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Every configured seed failed to produce cluster membership data.
    #[error("no cluster info available from any seed")]
    NoClusterInfo,
}

impl MonitorError {
    /// Construct a malformed-response error.
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
