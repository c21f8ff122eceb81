//! Error types for remote fetches.

use thiserror::Error;

/// Failure while talking to the articulation API.
///
/// Fatal for the institution directory, absorbed per institution by the
/// articulation fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure: DNS, connect, TLS, timeout, or body read.
    #[error("network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with something other than 200 OK.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body could not be decoded into the expected shape.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Short label for log fields and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::Status { .. } => "status",
            FetchError::Decode { .. } => "decode",
        }
    }
}
