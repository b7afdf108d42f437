//! Error Types
//!
//! Failures at the analysis-service boundary. None of these are ever shown
//! to the user as a blocking dialog: the controller degrades (empty catalog,
//! fallback classification, pre-search state) and logs.

use thiserror::Error;

/// A request to the analysis service failed
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout, or other transport failure
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint path, e.g. `/pictures`
        endpoint: String,
        /// The underlying client error
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint path
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// The body could not be decoded into the expected shape
    #[error("Malformed response from {endpoint}: {reason}")]
    Decode {
        /// Endpoint path
        endpoint: String,
        /// Decoder message
        reason: String,
    },

    /// The body decoded but reported `success: false`
    #[error("{endpoint} reported an unsuccessful response")]
    Unsuccessful {
        /// Endpoint path
        endpoint: String,
    },
}

impl FetchError {
    /// Endpoint the failed request was aimed at
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. }
            | Self::Unsuccessful { endpoint } => endpoint,
        }
    }
}

/// The `/agent` fallback classification failed as well
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The fallback request itself failed
    #[error("Fallback classification failed: {0}")]
    Fetch(#[from] FetchError),
}
