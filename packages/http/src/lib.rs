#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared HTTP plumbing for geoscope's external services (Geoclient and
//! Socrata).
//!
//! Every outbound request goes through [`retry::send_json`], which
//! retries transient failures with exponential backoff.

pub mod retry;

use std::time::Duration;

use thiserror::Error;

pub use retry::send_json;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from an HTTP exchange.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Status code.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// The response body was not valid JSON.
    #[error("JSON parse failed for {url}: {message}")]
    Json {
        /// Request URL.
        url: String,
        /// Parser message.
        message: String,
    },
}

impl HttpError {
    /// Whether the server rejected the request as rate limited.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }
}

/// Builds a client with the given per-request timeout.
///
/// # Errors
///
/// Returns [`HttpError::Http`] if the TLS backend cannot be initialized.
pub fn client(timeout: Duration) -> Result<reqwest::Client, HttpError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("geoscope/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}
