//! Seam to the network.
//!
//! The manifest flows only need two things from the outside world: turning a
//! relative endpoint path into a URL, and sending a parameter map to that URL
//! to get a JSON document back.

#[cfg(feature = "network")]
pub mod http;

use std::collections::BTreeMap;

use thiserror::Error;

/// Request parameters, sent as string pairs.
pub type Params = BTreeMap<String, String>;

/// Failure to get a JSON document from the server.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP client failed to send or read.
    #[cfg(feature = "network")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The body is not JSON.
    #[error("Response body is not JSON: {0}")]
    Body(#[from] serde_json::Error),

    /// No route to the server.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Something that can reach the application server.
pub trait Transport: Send + Sync {
    /// Resolve a relative endpoint path (e.g. `api/application`) to a URL.
    fn build_url(&self, path: &str) -> String;

    /// Send `params` to `url` and return the decoded JSON response.
    ///
    /// # Errors
    ///
    /// Any failure to obtain a JSON document is a [`TransportError`].
    fn request(&self, url: &str, params: &Params) -> Result<serde_json::Value, TransportError>;
}

/// Join a base URL and a relative path with exactly one `/`.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
