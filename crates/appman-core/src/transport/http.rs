//! Blocking HTTP transport backed by `reqwest`.

use std::time::Duration;

use reqwest::blocking::Client;

use super::{Params, Transport, TransportError, join_url};

/// Posts form-encoded parameters and expects a JSON body back.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport for `base_url` with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use an existing client, e.g. one with custom TLS roots.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl Transport for HttpTransport {
    fn build_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn request(&self, url: &str, params: &Params) -> Result<serde_json::Value, TransportError> {
        tracing::debug!("POST {url} ({} params)", params.len());
        let response = self.client.post(url).form(params).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}
