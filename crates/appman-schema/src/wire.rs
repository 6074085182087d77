//! Response envelopes as they appear on the wire.

use serde::{Deserialize, Serialize};

/// Request parameter carrying the application identifier on the summary endpoint.
pub const PARAM_ID: &str = "id";

/// Request parameter carrying the application identifier on the packages endpoint.
pub const PARAM_APPLICATION: &str = "application";

/// Request parameter carrying the application name on the packages endpoint.
pub const PARAM_NAME: &str = "name";

/// Request parameter carrying the client's country code on the packages endpoint.
pub const PARAM_REGION: &str = "region";

/// Outer response of the summary and packages endpoints.
///
/// The success flag is spelled `sucess` by the server. The misspelling is
/// part of the protocol and must not be corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the server accepted the request.
    #[serde(rename = "sucess")]
    pub success: bool,

    /// Per-response nonce, sent in the clear.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Base64 ciphertext of the manifest payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Envelope {
    /// Build an accepted envelope around a nonce and ciphertext.
    pub fn accepted(hash: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            success: true,
            hash: Some(hash.into()),
            result: Some(result.into()),
        }
    }

    /// Build a rejected envelope with no payload.
    pub fn rejected() -> Self {
        Self {
            success: false,
            hash: None,
            result: None,
        }
    }
}

/// Response of the timestamp endpoint. Not encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampResponse {
    /// Server time rendered in the server's fixed UTC format.
    pub result: String,
}
