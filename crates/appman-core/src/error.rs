//! Failure taxonomy of a single fetch.
//!
//! None of these escape the [`Manager`](crate::Manager): it logs them and
//! answers from its cache. They are public so the flow functions in
//! [`fetch`](crate::fetch) can be used and tested on their own.

use thiserror::Error;

use crate::transport::TransportError;

/// Why a single fetch produced no value.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not complete.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with `sucess: false`.
    #[error("Server rejected request to {endpoint}")]
    Protocol {
        /// Relative path of the endpoint.
        endpoint: &'static str,
    },

    /// The HMAC could not be computed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Bad Base64, IV length, block length or padding.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The plaintext is not UTF-8.
    #[error("Decrypted payload is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// A document did not have the expected shape.
    #[error("Failed to parse {context}: {message}")]
    Parse {
        /// Which document failed.
        context: &'static str,
        /// Parser message.
        message: String,
    },
}

impl FetchError {
    /// Create a parse error naming the document that failed.
    pub fn parse(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Parse {
            context: ctx,
            message: msg.to_string(),
        }
    }

    /// Whether the server answered but declined the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}
