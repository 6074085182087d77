//! One-time key derivation from a server nonce and a secret.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::FetchError;

/// Length of a derived AES-256 key in bytes.
pub const KEY_LEN: usize = 256 / 8;

/// How the HMAC digest is turned into key bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyEncoding {
    /// First 32 bytes of the raw digest.
    #[default]
    Raw,
    /// First 32 bytes of the Base64 text of the digest, as older clients did.
    Base64Text,
}

/// A derived 256-bit cipher key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Derive the key for one response: `HMAC-SHA256(key = secret, msg = nonce)`
/// truncated to [`KEY_LEN`] bytes.
///
/// The truncation is applied even though a SHA-256 digest is already
/// [`KEY_LEN`] bytes long; with [`KeyEncoding::Base64Text`] it is not a no-op.
///
/// # Errors
///
/// Returns [`FetchError::KeyDerivation`] if the MAC cannot be keyed or the
/// key material is shorter than [`KEY_LEN`].
pub fn derive_key(
    nonce: &str,
    secret: &str,
    encoding: KeyEncoding,
) -> Result<SessionKey, FetchError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| FetchError::KeyDerivation(e.to_string()))?;
    mac.update(nonce.as_bytes());
    let digest = mac.finalize().into_bytes();

    let material = match encoding {
        KeyEncoding::Raw => digest.to_vec(),
        KeyEncoding::Base64Text => STANDARD.encode(digest).into_bytes(),
    };
    truncate(&material)
}

fn truncate(material: &[u8]) -> Result<SessionKey, FetchError> {
    let head = material.get(..KEY_LEN).ok_or_else(|| {
        FetchError::KeyDerivation(format!(
            "key material is {} bytes, need {KEY_LEN}",
            material.len()
        ))
    })?;
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(head);
    Ok(SessionKey(key))
}
