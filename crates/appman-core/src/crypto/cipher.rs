//! AES-256-CBC / PKCS#7 over Base64, keyed per response.

use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;

use super::kdf::SessionKey;
use crate::error::FetchError;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// Required length of the nonce bytes used as IV.
pub const IV_LEN: usize = 16;

/// Decode and decrypt a Base64 ciphertext in one shot.
///
/// Whitespace in the Base64 text is ignored, since the server may wrap lines.
/// The nonce's UTF-8 bytes are the IV.
///
/// # Errors
///
/// Returns [`FetchError::Decryption`] on bad Base64, a nonce that is not
/// [`IV_LEN`] bytes, a ciphertext length that is not a whole number of
/// blocks, or invalid padding.
pub fn decrypt(ciphertext: &str, nonce: &str, key: &SessionKey) -> Result<Vec<u8>, FetchError> {
    let compact: String = ciphertext
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let raw = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| FetchError::Decryption(format!("invalid Base64 ciphertext: {e}")))?;

    let decryptor = Aes256CbcDec::new_from_slices(key.as_bytes(), iv(nonce)?)
        .map_err(|e| FetchError::Decryption(e.to_string()))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(&raw)
        .map_err(|_| FetchError::Decryption("bad padding or ciphertext length".to_string()))
}

/// Decrypt a manifest and parse it as JSON into `T`.
///
/// # Errors
///
/// [`FetchError::Decryption`] as for [`decrypt`], [`FetchError::Encoding`] if
/// the plaintext is not UTF-8, [`FetchError::Parse`] if it does not parse as
/// `T`.
pub fn open<T: DeserializeOwned>(
    ciphertext: &str,
    nonce: &str,
    key: &SessionKey,
) -> Result<T, FetchError> {
    let plaintext = decrypt(ciphertext, nonce, key)?;
    let text = String::from_utf8(plaintext)?;
    serde_json::from_str(&text).map_err(|e| FetchError::parse("manifest", e))
}

/// Encrypt `plaintext` the way the server does and return Base64 text.
///
/// # Errors
///
/// Returns [`FetchError::Decryption`] if the nonce is not [`IV_LEN`] bytes.
pub fn seal(plaintext: &[u8], nonce: &str, key: &SessionKey) -> Result<String, FetchError> {
    let encryptor = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv(nonce)?)
        .map_err(|e| FetchError::Decryption(e.to_string()))?;
    Ok(STANDARD.encode(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext)))
}

fn iv(nonce: &str) -> Result<&[u8], FetchError> {
    let bytes = nonce.as_bytes();
    if bytes.len() == IV_LEN {
        Ok(bytes)
    } else {
        Err(FetchError::Decryption(format!(
            "nonce must be {IV_LEN} bytes to serve as IV, got {}",
            bytes.len()
        )))
    }
}
