//! Key derivation and the manifest decryption pipeline.

mod cipher;
mod kdf;

pub use cipher::{IV_LEN, decrypt, open, seal};
pub use kdf::{KEY_LEN, KeyEncoding, SessionKey, derive_key};
