//! One round trip per manifest kind.
//!
//! These functions never touch a cache. They either produce a fresh value or
//! say why they could not; the [`Manager`](crate::Manager) decides what to do
//! with a failure.

use appman_schema::wire::{PARAM_APPLICATION, PARAM_ID, PARAM_NAME, PARAM_REGION};
use appman_schema::{
    APPLICATION_PATH, Envelope, PACKAGES_PATH, Package, PackagesPayload, Summary, TIMESTAMP_PATH,
    TimestampResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;

use crate::crypto::{self, KeyEncoding};
use crate::error::FetchError;
use crate::transport::{Params, Transport};

/// Request and decrypt the application summary.
///
/// The key is derived from the shared `passphrase` and the response nonce.
///
/// # Errors
///
/// [`FetchError::Protocol`] if the server declines, otherwise any transport,
/// key derivation, decryption, encoding or parse failure.
pub fn fetch_summary(
    transport: &dyn Transport,
    app_id: &str,
    passphrase: &str,
    encoding: KeyEncoding,
) -> Result<Summary, FetchError> {
    let mut params = Params::new();
    params.insert(PARAM_ID.to_string(), app_id.to_string());

    let summary: Summary =
        fetch_sealed(transport, APPLICATION_PATH, &params, passphrase, encoding)?;
    tracing::debug!("Fetched summary {} @ {}", summary.id(), summary.version());
    Ok(summary)
}

/// Request and decrypt the package list belonging to `summary`.
///
/// The key is derived from the summary's session secret. The list is parsed
/// as a whole: one malformed entry fails the entire fetch.
///
/// # Errors
///
/// Same as [`fetch_summary`].
pub fn fetch_packages(
    transport: &dyn Transport,
    summary: &Summary,
    region: &str,
    encoding: KeyEncoding,
) -> Result<Vec<Package>, FetchError> {
    let mut params = Params::new();
    params.insert(PARAM_NAME.to_string(), summary.name().to_string());
    params.insert(PARAM_APPLICATION.to_string(), summary.id().to_string());
    params.insert(PARAM_REGION.to_string(), region.to_string());

    let payload: PackagesPayload =
        fetch_sealed(transport, PACKAGES_PATH, &params, summary.secret(), encoding)?;
    tracing::debug!(
        "Fetched {} packages for {} @ {}",
        payload.packages.len(),
        summary.id(),
        summary.version()
    );
    Ok(payload.packages)
}

/// Request the server time. The response is not encrypted.
///
/// # Errors
///
/// Any transport failure, or [`FetchError::Parse`] if `result` is missing or
/// does not match `format`.
pub fn fetch_timestamp(
    transport: &dyn Transport,
    format: &str,
) -> Result<DateTime<Utc>, FetchError> {
    let url = transport.build_url(TIMESTAMP_PATH);
    let json = transport.request(&url, &Params::new())?;
    let response: TimestampResponse = decode(json, "timestamp response")?;
    parse_timestamp(&response.result, format)
}

/// Parse a server timestamp in `format`, as UTC.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if `s` does not match `format`.
pub fn parse_timestamp(s: &str, format: &str) -> Result<DateTime<Utc>, FetchError> {
    NaiveDateTime::parse_from_str(s.trim(), format)
        .map(|naive| naive.and_utc())
        .map_err(|e| FetchError::parse("timestamp", format!("'{s}': {e}")))
}

fn fetch_sealed<T: DeserializeOwned>(
    transport: &dyn Transport,
    path: &'static str,
    params: &Params,
    secret: &str,
    encoding: KeyEncoding,
) -> Result<T, FetchError> {
    let url = transport.build_url(path);
    let json = transport.request(&url, params)?;
    let envelope: Envelope = decode(json, "response envelope")?;

    if !envelope.success {
        return Err(FetchError::Protocol { endpoint: path });
    }
    let nonce = envelope
        .hash
        .ok_or_else(|| FetchError::parse("response envelope", "missing field `hash`"))?;
    let ciphertext = envelope
        .result
        .ok_or_else(|| FetchError::parse("response envelope", "missing field `result`"))?;

    let key = crypto::derive_key(&nonce, secret, encoding)?;
    crypto::open(&ciphertext, &nonce, &key)
}

fn decode<T: DeserializeOwned>(json: serde_json::Value, ctx: &'static str) -> Result<T, FetchError> {
    serde_json::from_value(json).map_err(|e| FetchError::parse(ctx, e))
}
