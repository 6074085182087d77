//! Wire format shared between the appman client and the application server.
//!
//! Two layers live here: the outer response envelopes returned by each
//! endpoint, and the manifest payloads carried (encrypted) inside them.

pub mod manifest;
pub mod wire;

// Re-exports
pub use manifest::{Package, PackagesPayload, Summary};
pub use wire::{Envelope, TimestampResponse};

/// Relative path of the application summary endpoint.
pub const APPLICATION_PATH: &str = "api/application";

/// Relative path of the server timestamp endpoint.
pub const TIMESTAMP_PATH: &str = "api/timestamp";

/// Relative path of the package list endpoint.
pub const PACKAGES_PATH: &str = "api/packages";
