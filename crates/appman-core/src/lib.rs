//! appman-core - authenticated application manifest retrieval.
//!
//! A [`Manager`] fetches an encrypted application summary and package list
//! from the application server, decrypts them with a key derived from a
//! server nonce and a shared secret, and keeps the last good values in memory.
//! Every accessor is best-effort: a failed fetch is logged and the cached
//! value (possibly none) is returned instead.
//!
//! # Flow
//!
//! ```text
//! Manager::packages()
//!   └─ summary flow   api/application  key = HMAC(passphrase, hash)
//!   └─ upgrade check  against the summary that produced cached packages
//!   └─ packages flow  api/packages     key = HMAC(summary.secret, hash)
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod region;
pub mod registry;
pub mod transport;
pub mod upgrade;

pub use appman_schema::{Package, Summary};
pub use config::{ManagerConfig, Passphrase};
pub use crypto::{KeyEncoding, SessionKey};
pub use error::FetchError;
pub use manager::{CacheSnapshot, Manager};
pub use region::{EnvRegion, FixedRegion, RegionSource};
pub use registry::ManagerRegistry;
#[cfg(feature = "network")]
pub use transport::http::HttpTransport;
pub use transport::{Params, Transport, TransportError};

/// User Agent string for requests to the application server
pub const USER_AGENT: &str = concat!("appman-core/", env!("CARGO_PKG_VERSION"));
