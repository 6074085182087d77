//! The manager: one application's cached manifest state.
//!
//! # Cache policy
//!
//! - One slot each for the summary, the package list and the timestamp. A new
//!   value replaces the old one outright.
//! - The cached summary is only replaced by a summary that is an upgrade of it.
//! - The package list is stored together with the summary it was fetched
//!   for, and is refetched only when a fresh summary is an upgrade of that one.
//! - Any fetch failure leaves the cache as it was and the accessor answers
//!   from it. Accessors never fail; `None` means nothing is known yet.
//!
//! All accessors take one lock for their whole duration, so at most one fetch
//! runs per manager. The packages flow reuses the summary flow through an
//! internal helper that works on the already locked cache.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use appman_schema::{Package, Summary};
use chrono::{DateTime, Utc};

use crate::config::ManagerConfig;
use crate::error::FetchError;
use crate::fetch;
use crate::region::{EnvRegion, FixedRegion, RegionSource};
use crate::transport::Transport;
use crate::upgrade;

/// Packages plus the summary they were fetched for.
#[derive(Debug, Clone)]
struct PackageCache {
    origin: Summary,
    packages: Vec<Package>,
}

#[derive(Debug, Default)]
struct Cache {
    summary: Option<Summary>,
    packages: Option<PackageCache>,
    timestamp: Option<DateTime<Utc>>,
}

/// Point-in-time copy of a manager's cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    /// Last accepted summary.
    pub summary: Option<Summary>,
    /// Last successfully fetched package list.
    pub packages: Option<Vec<Package>>,
    /// Version of the summary the cached packages belong to.
    pub packages_version: Option<String>,
    /// Last parsed server time.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Cached, best-effort access to one application's manifests.
pub struct Manager {
    app_id: String,
    config: ManagerConfig,
    transport: Arc<dyn Transport>,
    region: Arc<dyn RegionSource>,
    cache: Mutex<Cache>,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("app_id", &self.app_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Manager {
    /// Create a manager with an empty cache.
    ///
    /// The region comes from `config.region` if set, else from the locale.
    pub fn new(
        app_id: impl Into<String>,
        config: ManagerConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let region: Arc<dyn RegionSource> = match &config.region {
            Some(code) => Arc::new(FixedRegion(code.clone())),
            None => Arc::new(EnvRegion),
        };
        Self {
            app_id: app_id.into(),
            config,
            transport,
            region,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Create a manager talking HTTP to `config.server_url`.
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be constructed.
    #[cfg(feature = "network")]
    pub fn connect(
        app_id: impl Into<String>,
        config: ManagerConfig,
    ) -> Result<Self, crate::TransportError> {
        let transport = crate::HttpTransport::new(config.server_url.clone(), config.timeout())?;
        Ok(Self::new(app_id, config, Arc::new(transport)))
    }

    /// Replace the region lookup.
    pub fn with_region(mut self, region: Arc<dyn RegionSource>) -> Self {
        self.region = region;
        self
    }

    /// Application this manager fetches for.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Configuration fixed at construction.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Fetch the application summary, falling back to the cached one.
    ///
    /// A fresh summary with the cached version does not replace the cached
    /// one, so the returned summary may carry an older session secret.
    ///
    /// Blocks on the network; call it off latency-sensitive threads.
    pub fn summary(&self) -> Option<Summary> {
        let mut cache = self.lock();
        self.refresh_summary(&mut cache);
        cache.summary.clone()
    }

    /// Fetch the package list, falling back to the cached one.
    ///
    /// Always fetches a summary first. The packages endpoint is only contacted
    /// when there is no cached list or the summary is an upgrade of the one
    /// the cached list came from. Returns `None` when no summary could be
    /// obtained at all, even if packages are cached.
    ///
    /// Blocks on the network; call it off latency-sensitive threads.
    pub fn packages(&self) -> Option<Vec<Package>> {
        let mut cache = self.lock();

        let Some(summary) = self.refresh_summary(&mut cache) else {
            tracing::debug!("No summary for {}; no packages available", self.app_id);
            return None;
        };

        if let Some(cached) = &cache.packages
            && !upgrade::is_upgrade(Some(&cached.origin), Some(&summary), self.config.debug)
        {
            tracing::debug!(
                "Packages for {} @ {} are current",
                self.app_id,
                cached.origin.version()
            );
            return Some(cached.packages.clone());
        }

        let region = self.region.region();
        match fetch::fetch_packages(
            self.transport.as_ref(),
            &summary,
            &region,
            self.config.key_encoding,
        ) {
            Ok(packages) => {
                cache.packages = Some(PackageCache {
                    origin: summary,
                    packages: packages.clone(),
                });
                Some(packages)
            }
            Err(e) => {
                self.fell_back("packages", &e);
                cache.packages.as_ref().map(|c| c.packages.clone())
            }
        }
    }

    /// The server timestamp. Only contacts the server while none is cached.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let mut cache = self.lock();
        if cache.timestamp.is_none() {
            self.refresh_timestamp_locked(&mut cache);
        }
        cache.timestamp
    }

    /// Fetch the server timestamp even if one is cached.
    pub fn refresh_timestamp(&self) -> Option<DateTime<Utc>> {
        let mut cache = self.lock();
        self.refresh_timestamp_locked(&mut cache);
        cache.timestamp
    }

    /// Whether `candidate` is an upgrade of the cached summary.
    pub fn is_upgrade(&self, candidate: Option<&Summary>) -> bool {
        let cache = self.lock();
        upgrade::is_upgrade(cache.summary.as_ref(), candidate, self.config.debug)
    }

    /// Copy of the cache, without fetching anything.
    pub fn cached(&self) -> CacheSnapshot {
        let cache = self.lock();
        CacheSnapshot {
            summary: cache.summary.clone(),
            packages: cache.packages.as_ref().map(|c| c.packages.clone()),
            packages_version: cache
                .packages
                .as_ref()
                .map(|c| c.origin.version().to_string()),
            timestamp: cache.timestamp,
        }
    }

    /// Run the summary flow on a locked cache.
    ///
    /// Returns the freshly fetched summary, or the cached one if the fetch
    /// failed. The fresh summary is returned even when it did not replace the
    /// cached one, so callers always see the current session secret.
    fn refresh_summary(&self, cache: &mut Cache) -> Option<Summary> {
        let fetched = fetch::fetch_summary(
            self.transport.as_ref(),
            &self.app_id,
            self.config.passphrase.expose(),
            self.config.key_encoding,
        );
        match fetched {
            Ok(fresh) => {
                if upgrade::is_upgrade(cache.summary.as_ref(), Some(&fresh), self.config.debug) {
                    tracing::debug!("Caching summary {} @ {}", fresh.id(), fresh.version());
                    cache.summary = Some(fresh.clone());
                }
                Some(fresh)
            }
            Err(e) => {
                self.fell_back("summary", &e);
                cache.summary.clone()
            }
        }
    }

    fn refresh_timestamp_locked(&self, cache: &mut Cache) {
        match fetch::fetch_timestamp(self.transport.as_ref(), &self.config.timestamp_format) {
            Ok(ts) => cache.timestamp = Some(ts),
            Err(e) => self.fell_back("timestamp", &e),
        }
    }

    fn fell_back(&self, what: &str, err: &FetchError) {
        if err.is_rejection() {
            tracing::info!("{err}; using cached {what} for {}", self.app_id);
        } else {
            tracing::warn!("Failed to fetch {what} for {}: {err}", self.app_id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        // A panic mid-flow cannot leave a half-written slot, so the data is usable.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
