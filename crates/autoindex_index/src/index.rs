//! Index - cache-first metadata queries
//!
//! Query flow:
//! 1. normalize the path (trailing `/` stripped) into the cache key
//! 2. serve a fresh cached record without touching the filesystem
//! 3. otherwise probe, encode, wrap with an expiry header and cache
//!
//! Absent paths are never cached. Corrupt or undecodable records count as a
//! miss. Nothing below returns an error to the caller: every failure ends up
//! as `None` plus a log line.

use crate::clock::{Clock, SystemClock};
use crate::metrics::IndexMetrics;
use crate::probe;
use crate::store::{CacheConfig, CacheError, CacheStore};
use autoindex_logging::SharedLogger;
use autoindex_protocol::{
    decode, defaults, encode, wrap_record, ExpiryHeader, Response, HEADER_SIZE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to create cache store: {0}")]
    Cache(#[from] CacheError),
}

/// Construction parameters, assembled once by the configuration layer.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Directory served as `/`
    pub root: PathBuf,
    /// How long a cached answer stays fresh
    pub ttl: Duration,
    /// Aggregate cache budget in bytes
    pub max_size: u64,
    /// Largest cacheable record in bytes
    pub max_entry_size: usize,
    pub shard_count: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(defaults::DEFAULT_ROOT),
            ttl: Duration::from_secs(defaults::DEFAULT_TTL_SECS),
            max_size: defaults::DEFAULT_MAX_SIZE_BYTES,
            max_entry_size: defaults::DEFAULT_MAX_ENTRY_SIZE_BYTES,
            shard_count: defaults::DEFAULT_SHARD_COUNT,
        }
    }
}

impl IndexConfig {
    /// Reject settings the cache store cannot be built with.
    pub fn validate(&self) -> Result<(), IndexError> {
        self.cache_config().validate()?;
        Ok(())
    }

    fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entry_size: self.max_entry_size,
            shard_count: self.shard_count,
            ..CacheConfig::new(self.ttl, self.max_size)
        }
    }
}

/// Cache key for a request path.
pub fn normalize(path: &str) -> &str {
    path.trim_end_matches('/')
}

pub struct Index {
    root: PathBuf,
    ttl: Duration,
    store: CacheStore,
    logger: SharedLogger,
    clock: Arc<dyn Clock>,
    metrics: IndexMetrics,
}

impl Index {
    pub fn new(config: IndexConfig, logger: SharedLogger) -> Result<Self, IndexError> {
        Self::with_clock(config, logger, Arc::new(SystemClock))
    }

    /// Like [`Index::new`] but with an explicit time source for record expiry.
    pub fn with_clock(
        config: IndexConfig,
        logger: SharedLogger,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, IndexError> {
        config.validate()?;
        let store = CacheStore::new(config.cache_config(), Arc::clone(&logger))?;
        logger.info(format_args!(
            "index ready: root {}, ttl {:?}, cache {} bytes",
            config.root.display(),
            config.ttl,
            config.max_size
        ));
        Ok(Self {
            root: config.root,
            ttl: config.ttl,
            store,
            logger,
            clock,
            metrics: IndexMetrics::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn metrics(&self) -> &IndexMetrics {
        &self.metrics
    }

    /// Decoded metadata for `path`, or `None` when it cannot be resolved.
    pub fn query(&self, path: &str) -> Option<Response> {
        let bytes = self.query_bytes(path)?;
        match decode(&bytes) {
            Ok(resp) => Some(resp),
            Err(e) => {
                self.logger
                    .error(format_args!("response unmarshal failed: {}", e));
                None
            }
        }
    }

    /// Wire-encoded metadata for `path`, or `None` when it cannot be resolved.
    pub fn query_bytes(&self, path: &str) -> Option<Vec<u8>> {
        let key = normalize(path);
        self.metrics.inc_queries();
        self.logger.debug(format_args!("query \"{}\"", key));

        if let Some(body) = self.query_cache(key) {
            return Some(body);
        }

        self.metrics.inc_probes();
        let Some(resp) = probe::probe(&self.root, key, self.logger.as_ref()) else {
            self.metrics.inc_not_found();
            self.logger
                .debug(format_args!("not found on filesystem: \"{}\"", key));
            return None;
        };

        let body = match encode(&resp) {
            Ok(body) => body,
            Err(e) => {
                self.logger.error(format_args!(
                    "error marshaling response for \"{}\": {}",
                    key, e
                ));
                return None;
            }
        };

        self.put_cache(key, &body);
        Some(body)
    }

    /// Fresh cached body for `key`, if any.
    fn query_cache(&self, key: &str) -> Option<Vec<u8>> {
        let Some(mut record) = self.store.get(key) else {
            self.metrics.inc_cache_misses();
            self.logger.debug(format_args!("cache miss for \"{}\"", key));
            return None;
        };

        let header = match ExpiryHeader::unpack(&record) {
            Ok(header) => header,
            Err(e) => {
                self.metrics.inc_corrupt_records();
                self.logger.error(format_args!(
                    "error extracting header for \"{}\": {}",
                    key, e
                ));
                return None;
            }
        };

        if header.is_expired(self.clock.now_unix()) {
            self.metrics.inc_expired_records();
            self.logger.debug(format_args!("cache expired for \"{}\"", key));
            return None;
        }

        self.metrics.inc_cache_hits();
        self.logger.debug(format_args!("cache hit for \"{}\"", key));
        record.drain(..HEADER_SIZE);
        Some(record)
    }

    fn put_cache(&self, key: &str, body: &[u8]) {
        let stored = wrap_record(body, self.ttl, self.clock.now_unix())
            .map_err(|e| e.to_string())
            .and_then(|record| self.store.set(key, record).map_err(|e| e.to_string()));
        if let Err(e) = stored {
            self.metrics.inc_store_rejections();
            self.logger.error(format_args!(
                "error saving response for \"{}\" to cache: {}",
                key, e
            ));
        }
    }

    /// Stop the cache cleaner and drop cached records.
    ///
    /// Queries still work afterwards but are no longer cached.
    pub fn close(&self) -> Result<(), IndexError> {
        self.logger.info(format_args!("closing index"));
        self.store.close()?;
        Ok(())
    }
}
