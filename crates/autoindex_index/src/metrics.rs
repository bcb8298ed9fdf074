//! Query counters
//!
//! Plain atomics owned by each [`Index`](crate::Index); no global registry.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Index metrics - all fields are atomic for thread-safe access
#[derive(Debug, Default)]
pub struct IndexMetrics {
    pub queries: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub expired_records: AtomicU64,
    pub corrupt_records: AtomicU64,
    pub probes: AtomicU64,
    pub not_found: AtomicU64,
    pub store_rejections: AtomicU64,
}

impl IndexMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_queries(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_expired_records(&self) {
        self.expired_records.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_corrupt_records(&self) {
        self.corrupt_records.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_probes(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_store_rejections(&self) {
        self.store_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            expired_records: self.expired_records.load(Ordering::Relaxed),
            corrupt_records: self.corrupt_records.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            store_rejections: self.store_rejections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IndexMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub expired_records: u64,
    pub corrupt_records: u64,
    pub probes: u64,
    pub not_found: u64,
    pub store_rejections: u64,
}

impl MetricsSnapshot {
    /// Fraction of queries answered from cache (0.0 when idle).
    pub fn hit_ratio(&self) -> f64 {
        if self.queries == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.queries as f64
        }
    }
}
