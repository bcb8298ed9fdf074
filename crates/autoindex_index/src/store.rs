//! Sharded in-memory byte store
//!
//! Keys hash onto a fixed, power-of-two number of shards. Each shard owns an
//! equal slice of the byte budget and has its own lock, so writers on
//! different shards never wait on each other.
//!
//! Eviction is per shard and approximate:
//! - a write that would overflow its shard evicts that shard's
//!   least-recently-written entries first
//! - a dedicated cleaner thread drops entries older than the TTL window every
//!   `clean_interval`
//!
//! The store knows nothing about record freshness beyond the write time; the
//! index keeps its own expiry inside the payload.

use autoindex_logging::SharedLogger;
use autoindex_protocol::defaults;
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::collections::{HashMap, VecDeque};
use std::hash::BuildHasher;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    #[error("Entry too large: {size} bytes exceeds limit of {max}")]
    EntryTooLarge { size: usize, max: usize },

    #[error("Cache store is closed")]
    Closed,

    #[error("Failed to start cache cleaner: {0}")]
    Spawn(#[from] io::Error),

    #[error("Cache cleaner thread panicked")]
    CleanerPanicked,
}

/// Cache store configuration (plain data)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Life window of an entry, measured from its last write
    pub ttl: Duration,
    /// How often the cleaner sweeps all shards
    pub clean_interval: Duration,
    /// Aggregate byte budget, split evenly across shards
    pub max_size: u64,
    /// Largest accepted payload
    pub max_entry_size: usize,
    /// Number of shards; must be a power of two
    pub shard_count: usize,
}

impl CacheConfig {
    /// Config with default entry size and shard count; the cleaner runs once
    /// per `ttl`.
    pub fn new(ttl: Duration, max_size: u64) -> Self {
        Self {
            ttl,
            clean_interval: ttl,
            max_size,
            max_entry_size: defaults::DEFAULT_MAX_ENTRY_SIZE_BYTES,
            shard_count: defaults::DEFAULT_SHARD_COUNT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 || !self.shard_count.is_power_of_two() {
            return Err(CacheError::InvalidConfig(format!(
                "shard count must be a power of two, got {}",
                self.shard_count
            )));
        }
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig("ttl must be non-zero".to_string()));
        }
        if self.clean_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "clean interval must be non-zero".to_string(),
            ));
        }
        if self.max_entry_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max entry size must be non-zero".to_string(),
            ));
        }
        if self.max_size < self.shard_count as u64 {
            return Err(CacheError::InvalidConfig(format!(
                "max size {} is smaller than shard count {}",
                self.max_size, self.shard_count
            )));
        }
        Ok(())
    }

    fn shard_capacity(&self) -> usize {
        usize::try_from(self.max_size / self.shard_count as u64).unwrap_or(usize::MAX)
    }
}

struct Slot {
    data: Vec<u8>,
    written_at: Instant,
    seq: u64,
}

/// One independently locked partition.
///
/// `order` lists writes oldest first. Overwritten keys leave stale
/// `(key, seq)` pairs behind; they are skipped when popped.
#[derive(Default)]
struct Shard {
    entries: HashMap<String, Slot>,
    order: VecDeque<(String, u64)>,
    bytes: usize,
    next_seq: u64,
}

fn charge(key: &str, data: &[u8]) -> usize {
    key.len() + data.len()
}

impl Shard {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).map(|slot| slot.data.clone())
    }

    /// Returns how many other entries were evicted to make room.
    fn insert(&mut self, key: &str, data: Vec<u8>, now: Instant, capacity: usize) -> usize {
        if let Some(old) = self.entries.remove(key) {
            self.bytes -= charge(key, &old.data);
        }

        let cost = charge(key, &data);
        let mut evicted = 0;
        while self.bytes + cost > capacity && self.evict_oldest() {
            evicted += 1;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.bytes += cost;
        self.order.push_back((key.to_string(), seq));
        self.entries.insert(
            key.to_string(),
            Slot {
                data,
                written_at: now,
                seq,
            },
        );
        self.compact_order();
        evicted
    }

    fn evict_oldest(&mut self) -> bool {
        while let Some((key, seq)) = self.order.pop_front() {
            if self.entries.get(&key).is_some_and(|slot| slot.seq == seq) {
                if let Some(slot) = self.entries.remove(&key) {
                    self.bytes -= charge(&key, &slot.data);
                }
                return true;
            }
        }
        false
    }

    /// Drop every entry written at or before `deadline`.
    fn purge_written_before(&mut self, deadline: Instant) -> usize {
        let mut purged = 0;
        while let Some((key, seq)) = self.order.front() {
            let live_write = self
                .entries
                .get(key)
                .filter(|slot| slot.seq == *seq)
                .map(|slot| slot.written_at);
            if let Some(written_at) = live_write {
                if written_at > deadline {
                    break;
                }
                if let Some(slot) = self.entries.remove(key) {
                    self.bytes -= charge(key, &slot.data);
                }
                purged += 1;
            }
            self.order.pop_front();
        }
        purged
    }

    fn compact_order(&mut self) {
        if self.order.len() <= 2 * self.entries.len() + 16 {
            return;
        }
        let entries = &self.entries;
        self.order
            .retain(|(key, seq)| entries.get(key).is_some_and(|slot| slot.seq == *seq));
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.bytes = 0;
    }
}

struct Inner {
    shards: Vec<Mutex<Shard>>,
    hasher: RandomState,
    shard_mask: usize,
    shard_capacity: usize,
    max_entry_size: usize,
    ttl: Duration,
    closed: AtomicBool,
    logger: SharedLogger,
}

impl Inner {
    fn shard(&self, key: &str) -> &Mutex<Shard> {
        let hash = self.hasher.hash_one(key) as usize;
        &self.shards[hash & self.shard_mask]
    }

    fn purge_expired(&self) -> usize {
        let Some(deadline) = Instant::now().checked_sub(self.ttl) else {
            return 0;
        };
        self.shards
            .iter()
            .map(|shard| shard.lock().purge_written_before(deadline))
            .sum()
    }
}

/// Handle to the background cleaner.
struct Cleaner {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Concurrent, sharded, size- and time-bounded byte store.
pub struct CacheStore {
    inner: Arc<Inner>,
    cleaner: Mutex<Option<Cleaner>>,
}

impl CacheStore {
    /// Validate `config`, allocate shards and start the cleaner thread.
    pub fn new(config: CacheConfig, logger: SharedLogger) -> Result<Self> {
        config.validate()?;

        let shards = (0..config.shard_count)
            .map(|_| Mutex::new(Shard::default()))
            .collect();
        let inner = Arc::new(Inner {
            shards,
            hasher: RandomState::new(),
            shard_mask: config.shard_count - 1,
            shard_capacity: config.shard_capacity(),
            max_entry_size: config.max_entry_size,
            ttl: config.ttl,
            closed: AtomicBool::new(false),
            logger,
        });

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let worker = Arc::clone(&inner);
        let interval = config.clean_interval;
        let handle = thread::Builder::new()
            .name("autoindex-cache-cleaner".to_string())
            .spawn(move || run_cleaner(worker, stop_rx, interval))?;

        inner.logger.debug(format_args!(
            "cache store started: {} shards, {} bytes per shard, ttl {:?}",
            config.shard_count, inner.shard_capacity, config.ttl
        ));

        Ok(Self {
            inner,
            cleaner: Mutex::new(Some(Cleaner { stop_tx, handle })),
        })
    }

    /// Copy of the payload stored under `key`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        if self.is_closed() {
            return None;
        }
        self.inner.shard(key).lock().get(key)
    }

    /// Store `data` under `key`, replacing any previous payload.
    pub fn set(&self, key: &str, data: Vec<u8>) -> Result<()> {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }
        if data.len() > self.inner.max_entry_size {
            return Err(CacheError::EntryTooLarge {
                size: data.len(),
                max: self.inner.max_entry_size,
            });
        }
        let cost = charge(key, &data);
        if cost > self.inner.shard_capacity {
            return Err(CacheError::EntryTooLarge {
                size: cost,
                max: self.inner.shard_capacity,
            });
        }

        let evicted = {
            let mut shard = self.inner.shard(key).lock();
            // close() may have cleared this shard since the check above
            if self.is_closed() {
                return Err(CacheError::Closed);
            }
            shard.insert(key, data, Instant::now(), self.inner.shard_capacity)
        };
        if evicted > 0 {
            self.inner.logger.debug(format_args!(
                "evicted {} entries to store \"{}\"",
                evicted, key
            ));
        }
        Ok(())
    }

    /// Run one cleanup pass now. Returns the number of entries dropped.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    pub fn len(&self) -> usize {
        self.inner
            .shards
            .iter()
            .map(|shard| shard.lock().entries.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes charged against the budget (keys plus payloads).
    pub fn size_bytes(&self) -> usize {
        self.inner.shards.iter().map(|shard| shard.lock().bytes).sum()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Stop and join the cleaner, then release all payloads.
    ///
    /// Safe to call more than once and from several threads; only the first
    /// call does the work.
    pub fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);

        let Some(cleaner) = self.cleaner.lock().take() else {
            return Ok(());
        };
        let _ = cleaner.stop_tx.send(());
        let joined = cleaner.handle.join();

        for shard in &self.inner.shards {
            shard.lock().clear();
        }

        match joined {
            Ok(()) => {
                self.inner.logger.debug(format_args!("cache store closed"));
                Ok(())
            }
            Err(_) => Err(CacheError::CleanerPanicked),
        }
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn run_cleaner(inner: Arc<Inner>, stop_rx: mpsc::Receiver<()>, interval: Duration) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let purged = inner.purge_expired();
                if purged > 0 {
                    inner
                        .logger
                        .debug(format_args!("cache cleaner purged {} entries", purged));
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoindex_logging::DiscardLogger;

    fn logger() -> SharedLogger {
        Arc::new(DiscardLogger)
    }

    fn small_config(shards: usize, max_size: u64) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(60),
            clean_interval: Duration::from_secs(60),
            max_size,
            max_entry_size: 1024,
            shard_count: shards,
        }
    }

    #[test]
    fn test_get_set_overwrite() {
        let store = CacheStore::new(small_config(4, 4096), logger()).unwrap();
        assert_eq!(store.get("/a"), None);

        store.set("/a", b"one".to_vec()).unwrap();
        assert_eq!(store.get("/a").unwrap(), b"one");

        store.set("/a", b"three".to_vec()).unwrap();
        assert_eq!(store.get("/a").unwrap(), b"three");
        assert_eq!(store.len(), 1);
        assert_eq!(store.size_bytes(), "/a".len() + 5);
    }

    #[test]
    fn test_rejects_oversized_entry() {
        let store = CacheStore::new(small_config(1, 4096), logger()).unwrap();
        store.set("/keep", vec![1; 10]).unwrap();

        let result = store.set("/big", vec![0; 1025]);
        assert!(matches!(
            result,
            Err(CacheError::EntryTooLarge { size: 1025, max: 1024 })
        ));
        assert_eq!(store.get("/big"), None);
        assert!(store.get("/keep").is_some());
    }

    #[test]
    fn test_rejects_entry_larger_than_shard() {
        let mut config = small_config(2, 200);
        config.max_entry_size = 1000;
        let store = CacheStore::new(config, logger()).unwrap();

        let result = store.set("/k", vec![0; 150]);
        assert!(matches!(result, Err(CacheError::EntryTooLarge { max: 100, .. })));
    }

    #[test]
    fn test_evicts_least_recently_written_in_shard() {
        // 1 shard, room for three 32-byte charges
        let store = CacheStore::new(small_config(1, 100), logger()).unwrap();
        store.set("/a", vec![1; 30]).unwrap();
        store.set("/b", vec![2; 30]).unwrap();
        store.set("/c", vec![3; 30]).unwrap();

        // Rewriting /a makes /b the oldest write
        store.set("/a", vec![4; 30]).unwrap();
        store.set("/d", vec![5; 30]).unwrap();

        assert_eq!(store.get("/b"), None);
        assert_eq!(store.get("/a").unwrap(), vec![4; 30]);
        assert!(store.get("/c").is_some());
        assert!(store.get("/d").is_some());
        assert!(store.size_bytes() <= 100);
    }

    #[test]
    fn test_purge_expired() {
        let mut config = small_config(8, 8192);
        config.ttl = Duration::from_millis(50);
        let store = CacheStore::new(config, logger()).unwrap();

        store.set("/old", b"x".to_vec()).unwrap();
        thread::sleep(Duration::from_millis(80));
        store.set("/new", b"y".to_vec()).unwrap();

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.get("/old"), None);
        assert!(store.get("/new").is_some());
    }

    #[test]
    fn test_background_cleaner_runs() {
        let mut config = small_config(8, 8192);
        config.ttl = Duration::from_millis(20);
        config.clean_interval = Duration::from_millis(10);
        let store = CacheStore::new(config, logger()).unwrap();

        for i in 0..20 {
            store.set(&format!("/f{}", i), vec![0; 8]).unwrap();
        }
        thread::sleep(Duration::from_millis(300));
        assert!(store.is_empty());
        assert_eq!(store.size_bytes(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = CacheStore::new(small_config(4, 4096), logger()).unwrap();
        store.set("/a", b"1".to_vec()).unwrap();

        store.close().unwrap();
        store.close().unwrap();

        assert!(store.is_closed());
        assert_eq!(store.get("/a"), None);
        assert!(matches!(store.set("/a", b"2".to_vec()), Err(CacheError::Closed)));
    }

    #[test]
    fn test_invalid_configs() {
        let cases = [
            CacheConfig {
                shard_count: 0,
                ..small_config(1, 4096)
            },
            CacheConfig {
                shard_count: 3,
                ..small_config(1, 4096)
            },
            CacheConfig {
                ttl: Duration::ZERO,
                ..small_config(1, 4096)
            },
            CacheConfig {
                max_entry_size: 0,
                ..small_config(1, 4096)
            },
            small_config(16, 8),
        ];
        for config in cases {
            let result = CacheStore::new(config.clone(), logger());
            assert!(
                matches!(result, Err(CacheError::InvalidConfig(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_concurrent_access() {
        let store = CacheStore::new(small_config(16, 1 << 20), logger()).unwrap();

        thread::scope(|scope| {
            for t in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..500 {
                        let key = format!("/t{}/{}", t, i % 50);
                        store.set(&key, format!("{}-{}", t, i).into_bytes()).unwrap();
                        let got = store.get(&key).unwrap();
                        assert!(got.starts_with(format!("{}-", t).as_bytes()));
                    }
                });
            }
        });

        assert_eq!(store.len(), 8 * 50);
    }

    #[test]
    fn test_close_while_writing() {
        let store = CacheStore::new(small_config(16, 1 << 20), logger()).unwrap();

        thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..2000 {
                        let key = format!("/w{}/{}", t, i);
                        match store.set(&key, vec![0; 16]) {
                            Ok(()) | Err(CacheError::Closed) => {}
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                        let _ = store.get(&key);
                    }
                });
            }
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(5));
                store.close().unwrap();
            });
        });

        assert!(store.is_closed());
        assert!(matches!(store.set("/late", vec![1]), Err(CacheError::Closed)));
    }

    #[test]
    fn test_nothing_resident_after_close() {
        for _ in 0..20 {
            let store = CacheStore::new(small_config(4, 1 << 20), logger()).unwrap();

            thread::scope(|scope| {
                for t in 0..4 {
                    let store = &store;
                    scope.spawn(move || {
                        for i in 0..1000 {
                            if store.set(&format!("/r{}/{}", t, i), vec![7; 32]).is_err() {
                                break;
                            }
                        }
                    });
                }
                scope.spawn(|| {
                    thread::sleep(Duration::from_millis(1));
                    store.close().unwrap();
                });
            });

            assert_eq!(store.len(), 0);
            assert_eq!(store.size_bytes(), 0);
        }
    }
}
