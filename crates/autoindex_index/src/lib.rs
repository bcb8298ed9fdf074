//! Autoindex query core
//!
//! Answers "what is at this path?" for one directory tree, caching each
//! answer for a bounded time. See [`Index`] for the query flow and
//! [`CacheStore`] for the sharded cache underneath.

pub mod clock;
pub mod index;
pub mod metrics;
pub mod probe;
pub mod store;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use index::{normalize, Index, IndexConfig, IndexError};
pub use metrics::{IndexMetrics, MetricsSnapshot};
pub use store::{CacheConfig, CacheError, CacheStore};
