//! Client-side query cache.
//!
//! This module keeps server state in memory for the lifetime of the client:
//! - Concurrent reads of one key share a single fetch
//! - Writes invalidate the keys they affect; the next read refetches
//! - Results of fetches superseded by an invalidation are never committed
//! - Failed refetches keep the last good value next to the error
//! - Idle, unobserved entries are evicted after a retention window

mod key;
mod state;
mod store;

pub use key::{KeySelector, ResourceKey};
pub use state::{CacheEntry, EntryStatus, QueryState};
pub use store::{CacheConfig, QueryCache, ReadOptions};
