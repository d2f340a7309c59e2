//! Client-side cache for API query results.
//!
//! This module provides a resource-agnostic caching mechanism that:
//! - Keys results by ordered tuples (resource name + filters)
//! - Serves fresh entries without a network call, stale ones while refetching
//! - Keeps at most one request in flight per key
//! - Notifies subscribers on point updates, invalidations and evictions

mod config;
mod key;
mod layer;
mod store;
mod traits;

pub use config::CacheConfig;
pub use key::{CacheKey, KeyPart, KeyPattern};
pub use layer::CacheLayer;
pub(crate) use store::StoreBatch;
pub use store::{AnyData, CacheEntry, CacheEvent, CacheStore, CacheSubscription, QueryStatus};
pub use traits::{CacheResult, CacheSource, Cacheable};
