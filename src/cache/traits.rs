//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

/// Trait for entities that can be point-updated in the cache.
///
/// Implementors name their resource and give a unique id, which together
/// form the entity's detail key `[resource, "detail", id]`.
pub trait Cacheable: Clone + Send + Sync + 'static {
  /// Unique identifier for this entity (e.g., coupon id, post token)
  fn cache_id(&self) -> String;

  /// Resource name used as the first key element (e.g., "coupons")
  fn resource() -> &'static str;
}

/// Result from a cache-aware fetch, including data and where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched from the network
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Fresh network data.
  pub fn from_network(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at: Some(fetched_at),
    }
  }

  /// Data served from the cache without a network call.
  pub fn from_cache(data: T, fetched_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      fetched_at,
    }
  }

  /// Data obtained by joining a fetch another caller already started.
  pub fn joined(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Joined,
      fetched_at: Some(fetched_at),
    }
  }
}

/// Indicates where fetched data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Shared result of an in-flight request started by another caller
  Joined,
}
