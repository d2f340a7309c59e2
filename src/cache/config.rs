use chrono::Duration;

/// Configuration for cache behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
  /// How long fetched data is considered fresh.
  ///
  /// Fresh data is served without a network call. Stale data stays readable
  /// while a refetch runs.
  pub stale_time: Duration,

  /// How long an unsubscribed entry is kept after its last fetch before
  /// [`sweep`](super::CacheStore::sweep) removes it.
  pub cache_time: Duration,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time: Duration::minutes(5),
      cache_time: Duration::minutes(30),
    }
  }
}

impl CacheConfig {
  pub const fn new(stale_time: Duration, cache_time: Duration) -> Self {
    Self {
      stale_time,
      cache_time,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config() {
    let config = CacheConfig::default();
    assert_eq!(config.stale_time, Duration::minutes(5));
    assert_eq!(config.cache_time, Duration::minutes(30));
  }
}
