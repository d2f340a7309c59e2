//! Cache layer that orchestrates caching logic with network fetching.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use super::key::{CacheKey, KeyPattern};
use super::store::{AnyData, CacheStore, FetchTicket};
use super::traits::CacheResult;
use crate::error::ApiError;

type SharedFetch = Shared<BoxFuture<'static, Result<(AnyData, DateTime<Utc>), ApiError>>>;

struct InFlight {
  id: u64,
  ticket: FetchTicket,
  fetch: SharedFetch,
}

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the query/mutation hooks and the resource
/// services. It serves fresh entries without touching the network, keeps at
/// most one request in flight per key, and writes every settled fetch back to
/// the shared [`CacheStore`].
#[derive(Clone)]
pub struct CacheLayer {
  store: CacheStore,
  in_flight: Arc<Mutex<HashMap<CacheKey, InFlight>>>,
  next_id: Arc<AtomicU64>,
}

impl CacheLayer {
  pub fn new(store: CacheStore) -> Self {
    Self {
      store,
      in_flight: Arc::new(Mutex::new(HashMap::new())),
      next_id: Arc::new(AtomicU64::new(0)),
    }
  }

  pub fn store(&self) -> &CacheStore {
    &self.store
  }

  /// Default freshness window for queries that don't override it.
  pub fn stale_time(&self) -> Duration {
    self.store.config().stale_time
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Fresh entry - return it, no network call
  /// 2. Request already in flight for `key` - join it
  /// 3. Otherwise start a request; the stale value (if any) stays readable
  ///    until it settles
  pub async fn fetch<T, F, Fut>(
    &self,
    key: &CacheKey,
    stale_after: Duration,
    fetcher: F,
  ) -> Result<CacheResult<T>, ApiError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if let Some(entry) = self.store.get::<T>(key) {
      if !entry.is_stale() {
        if let Some(data) = entry.data {
          debug!(%key, "cache hit");
          return Ok(CacheResult::from_cache(data, entry.last_fetched_at));
        }
      }
    }
    self.fetch_from_network(key, stale_after, fetcher).await
  }

  /// Fetch ignoring freshness. Still joins a request already in flight.
  pub async fn refetch<T, F, Fut>(
    &self,
    key: &CacheKey,
    stale_after: Duration,
    fetcher: F,
  ) -> Result<CacheResult<T>, ApiError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    self.fetch_from_network(key, stale_after, fetcher).await
  }

  async fn fetch_from_network<T, F, Fut>(
    &self,
    key: &CacheKey,
    stale_after: Duration,
    fetcher: F,
  ) -> Result<CacheResult<T>, ApiError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let (fetch, joined) = {
      let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
      match in_flight.get(key) {
        // A request whose entry was evicted or cleared is not joined
        Some(existing) if self.store.is_live(key, existing.ticket) => (existing.fetch.clone(), true),
        _ => {
          let id = self.next_id.fetch_add(1, Ordering::Relaxed);
          let ticket = self.store.mark_loading(key, stale_after);
          let fetch = self.spawn_fetch(key.clone(), id, ticket, stale_after, fetcher());
          in_flight.insert(
            key.clone(),
            InFlight {
              id,
              ticket,
              fetch: fetch.clone(),
            },
          );
          (fetch, false)
        }
      }
    };

    if joined {
      debug!(%key, "joined in-flight fetch");
    } else {
      debug!(%key, "cache miss, fetching");
    }

    let (data, fetched_at) = fetch.await?;
    let data = data
      .downcast_ref::<T>()
      .cloned()
      .ok_or_else(|| ApiError::Decode(format!("cached value for {key} has a different type")))?;

    Ok(if joined {
      CacheResult::joined(data, fetched_at)
    } else {
      CacheResult::from_network(data, fetched_at)
    })
  }

  /// Run the request on its own task so it completes, and lands in the
  /// store, even if every caller stops waiting for it.
  ///
  /// The result is written back with `ticket`: an invalidation that landed
  /// meanwhile leaves it stale, a newer write wins over it, and a clear drops
  /// it.
  fn spawn_fetch<T, Fut>(
    &self,
    key: CacheKey,
    id: u64,
    ticket: FetchTicket,
    stale_after: Duration,
    request: Fut,
  ) -> SharedFetch
  where
    T: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let store = self.store.clone();
    let in_flight = Arc::clone(&self.in_flight);
    let handle = tokio::spawn(async move {
      let result = request.await;

      // Settle and retire under the in-flight lock, so nobody joins this
      // request after its result is in the store.
      let settled = {
        let mut in_flight = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let settled = match result {
          Ok(data) => {
            let (_, current) = store.settle(&key, ticket, Arc::new(data), stale_after);
            Ok((current, Utc::now()))
          }
          Err(err) => {
            warn!(%key, error = %err, "fetch failed");
            store.settle_error(&key, ticket, err.clone());
            Err(err)
          }
        };
        if in_flight.get(&key).is_some_and(|f| f.id == id) {
          in_flight.remove(&key);
        }
        settled
      };
      store.sweep();
      settled
    });

    async move {
      match handle.await {
        Ok(settled) => settled,
        Err(e) => Err(ApiError::network(format!("fetch task failed: {e}"))),
      }
    }
    .boxed()
    .shared()
  }

  /// Forget every running request and empty the store. Requests already
  /// sent still complete, but their results are dropped.
  pub fn reset(&self) {
    let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    in_flight.clear();
    self.store.clear();
  }

  /// Mark every key matching `pattern` stale.
  pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
    self.store.mark_stale(pattern)
  }

  /// Whether a request for `key` is currently running.
  pub fn is_fetching(&self, key: &CacheKey) -> bool {
    self
      .in_flight
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(key)
  }
}
