//! Async query abstraction for data fetching with caching support.
//!
//! Inspired by TanStack Query, this module provides a `Query<T>` type that
//! binds a fetcher to a cache key and tracks loading states and errors.
//! Queries on the same key share one cache entry and one in-flight request.
//!
//! # Example
//!
//! ```ignore
//! let mut query = dashboard.coupons().list(ListFilters::page(1));
//!
//! // Start fetching (no-op while disabled or already loading)
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! let view = query.result();
//! if view.is_loading { /* spinner, view.data may still hold stale rows */ }
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;

use crate::cache::{CacheEvent, CacheKey, CacheLayer, CacheResult, CacheSubscription, QueryStatus};
use crate::error::ApiError;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started, or is disabled
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// What a consuming view renders: the latest known data (possibly stale),
/// whether a fetch is running, and the last error.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
  pub data: Option<T>,
  pub is_loading: bool,
  pub error: Option<ApiError>,
}

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Predicate re-checked on every fetch and poll
type GateFn = Arc<dyn Fn() -> bool + Send + Sync>;

type Outcome<T> = Result<CacheResult<T>, ApiError>;

/// Async query bound to one cache key.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/success/error states, with the last data kept across refetches
/// - An `enabled` gate, fixed or re-evaluated on every poll; a disabled query
///   stays Idle and never fetches
/// - A subscription to its cache key, so point updates and invalidations made
///   by mutations reach it on the next `poll()`
///
/// Dropping a query detaches it. A request it already started still runs to
/// completion and fills the shared cache.
pub struct Query<T> {
  state: QueryState<T>,
  data: Option<T>,
  layer: CacheLayer,
  key: CacheKey,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Outcome<T>>>,
  subscription: CacheSubscription,
  stale_time: Duration,
  enabled: bool,
  gate: Option<GateFn>,
  /// Gate value seen by the last poll
  gate_open: bool,
  /// The key was invalidated while our fetch ran
  refetch_on_settle: bool,
}

impl<T: Clone + Send + Sync + 'static> Query<T> {
  /// Create a new query for `key` with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It is only called when
  /// the cache has no fresh entry and no request for `key` is in flight.
  pub fn new<F, Fut>(layer: CacheLayer, key: CacheKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let subscription = layer.store().subscribe(&key);
    let stale_time = layer.stale_time();
    let mut query = Self {
      state: QueryState::Idle,
      data: None,
      layer,
      key,
      fetcher: Arc::new(move || fetcher().boxed()),
      receiver: None,
      subscription,
      stale_time,
      enabled: true,
      gate: None,
      gate_open: true,
      refetch_on_settle: false,
    };
    query.sync_from_store();
    query
  }

  /// Set the stale time for this query.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Gate the query. A disabled query stays Idle and never fetches.
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.set_enabled(enabled);
    self
  }

  /// Gate the query on a condition that can change over its lifetime.
  ///
  /// `poll` starts a fetch when the condition turns true and detaches the
  /// query, back to Idle with no data, when it turns false.
  pub fn enabled_when<P>(mut self, predicate: P) -> Self
  where
    P: Fn() -> bool + Send + Sync + 'static,
  {
    self.gate_open = predicate();
    self.gate = Some(Arc::new(predicate));
    if !self.gate_open {
      self.data = None;
      self.state = QueryState::Idle;
    }
    self
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
    if !enabled && !self.state.is_loading() {
      self.state = QueryState::Idle;
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled && self.gate.as_ref().map_or(true, |gate| gate())
  }

  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Latest known data, including stale data shown during a refetch.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  /// Check if the cached data for this key is stale.
  pub fn is_stale(&self) -> bool {
    self
      .layer
      .store()
      .get::<T>(&self.key)
      .map(|entry| entry.is_stale())
      .unwrap_or(true)
  }

  pub fn result(&self) -> QueryResult<T> {
    QueryResult {
      data: self.data.clone(),
      is_loading: self.state.is_loading(),
      error: self.state.error().cloned(),
    }
  }

  /// Start fetching data if not already loading.
  ///
  /// A fresh cache entry is adopted synchronously, without a network call.
  /// This is a no-op if the query is disabled or already loading.
  pub fn fetch(&mut self) {
    if !self.is_enabled() || self.state.is_loading() {
      return;
    }
    if let Some(data) = self.layer.store().peek::<T>(&self.key) {
      self.data = Some(data.clone());
      self.state = QueryState::Success(data);
      return;
    }
    self.start_fetch(false);
  }

  /// Force a refetch, even if fresh data exists.
  pub fn refetch(&mut self) {
    if !self.is_enabled() {
      return;
    }
    // Stop listening to the pending fetch; it still completes into the cache
    self.receiver = None;
    self.start_fetch(true);
  }

  /// Poll for results and cache changes.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.poll_gate();
    changed |= self.poll_receiver();
    while let Some(event) = self.subscription.try_next() {
      changed |= self.handle_event(event);
    }
    changed
  }

  fn poll_gate(&mut self) -> bool {
    let Some(gate) = &self.gate else {
      return false;
    };
    let open = gate();
    if open == self.gate_open {
      return false;
    }
    self.gate_open = open;
    if open {
      self.fetch();
    } else {
      self.receiver = None;
      self.refetch_on_settle = false;
      self.data = None;
      self.state = QueryState::Idle;
    }
    true
  }

  /// Wait for the pending fetch, if any, and return the resulting view.
  pub async fn settle(&mut self) -> QueryResult<T> {
    if let Some(rx) = &mut self.receiver {
      let outcome = rx.recv().await;
      self.receiver = None;
      self.apply_outcome(outcome);
      self.refetch_if_invalidated();
    }
    self.poll();
    self.result()
  }

  /// Fetch (if needed) and wait for the result.
  pub async fn load(&mut self) -> QueryResult<T> {
    self.fetch();
    self.settle().await
  }

  fn poll_receiver(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(outcome) => {
        self.receiver = None;
        self.apply_outcome(Some(outcome));
        self.refetch_if_invalidated();
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.receiver = None;
        self.apply_outcome(None);
        true
      }
    }
  }

  /// An invalidation that arrived mid-fetch gets exactly one refetch, unless
  /// the settled entry is already fresh.
  fn refetch_if_invalidated(&mut self) {
    if std::mem::take(&mut self.refetch_on_settle) && self.is_enabled() && self.is_stale() {
      self.start_fetch(false);
    }
  }

  fn apply_outcome(&mut self, outcome: Option<Outcome<T>>) {
    match outcome {
      Some(Ok(result)) => {
        self.data = Some(result.data.clone());
        self.state = QueryState::Success(result.data);
      }
      Some(Err(error)) => self.state = QueryState::Error(error),
      // Sender dropped without sending
      None => {
        self.state = QueryState::Error(ApiError::network("query was cancelled"));
      }
    }
  }

  fn handle_event(&mut self, event: CacheEvent) -> bool {
    match event {
      CacheEvent::Updated(_) => {
        // Our own fetch reports through the receiver
        if self.receiver.is_some() {
          return false;
        }
        self.sync_from_store()
      }
      CacheEvent::Invalidated(_) => {
        if !self.is_enabled() {
          return false;
        }
        if self.state.is_loading() {
          self.refetch_on_settle = true;
          return false;
        }
        self.start_fetch(false);
        true
      }
      CacheEvent::Removed(_) | CacheEvent::Cleared => {
        self.receiver = None;
        self.refetch_on_settle = false;
        self.data = None;
        self.state = QueryState::Idle;
        true
      }
    }
  }

  /// Adopt whatever the store holds for this key. Returns `true` on change.
  fn sync_from_store(&mut self) -> bool {
    let Some(entry) = self.layer.store().get::<T>(&self.key) else {
      return false;
    };
    match entry.status {
      QueryStatus::Success => match entry.data {
        Some(data) => {
          self.data = Some(data.clone());
          self.state = QueryState::Success(data);
          true
        }
        None => false,
      },
      QueryStatus::Error => {
        self.data = entry.data.or(self.data.take());
        self.state = QueryState::Error(entry.error.unwrap_or_else(|| ApiError::network("fetch failed")));
        true
      }
      QueryStatus::Loading | QueryStatus::Idle => {
        if entry.data.is_some() {
          self.data = entry.data;
          return true;
        }
        false
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self, force: bool) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let layer = self.layer.clone();
    let key = self.key.clone();
    let stale_time = self.stale_time;
    let fetcher = Arc::clone(&self.fetcher);
    tokio::spawn(async move {
      let request = move || fetcher();
      let result = if force {
        layer.refetch(&key, stale_time, request).await
      } else {
        layer.fetch(&key, stale_time, request).await
      };
      // Ignore send errors - the query may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the receiver and subscription are owned.
// Create another Query on the same key to share the cached data.

impl<T: std::fmt::Debug + Clone + Send + Sync + 'static> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("stale_time", &self.stale_time)
      .field("enabled", &self.is_enabled())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheStore, KeyPattern};
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration as StdDuration;

  fn counting_query(
    layer: &CacheLayer,
    key: CacheKey,
    counter: Arc<AtomicU32>,
  ) -> Query<Vec<u32>> {
    Query::new(layer.clone(), key, move || {
      let counter = counter.clone();
      async move {
        tokio::time::sleep(StdDuration::from_millis(5)).await;
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(vec![n])
      }
    })
  }

  #[tokio::test]
  async fn test_query_success() {
    let layer = CacheLayer::new(CacheStore::default());
    let mut query = Query::new(layer, CacheKey::new("plans"), || async {
      Ok::<_, ApiError>(vec![1, 2, 3])
    });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(StdDuration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let layer = CacheLayer::new(CacheStore::default());
    let mut query: Query<i32> = Query::new(layer, CacheKey::new("plans"), || async {
      Err(ApiError::network("Something went wrong"))
    });

    let result = query.load().await;
    assert!(query.is_error());
    assert_eq!(result.error, Some(ApiError::network("Something went wrong")));
    assert!(result.data.is_none());
  }

  #[tokio::test]
  async fn test_disabled_query_stays_idle() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&layer, CacheKey::new("me"), counter.clone()).enabled(false);

    query.fetch();
    assert!(matches!(query.state(), QueryState::Idle));
    tokio::time::sleep(StdDuration::from_millis(20)).await;
    assert!(!query.poll());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_fresh_cache_is_adopted_synchronously() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let key = CacheKey::new("plans").with("list");

    let mut first = counting_query(&layer, key.clone(), counter.clone());
    first.load().await;

    let mut second = counting_query(&layer, key, counter.clone());
    second.fetch();
    assert!(second.is_success());
    assert_eq!(second.data(), Some(&vec![1]));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_same_key_queries_share_request() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let key = CacheKey::new("plans").with("list");

    let mut a = counting_query(&layer, key.clone(), counter.clone());
    let mut b = counting_query(&layer, key, counter.clone());
    a.fetch();
    b.fetch();

    assert_eq!(a.settle().await.data, Some(vec![1]));
    assert_eq!(b.settle().await.data, Some(vec![1]));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidation_triggers_one_refetch_keeping_stale_data() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let key = CacheKey::new("plans").with("list");

    let mut query = counting_query(&layer, key, counter.clone());
    query.load().await;

    layer.invalidate(&KeyPattern::Prefix(CacheKey::new("plans")));
    assert!(query.poll());
    assert!(query.is_loading());
    assert_eq!(query.result().data, Some(vec![1]));

    assert_eq!(query.settle().await.data, Some(vec![2]));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_point_update_reaches_subscribed_query() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let key = CacheKey::new("plans").with("detail").with("p1");

    let mut query = counting_query(&layer, key.clone(), counter);
    query.load().await;

    layer.store().set(&key, vec![99u32]);
    assert!(query.poll());
    assert_eq!(query.data(), Some(&vec![99]));
  }

  #[tokio::test]
  async fn test_refetch_bypasses_fresh_cache() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&layer, CacheKey::new("plans"), counter.clone());

    query.load().await;
    query.refetch();
    assert_eq!(query.settle().await.data, Some(vec![2]));
  }

  #[tokio::test]
  async fn test_dropped_query_detaches_but_request_completes() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let key = CacheKey::new("plans").with("list");

    let mut query = counting_query(&layer, key.clone(), counter);
    query.fetch();
    drop(query);
    assert_eq!(layer.store().subscriber_count(&key), 0);

    tokio::time::sleep(StdDuration::from_millis(30)).await;
    assert_eq!(layer.store().peek::<Vec<u32>>(&key), Some(vec![1]));
  }

  #[tokio::test]
  async fn test_cleared_store_resets_query() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&layer, CacheKey::new("me"), counter);
    query.load().await;

    layer.store().clear();
    assert!(query.poll());
    assert!(matches!(query.state(), QueryState::Idle));
    assert!(query.data().is_none());
  }

  #[tokio::test]
  async fn test_invalidation_while_loading_refetches_once_after_settle() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let key = CacheKey::new("plans").with("list");

    let mut query = counting_query(&layer, key, counter.clone());
    query.fetch();
    tokio::time::sleep(StdDuration::from_millis(2)).await;

    layer.invalidate(&KeyPattern::Prefix(CacheKey::new("plans")));
    assert!(!query.poll());
    assert!(query.is_loading());

    tokio::time::sleep(StdDuration::from_millis(15)).await;
    assert!(query.poll());
    // The pre-invalidation response is shown while the refetch runs
    assert!(query.is_loading());
    assert_eq!(query.data(), Some(&vec![1]));

    assert_eq!(query.settle().await.data, Some(vec![2]));
    assert!(!query.is_stale());
    tokio::time::sleep(StdDuration::from_millis(15)).await;
    query.poll();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_gate_opens_and_closes_with_predicate() {
    let layer = CacheLayer::new(CacheStore::default());
    let counter = Arc::new(AtomicU32::new(0));
    let open = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let gate = open.clone();
    let mut query = counting_query(&layer, CacheKey::new("me"), counter.clone())
      .enabled_when(move || gate.load(Ordering::SeqCst));
    query.fetch();
    assert!(!query.is_enabled());
    assert!(!query.poll());

    open.store(true, Ordering::SeqCst);
    assert!(query.poll());
    assert_eq!(query.settle().await.data, Some(vec![1]));

    open.store(false, Ordering::SeqCst);
    assert!(query.poll());
    assert!(matches!(query.state(), QueryState::Idle));
    assert!(query.data().is_none());
    query.refetch();
    assert!(!query.is_loading());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }
}
