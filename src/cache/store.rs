//! Shared keyed cache with publish/subscribe notification.
//!
//! Values are stored type-erased; readers name the type they expect and a
//! mismatch reads as "no data". Every write broadcasts a [`CacheEvent`] that
//! [`CacheSubscription`]s filter down to their own key.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::debug;

use super::config::CacheConfig;
use super::key::{CacheKey, KeyPattern};
use crate::error::ApiError;

/// Type-erased cached value.
pub type AnyData = Arc<dyn Any + Send + Sync>;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  Idle,
  Loading,
  Success,
  Error,
}

/// Typed snapshot of one cache slot.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  pub key: CacheKey,
  pub data: Option<T>,
  pub status: QueryStatus,
  pub error: Option<ApiError>,
  pub last_fetched_at: Option<DateTime<Utc>>,
  pub stale_after: Duration,
  /// Set by invalidation; cleared by the next successful write.
  pub invalidated: bool,
}

impl<T> CacheEntry<T> {
  /// Stale once invalidated, never fetched, or older than `stale_after`.
  pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
    match self.last_fetched_at {
      Some(at) => self.invalidated || now - at > self.stale_after,
      None => true,
    }
  }

  pub fn is_stale(&self) -> bool {
    self.is_stale_at(Utc::now())
  }

  /// Holds data that can be served without a network call.
  pub fn is_fresh(&self) -> bool {
    self.data.is_some() && !self.is_stale()
  }
}

/// Change notification broadcast by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
  /// New data or a new status was written for the key.
  Updated(CacheKey),
  /// The key was marked stale and should be refetched by its subscribers.
  Invalidated(CacheKey),
  /// The key was evicted.
  Removed(CacheKey),
  /// The whole store was torn down.
  Cleared,
}

impl CacheEvent {
  fn concerns(&self, key: &CacheKey) -> bool {
    match self {
      CacheEvent::Updated(k) | CacheEvent::Invalidated(k) | CacheEvent::Removed(k) => k == key,
      CacheEvent::Cleared => true,
    }
  }
}

struct Slot {
  data: Option<AnyData>,
  status: QueryStatus,
  error: Option<ApiError>,
  last_fetched_at: Option<DateTime<Utc>>,
  stale_after: Duration,
  invalidated: bool,
  /// Store generation the slot was created at. A clear or evict retires the
  /// slot; a later slot for the same key is born at a newer generation.
  born: u64,
  /// Generation of the last write or invalidation.
  generation: u64,
  /// Generation of the last write.
  written: u64,
}

impl Slot {
  fn new(stale_after: Duration, born: u64) -> Self {
    Self {
      data: None,
      status: QueryStatus::Idle,
      error: None,
      last_fetched_at: None,
      stale_after,
      invalidated: false,
      born,
      generation: born,
      written: born,
    }
  }

  fn write(&mut self, data: AnyData, at: DateTime<Utc>, generation: u64) {
    self.data = Some(data);
    self.status = QueryStatus::Success;
    self.error = None;
    self.last_fetched_at = Some(at);
    self.invalidated = false;
    self.generation = generation;
    self.written = generation;
  }
}

struct Entries {
  slots: HashMap<CacheKey, Slot>,
  /// Kept apart from the slots so evicting or clearing a key never loses
  /// track of who still watches it.
  subscribers: HashMap<CacheKey, usize>,
  generation: u64,
}

impl Entries {
  fn bump(&mut self) -> u64 {
    self.generation += 1;
    self.generation
  }

  fn slot(&mut self, key: &CacheKey, stale_after: Duration) -> &mut Slot {
    let born = self.generation + 1;
    match self.slots.entry(key.clone()) {
      Entry::Occupied(e) => e.into_mut(),
      Entry::Vacant(e) => {
        self.generation = born;
        e.insert(Slot::new(stale_after, born))
      }
    }
  }
}

/// Handed out when a fetch starts; the fetch writes its result back with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchTicket(u64);

/// How a fetch result landed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settled {
  /// Written as the fresh value.
  Fresh,
  /// The key was invalidated while the request ran; written but still stale.
  Stale,
  /// A newer value was written while the request ran and was kept.
  Superseded,
  /// The slot was evicted or cleared while the request ran; dropped.
  Discarded,
}

/// Point updates, evictions and invalidations applied as one unit.
///
/// Applied in that order, so a subscriber woken by an invalidation already
/// sees the point-updated values.
#[derive(Default)]
pub(crate) struct StoreBatch {
  pub updates: Vec<(CacheKey, AnyData)>,
  pub evictions: Vec<KeyPattern>,
  pub invalidations: Vec<KeyPattern>,
}

/// Shared cache store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CacheStore {
  entries: Arc<Mutex<Entries>>,
  events: broadcast::Sender<CacheEvent>,
  config: CacheConfig,
}

impl CacheStore {
  pub fn new(config: CacheConfig) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self {
      entries: Arc::new(Mutex::new(Entries {
        slots: HashMap::new(),
        subscribers: HashMap::new(),
        generation: 0,
      })),
      events,
      config,
    }
  }

  pub fn config(&self) -> &CacheConfig {
    &self.config
  }

  fn lock(&self) -> MutexGuard<'_, Entries> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn emit(&self, event: CacheEvent) {
    // No receivers is fine
    let _ = self.events.send(event);
  }

  /// Typed snapshot of `key`, if the store has a slot for it.
  pub fn get<T: Clone + 'static>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
    let entries = self.lock();
    let slot = entries.slots.get(key)?;
    Some(CacheEntry {
      key: key.clone(),
      data: slot
        .data
        .as_ref()
        .and_then(|d| d.downcast_ref::<T>())
        .cloned(),
      status: slot.status,
      error: slot.error.clone(),
      last_fetched_at: slot.last_fetched_at,
      stale_after: slot.stale_after,
      invalidated: slot.invalidated,
    })
  }

  /// Cached data for `key` only if it is still fresh.
  pub fn peek<T: Clone + 'static>(&self, key: &CacheKey) -> Option<T> {
    self
      .get::<T>(key)
      .filter(CacheEntry::is_fresh)
      .and_then(|e| e.data)
  }

  /// Overwrite `key` with `data`, marking it freshly fetched.
  ///
  /// A fetch for `key` still running keeps its response out of the store.
  pub fn set<T: Send + Sync + 'static>(&self, key: &CacheKey, data: T) {
    {
      let mut entries = self.lock();
      let generation = entries.bump();
      entries
        .slot(key, self.config.stale_time)
        .write(Arc::new(data), Utc::now(), generation);
    }
    self.emit(CacheEvent::Updated(key.clone()));
  }

  /// Mark `key` as being fetched and return the ticket its result must be
  /// written back with.
  pub(crate) fn mark_loading(&self, key: &CacheKey, stale_after: Duration) -> FetchTicket {
    let ticket = {
      let mut entries = self.lock();
      let slot = entries.slot(key, stale_after);
      slot.stale_after = stale_after;
      slot.status = QueryStatus::Loading;
      FetchTicket(slot.generation)
    };
    self.emit(CacheEvent::Updated(key.clone()));
    ticket
  }

  /// Whether a fetch started with `ticket` still writes to the live slot.
  pub(crate) fn is_live(&self, key: &CacheKey, ticket: FetchTicket) -> bool {
    self
      .lock()
      .slots
      .get(key)
      .is_some_and(|slot| slot.born <= ticket.0)
  }

  /// Write a fetch result back. Returns how it landed and the value readers
  /// of `key` should now see.
  pub(crate) fn settle(
    &self,
    key: &CacheKey,
    ticket: FetchTicket,
    data: AnyData,
    stale_after: Duration,
  ) -> (Settled, AnyData) {
    let (settled, current) = {
      let mut entries = self.lock();
      let generation = entries.bump();
      match entries.slots.get_mut(key) {
        Some(slot) if slot.born <= ticket.0 => {
          if slot.written > ticket.0 {
            if slot.status == QueryStatus::Loading {
              slot.status = if slot.data.is_some() {
                QueryStatus::Success
              } else {
                QueryStatus::Idle
              };
            }
            let current = slot.data.clone().unwrap_or(data);
            (Settled::Superseded, current)
          } else {
            let stale = slot.generation != ticket.0;
            slot.stale_after = stale_after;
            slot.write(Arc::clone(&data), Utc::now(), generation);
            slot.invalidated = stale;
            let settled = if stale { Settled::Stale } else { Settled::Fresh };
            (settled, data)
          }
        }
        _ => (Settled::Discarded, data),
      }
    };

    match settled {
      Settled::Fresh | Settled::Superseded => self.emit(CacheEvent::Updated(key.clone())),
      Settled::Stale => {
        debug!(%key, "invalidated while fetching, kept stale");
        self.emit(CacheEvent::Updated(key.clone()));
        self.emit(CacheEvent::Invalidated(key.clone()));
      }
      Settled::Discarded => debug!(%key, "fetch result dropped, entry was removed"),
    }
    (settled, current)
  }

  /// Record a failed fetch. Previously fetched data stays readable.
  pub(crate) fn settle_error(&self, key: &CacheKey, ticket: FetchTicket, error: ApiError) {
    let recorded = {
      let mut entries = self.lock();
      match entries.slots.get_mut(key) {
        Some(slot) if slot.born <= ticket.0 => {
          slot.status = QueryStatus::Error;
          slot.error = Some(error);
          true
        }
        _ => false,
      }
    };
    if recorded {
      self.emit(CacheEvent::Updated(key.clone()));
    }
  }

  /// Mark every matching key stale. Returns how many keys were touched.
  pub fn mark_stale(&self, pattern: &KeyPattern) -> usize {
    let touched = {
      let mut entries = self.lock();
      invalidate_locked(&mut entries, pattern)
    };
    debug!(?pattern, count = touched.len(), "cache keys marked stale");
    let count = touched.len();
    for key in touched {
      self.emit(CacheEvent::Invalidated(key));
    }
    count
  }

  /// Remove every matching key. Returns how many keys were removed.
  pub fn evict(&self, pattern: &KeyPattern) -> usize {
    let removed = {
      let mut entries = self.lock();
      evict_locked(&mut entries, pattern)
    };
    debug!(?pattern, count = removed.len(), "cache keys evicted");
    let count = removed.len();
    for key in removed {
      self.emit(CacheEvent::Removed(key));
    }
    count
  }

  /// Tear down the whole store. Fetches still running for the old entries
  /// settle into nothing.
  pub fn clear(&self) {
    self.lock().slots.clear();
    debug!("cache cleared");
    self.emit(CacheEvent::Cleared);
  }

  pub(crate) fn apply(&self, batch: StoreBatch) {
    let mut events = Vec::new();
    {
      let mut entries = self.lock();
      let now = Utc::now();
      for (key, data) in batch.updates {
        let generation = entries.bump();
        entries
          .slot(&key, self.config.stale_time)
          .write(data, now, generation);
        events.push(CacheEvent::Updated(key));
      }
      for pattern in &batch.evictions {
        events.extend(evict_locked(&mut entries, pattern).into_iter().map(CacheEvent::Removed));
      }
      for pattern in &batch.invalidations {
        events.extend(
          invalidate_locked(&mut entries, pattern)
            .into_iter()
            .map(CacheEvent::Invalidated),
        );
      }
    }
    for event in events {
      self.emit(event);
    }
  }

  /// Remove entries nobody subscribes to whose last fetch is older than
  /// `cache_time`. Loading entries are never swept.
  pub fn sweep(&self) -> usize {
    let now = Utc::now();
    let cache_time = self.config.cache_time;
    let mut entries = self.lock();
    let Entries {
      slots, subscribers, ..
    } = &mut *entries;
    let before = slots.len();
    slots.retain(|key, slot| {
      subscribers.get(key).is_some_and(|n| *n > 0)
        || slot.status == QueryStatus::Loading
        || slot
          .last_fetched_at
          .is_some_and(|at| now - at <= cache_time)
    });
    let swept = before - slots.len();
    if swept > 0 {
      debug!(swept, "swept expired cache entries");
    }
    swept
  }

  /// Subscribe to changes of `key`. Creates an idle slot if none exists.
  pub fn subscribe(&self, key: &CacheKey) -> CacheSubscription {
    let rx = self.events.subscribe();
    {
      let mut entries = self.lock();
      entries.slot(key, self.config.stale_time);
      *entries.subscribers.entry(key.clone()).or_insert(0) += 1;
    }
    CacheSubscription {
      key: key.clone(),
      rx,
      store: self.clone(),
    }
  }

  fn release(&self, key: &CacheKey) {
    let mut entries = self.lock();
    if let Some(count) = entries.subscribers.get_mut(key) {
      *count = count.saturating_sub(1);
      if *count == 0 {
        entries.subscribers.remove(key);
      }
    }
  }

  /// What a listener that missed events should assume happened to `key`.
  fn catch_up_event(&self, key: &CacheKey) -> CacheEvent {
    match self.lock().slots.get(key) {
      None => CacheEvent::Removed(key.clone()),
      Some(slot) if slot.invalidated => CacheEvent::Invalidated(key.clone()),
      Some(_) => CacheEvent::Updated(key.clone()),
    }
  }

  pub fn contains(&self, key: &CacheKey) -> bool {
    self.lock().slots.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.lock().slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Number of live subscriptions on `key`.
  pub fn subscriber_count(&self, key: &CacheKey) -> usize {
    self.lock().subscribers.get(key).copied().unwrap_or(0)
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new(CacheConfig::default())
  }
}

fn invalidate_locked(entries: &mut Entries, pattern: &KeyPattern) -> Vec<CacheKey> {
  let mut touched = Vec::new();
  let mut generation = entries.generation;
  for (key, slot) in entries.slots.iter_mut().filter(|(key, _)| pattern.matches(key)) {
    generation += 1;
    slot.invalidated = true;
    slot.generation = generation;
    touched.push(key.clone());
  }
  entries.generation = generation;
  touched
}

fn evict_locked(entries: &mut Entries, pattern: &KeyPattern) -> Vec<CacheKey> {
  let keys: Vec<CacheKey> = entries
    .slots
    .keys()
    .filter(|key| pattern.matches(key))
    .cloned()
    .collect();
  for key in &keys {
    entries.slots.remove(key);
  }
  keys
}

/// Listener on one cache key. Dropping it detaches the listener.
pub struct CacheSubscription {
  key: CacheKey,
  rx: broadcast::Receiver<CacheEvent>,
  store: CacheStore,
}

impl CacheSubscription {
  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  /// Next pending event for this key without waiting.
  ///
  /// If the listener fell behind and missed events, reports what the store
  /// now says about the key: removed, invalidated or updated.
  pub fn try_next(&mut self) -> Option<CacheEvent> {
    loop {
      match self.rx.try_recv() {
        Ok(event) if event.concerns(&self.key) => return Some(event),
        Ok(_) => continue,
        Err(broadcast::error::TryRecvError::Lagged(_)) => {
          return Some(self.store.catch_up_event(&self.key))
        }
        Err(_) => return None,
      }
    }
  }

  /// Wait for the next event for this key.
  pub async fn next(&mut self) -> Option<CacheEvent> {
    loop {
      match self.rx.recv().await {
        Ok(event) if event.concerns(&self.key) => return Some(event),
        Ok(_) => continue,
        Err(broadcast::error::RecvError::Lagged(_)) => {
          return Some(self.store.catch_up_event(&self.key))
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }
}

impl Drop for CacheSubscription {
  fn drop(&mut self) {
    self.store.release(&self.key);
  }
}
