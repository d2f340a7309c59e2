//! Mutations and their cache effects.
//!
//! A mutation is a one-off request (create, update, delete, validate, ...).
//! When it succeeds, the runner applies its [`CacheEffects`]: point updates
//! first, then evictions, then invalidations. When it fails, nothing in the
//! cache changes and exactly one error notification is raised.
//!
//! Mutations on the same key are neither queued nor coalesced; whichever
//! response settles last is what the cache ends up holding.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{AnyData, CacheKey, CacheStore, Cacheable, KeyPattern, StoreBatch};
use crate::error::ApiError;
use crate::i18n::Translator;
use crate::notify::{Notifier, NotifyKind};

/// Cache changes to make after a successful mutation.
#[derive(Default)]
pub struct CacheEffects {
  batch: StoreBatch,
}

impl CacheEffects {
  pub fn new() -> Self {
    Self::default()
  }

  /// Overwrite `key` with `value`.
  pub fn set<T: Send + Sync + 'static>(mut self, key: CacheKey, value: T) -> Self {
    self.batch.updates.push((key, Arc::new(value) as AnyData));
    self
  }

  /// Overwrite the detail entry of `entity`.
  pub fn put_entity<E: Cacheable>(self, entity: &E) -> Self {
    let key = detail_key(E::resource(), &entity.cache_id());
    self.set(key, entity.clone())
  }

  /// Mark exactly `key` stale.
  pub fn invalidate(mut self, key: CacheKey) -> Self {
    self.batch.invalidations.push(KeyPattern::Exact(key));
    self
  }

  /// Mark every key starting with `prefix` stale.
  pub fn invalidate_prefix(mut self, prefix: CacheKey) -> Self {
    self.batch.invalidations.push(KeyPattern::Prefix(prefix));
    self
  }

  /// Drop every key matching `pattern`.
  pub fn evict(mut self, pattern: KeyPattern) -> Self {
    self.batch.evictions.push(pattern);
    self
  }

  pub fn is_empty(&self) -> bool {
    self.batch.updates.is_empty()
      && self.batch.evictions.is_empty()
      && self.batch.invalidations.is_empty()
  }
}

/// `[resource, "detail", id]`
pub fn detail_key(resource: &str, id: &str) -> CacheKey {
  CacheKey::new(resource).with("detail").with(id)
}

/// `[resource, "list"]`, the prefix of every list key of a resource.
pub fn list_prefix(resource: &str) -> CacheKey {
  CacheKey::new(resource).with("list")
}

/// Runs mutations and applies their notification and cache policy.
#[derive(Clone)]
pub struct MutationRunner {
  store: CacheStore,
  notifier: Arc<dyn Notifier>,
  i18n: Arc<Translator>,
}

impl MutationRunner {
  pub fn new(store: CacheStore, notifier: Arc<dyn Notifier>, i18n: Arc<Translator>) -> Self {
    Self {
      store,
      notifier,
      i18n,
    }
  }

  pub fn i18n(&self) -> &Translator {
    &self.i18n
  }

  /// Await `request`; on success apply `effects(&output)` and raise the
  /// optional success message, on failure raise one error notification.
  pub async fn run<O, Fut, E>(
    &self,
    label: &str,
    request: Fut,
    success_message: Option<String>,
    effects: E,
  ) -> Result<O, ApiError>
  where
    Fut: Future<Output = Result<O, ApiError>>,
    E: FnOnce(&O) -> CacheEffects,
  {
    match request.await {
      Ok(output) => {
        let effects = effects(&output);
        if !effects.is_empty() {
          self.store.apply(effects.batch);
        }
        info!(mutation = label, "mutation succeeded");
        if let Some(message) = success_message {
          self.notifier.notify(NotifyKind::Success, &message);
        }
        Ok(output)
      }
      Err(err) => {
        self.report_error(label, &err);
        Err(err)
      }
    }
  }

  /// Raise the error notification for a failed mutation.
  pub fn report_error(&self, label: &str, err: &ApiError) {
    warn!(mutation = label, error = %err, "mutation failed");
    self
      .notifier
      .notify(NotifyKind::Error, &err.user_message(&self.i18n));
  }

  pub fn notify_success(&self, message: &str) {
    self.notifier.notify(NotifyKind::Success, message);
  }

  pub fn notify_error(&self, message: &str) {
    self.notifier.notify(NotifyKind::Error, message);
  }
}
