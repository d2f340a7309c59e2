//! Query and mutation bindings for every resource.
//!
//! A hook pairs a service call with its cache key, its staleness policy and,
//! for mutations, the cache effects applied when it succeeds:
//!
//! - lists live under `[resource, "list", ...filters]`
//! - single entities under `[resource, "detail", id]`
//! - create invalidates the list prefix
//! - update point-updates the detail key, then invalidates the list prefix
//! - remove evicts the detail key, then invalidates the list prefix

mod auth;
mod coupons;
mod divar;
mod notifications;
mod payments;
mod resource;

use std::future::Future;

use crate::cache::{CacheKey, CacheLayer};
use crate::error::ApiError;
use crate::mutation::MutationRunner;
use crate::query::Query;
use crate::session::SessionStore;

pub use auth::AuthHooks;
pub use divar::DivarHooks;
pub use payments::PaymentHooks;
pub use resource::ResourceHooks;

/// Shared handles every hook needs. Cheap to clone.
#[derive(Clone)]
pub struct HookContext {
  cache: CacheLayer,
  mutations: MutationRunner,
  session: SessionStore,
}

impl HookContext {
  pub fn new(cache: CacheLayer, mutations: MutationRunner, session: SessionStore) -> Self {
    Self {
      cache,
      mutations,
      session,
    }
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  pub fn mutations(&self) -> &MutationRunner {
    &self.mutations
  }

  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  /// Bind `fetcher` to `key` with the configured stale time.
  pub(crate) fn query<T, F, Fut>(&self, key: CacheKey, fetcher: F) -> Query<T>
  where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Query::new(self.cache.clone(), key, fetcher)
  }

  /// Translate `key` with the runner's translator.
  pub(crate) fn t(&self, key: &str, params: &[(&str, &str)]) -> String {
    self.mutations.i18n().translate(key, params)
  }
}
