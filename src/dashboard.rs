//! Composition root: one cache store, one session, one transport, every hook.

use std::sync::Arc;

use color_eyre::Result;
use tracing::info;

use crate::api::{ApiClient, HttpTransport, Transport};
use crate::cache::{CacheConfig, CacheLayer, CacheStore};
use crate::config::Config;
use crate::hooks::{AuthHooks, DivarHooks, HookContext, PaymentHooks, ResourceHooks};
use crate::i18n::Translator;
use crate::mutation::MutationRunner;
use crate::notify::Notifier;
use crate::services::{
  AuthService, Coupons, CrudService, DivarService, Notifications, Packages, PaymentService, Plans,
  Products, Resource, Users,
};
use crate::session::{Session, SessionStore};

/// Everything a dashboard view needs, wired to shared stores.
///
/// Cheap to clone; clones share the cache and the session.
#[derive(Clone)]
pub struct Dashboard {
  ctx: HookContext,
  client: ApiClient,
}

impl Dashboard {
  pub fn new(
    transport: Arc<dyn Transport>,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    i18n: Arc<Translator>,
    cache: CacheConfig,
  ) -> Self {
    let store = CacheStore::new(cache);
    let mutations = MutationRunner::new(store.clone(), notifier, i18n);
    Self {
      ctx: HookContext::new(CacheLayer::new(store), mutations, session),
      client: ApiClient::new(transport),
    }
  }

  /// Wire a dashboard against the configured API. A token from the
  /// environment starts the session signed in.
  pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
    let session = match Config::get_api_token() {
      Some(token) => SessionStore::with_session(Session::from_token(token)),
      None => SessionStore::new(),
    };
    let transport = HttpTransport::new(&config.api, session.clone())?;
    let cache = config.cache.to_cache_config()?;
    let i18n = Translator::with_messages(&config.api.locale, config.translations.clone());

    info!(
      base_url = %config.api.base_url,
      signed_in = session.is_authenticated(),
      "dashboard client ready"
    );

    Ok(Self::new(
      Arc::new(transport),
      session,
      notifier,
      Arc::new(i18n),
      cache,
    ))
  }

  fn crud<R: Resource>(&self) -> ResourceHooks<R> {
    ResourceHooks::new(self.ctx.clone(), CrudService::new(self.client.clone()))
  }

  pub fn users(&self) -> ResourceHooks<Users> {
    self.crud()
  }

  pub fn plans(&self) -> ResourceHooks<Plans> {
    self.crud()
  }

  pub fn packages(&self) -> ResourceHooks<Packages> {
    self.crud()
  }

  pub fn products(&self) -> ResourceHooks<Products> {
    self.crud()
  }

  pub fn notifications(&self) -> ResourceHooks<Notifications> {
    self.crud()
  }

  pub fn coupons(&self) -> ResourceHooks<Coupons> {
    self.crud()
  }

  pub fn payments(&self) -> PaymentHooks {
    PaymentHooks::new(self.ctx.clone(), PaymentService::new(self.client.clone()))
  }

  pub fn divar(&self) -> DivarHooks {
    DivarHooks::new(self.ctx.clone(), DivarService::new(self.client.clone()))
  }

  pub fn auth(&self) -> AuthHooks {
    AuthHooks::new(self.ctx.clone(), AuthService::new(self.client.clone()))
  }

  pub fn cache(&self) -> &CacheLayer {
    self.ctx.cache()
  }

  pub fn session(&self) -> &SessionStore {
    self.ctx.session()
  }

  pub fn i18n(&self) -> &Translator {
    self.ctx.mutations().i18n()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::api::types::ListFilters;
  use crate::api::Method;
  use crate::notify::RecordingNotifier;
  use crate::test_support::MockTransport;

  fn dashboard(transport: Arc<MockTransport>) -> Dashboard {
    Dashboard::new(
      transport,
      SessionStore::new(),
      Arc::new(RecordingNotifier::new()),
      Arc::new(Translator::default()),
      CacheConfig::default(),
    )
  }

  #[tokio::test]
  async fn test_hooks_share_one_cache() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(Method::Get, "/packages", 200, json!({ "results": [{ "id": "pk1" }] }));
    let dashboard = dashboard(transport.clone());

    dashboard.packages().list(ListFilters::page(1)).load().await;
    let clone = dashboard.clone();
    let mut again = clone.packages().list(ListFilters::page(1));
    again.fetch();

    assert!(again.is_success());
    assert_eq!(transport.calls(Method::Get, "/packages"), 1);
  }

  #[tokio::test]
  async fn test_concurrent_list_reads_share_one_request() {
    let transport =
      Arc::new(MockTransport::new().with_delay(std::time::Duration::from_millis(20)));
    transport.respond(Method::Get, "/products", 200, json!({ "results": [{ "id": "pr1" }] }));
    let dashboard = dashboard(transport.clone());

    let mut a = dashboard.products().list(ListFilters::default());
    let mut b = dashboard.products().list(ListFilters::default());
    a.fetch();
    b.fetch();
    let (ra, rb) = tokio::join!(a.settle(), b.settle());

    assert_eq!(ra.data, rb.data);
    assert_eq!(transport.calls(Method::Get, "/products"), 1);
  }

  #[tokio::test]
  async fn test_resources_use_separate_keys() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(Method::Get, "/users", 200, json!([]));
    transport.respond(Method::Get, "/coupons", 200, json!([]));
    let dashboard = dashboard(transport.clone());

    dashboard.users().list(ListFilters::default()).load().await;
    dashboard.coupons().list(ListFilters::default()).load().await;
    assert_eq!(transport.total_calls(), 2);
  }
}
