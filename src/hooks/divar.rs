use super::HookContext;
use crate::api::types::{DivarAddonInput, DivarPost, ListFilters, Paginated};
use crate::api::DashboardQueryKey;
use crate::cache::Cacheable;
use crate::error::ApiError;
use crate::mutation::{list_prefix, CacheEffects};
use crate::query::Query;
use crate::services::DivarService;

#[derive(Clone)]
pub struct DivarHooks {
  ctx: HookContext,
  service: DivarService,
}

impl DivarHooks {
  pub fn new(ctx: HookContext, service: DivarService) -> Self {
    Self { ctx, service }
  }

  /// The merchant's Divar posts, `["divar", "list", ...filters]`.
  pub fn posts(&self, filters: ListFilters) -> Query<Paginated<DivarPost>> {
    let key = DashboardQueryKey::list(DivarPost::resource(), filters.clone()).cache_key();
    let service = self.service.clone();
    self.ctx.query(key, move || {
      let service = service.clone();
      let filters = filters.clone();
      async move { service.list_posts(&filters).await }
    })
  }

  /// One post by token, `["divar", "detail", token]`.
  pub fn post(&self, token: &str) -> Query<DivarPost> {
    let key = DashboardQueryKey::detail(DivarPost::resource(), token).cache_key();
    let service = self.service.clone();
    let token = token.to_string();
    self.ctx.query(key, move || {
      let service = service.clone();
      let token = token.clone();
      async move { service.get_post(&token).await }
    })
  }

  pub async fn add_addon(&self, token: &str, addon: &DivarAddonInput) -> Result<DivarPost, ApiError> {
    self
      .ctx
      .mutations()
      .run(
        "divar.add_addon",
        self.service.add_addon(token, addon),
        Some(self.ctx.t("divar.addon_added", &[("token", token)])),
        post_effects,
      )
      .await
  }

  pub async fn remove_addon(&self, token: &str, addon_id: &str) -> Result<DivarPost, ApiError> {
    self
      .ctx
      .mutations()
      .run(
        "divar.remove_addon",
        self.service.remove_addon(token, addon_id),
        Some(self.ctx.t("divar.addon_removed", &[("token", token)])),
        post_effects,
      )
      .await
  }
}

/// The returned post replaces its detail entry, then post lists go stale.
fn post_effects(post: &DivarPost) -> CacheEffects {
  CacheEffects::new()
    .put_entity(post)
    .invalidate_prefix(list_prefix(DivarPost::resource()))
}
