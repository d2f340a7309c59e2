use serde::Serialize;

use super::HookContext;
use crate::api::types::{ListFilters, MessageResponse, Paginated};
use crate::api::DashboardQueryKey;
use crate::cache::{Cacheable, KeyPattern};
use crate::error::ApiError;
use crate::mutation::{detail_key, list_prefix, CacheEffects};
use crate::query::Query;
use crate::services::{CrudService, Resource};

/// Queries and mutations for one CRUD resource.
pub struct ResourceHooks<R> {
  pub(super) ctx: HookContext,
  pub(super) service: CrudService<R>,
}

impl<R> Clone for ResourceHooks<R> {
  fn clone(&self) -> Self {
    Self {
      ctx: self.ctx.clone(),
      service: self.service.clone(),
    }
  }
}

impl<R: Resource> ResourceHooks<R> {
  pub fn new(ctx: HookContext, service: CrudService<R>) -> Self {
    Self { ctx, service }
  }

  pub fn service(&self) -> &CrudService<R> {
    &self.service
  }

  fn resource() -> &'static str {
    <R::Entity as Cacheable>::resource()
  }

  /// One page of the resource, keyed by its filters.
  pub fn list(&self, filters: ListFilters) -> Query<Paginated<R::Entity>> {
    let key = DashboardQueryKey::list(Self::resource(), filters.clone()).cache_key();
    let service = self.service.clone();
    self.ctx.query(key, move || {
      let service = service.clone();
      let filters = filters.clone();
      async move { service.list(&filters).await }
    })
  }

  pub fn get_by_id(&self, id: &str) -> Query<R::Entity> {
    let key = DashboardQueryKey::detail(Self::resource(), id).cache_key();
    let service = self.service.clone();
    let id = id.to_string();
    self.ctx.query(key, move || {
      let service = service.clone();
      let id = id.clone();
      async move { service.get(&id).await }
    })
  }

  /// Create an entity. Every cached list of the resource goes stale.
  pub async fn create<B>(&self, payload: &B) -> Result<R::Entity, ApiError>
  where
    B: Serialize + ?Sized,
  {
    let resource = Self::resource();
    self
      .ctx
      .mutations()
      .run(
        &format!("{resource}.create"),
        self.service.create(payload),
        Some(self.ctx.t("resource.created", &[("resource", R::LABEL)])),
        |_| CacheEffects::new().invalidate_prefix(list_prefix(resource)),
      )
      .await
  }

  /// Update an entity. Its detail entry takes the response before any list
  /// is marked stale.
  pub async fn update<B>(&self, id: &str, payload: &B) -> Result<R::Entity, ApiError>
  where
    B: Serialize + ?Sized,
  {
    let resource = Self::resource();
    self
      .ctx
      .mutations()
      .run(
        &format!("{resource}.update"),
        self.service.update(id, payload),
        Some(self.ctx.t("resource.updated", &[("resource", R::LABEL)])),
        |entity| {
          CacheEffects::new()
            .put_entity(entity)
            .invalidate_prefix(list_prefix(resource))
        },
      )
      .await
  }

  /// Remove an entity, dropping its detail entry.
  pub async fn remove(&self, id: &str) -> Result<MessageResponse, ApiError> {
    let resource = Self::resource();
    self
      .ctx
      .mutations()
      .run(
        &format!("{resource}.remove"),
        self.service.remove(id),
        Some(self.ctx.t("resource.removed", &[("resource", R::LABEL)])),
        |_| {
          CacheEffects::new()
            .evict(KeyPattern::Exact(detail_key(resource, id)))
            .invalidate_prefix(list_prefix(resource))
        },
      )
      .await
  }
}
