use std::marker::PhantomData;

use serde::Serialize;

use super::{item_path, Resource};
use crate::api::types::{ListFilters, MessageResponse, Paginated};
use crate::api::ApiClient;
use crate::error::ApiError;

/// Standard CRUD endpoints of one resource.
pub struct CrudService<R> {
  client: ApiClient,
  _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for CrudService<R> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      _resource: PhantomData,
    }
  }
}

impl<R: Resource> CrudService<R> {
  pub fn new(client: ApiClient) -> Self {
    Self {
      client,
      _resource: PhantomData,
    }
  }

  pub(crate) fn client(&self) -> &ApiClient {
    &self.client
  }

  /// `GET {path}` with filters as query parameters.
  pub async fn list(&self, filters: &ListFilters) -> Result<Paginated<R::Entity>, ApiError> {
    self.client.get_page(R::PATH, filters.to_params()).await
  }

  /// `GET {path}/{id}`
  pub async fn get(&self, id: &str) -> Result<R::Entity, ApiError> {
    self.client.get(&item_path(R::PATH, id), Vec::new()).await
  }

  /// `POST {path}`
  pub async fn create<B>(&self, payload: &B) -> Result<R::Entity, ApiError>
  where
    B: Serialize + ?Sized,
  {
    self.client.post(R::PATH, payload).await
  }

  /// `PATCH {path}/{id}`, partial update.
  pub async fn update<B>(&self, id: &str, payload: &B) -> Result<R::Entity, ApiError>
  where
    B: Serialize + ?Sized,
  {
    self.client.patch(&item_path(R::PATH, id), payload).await
  }

  /// `DELETE {path}/{id}`. An empty body reads as an empty message.
  pub async fn remove(&self, id: &str) -> Result<MessageResponse, ApiError> {
    let response: Option<MessageResponse> = self.client.delete(&item_path(R::PATH, id)).await?;
    Ok(response.unwrap_or_default())
  }
}
