use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::api_types::normalize_page;
use super::transport::{ApiRequest, Transport};
use super::types::Paginated;
use crate::error::ApiError;

/// Typed JSON helpers over a [`Transport`].
///
/// Each call maps to exactly one request; nothing is retried or cached here.
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
}

impl ApiClient {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  /// Send a request and return the raw JSON body.
  pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
    Ok(self.transport.request(request).await?.data)
  }

  /// Send a request and decode the body as `T`.
  pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
    let data = self.send(request).await?;
    Ok(serde_json::from_value(data)?)
  }

  pub async fn get<T: DeserializeOwned>(
    &self,
    path: &str,
    params: Vec<(String, String)>,
  ) -> Result<T, ApiError> {
    self.send_json(ApiRequest::get(path).params(params)).await
  }

  /// GET a list endpoint and normalize it to [`Paginated`].
  pub async fn get_page<T: DeserializeOwned>(
    &self,
    path: &str,
    params: Vec<(String, String)>,
  ) -> Result<Paginated<T>, ApiError> {
    let data = self.send(ApiRequest::get(path).params(params)).await?;
    normalize_page(data)
  }

  pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    self
      .send_json(ApiRequest::post(path).body(serde_json::to_value(body)?))
      .await
  }

  pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    self
      .send_json(ApiRequest::patch(path).body(serde_json::to_value(body)?))
      .await
  }

  pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    self.send_json(ApiRequest::delete(path)).await
  }
}
