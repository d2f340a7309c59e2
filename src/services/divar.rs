use super::item_path;
use crate::api::types::{DivarAddonInput, DivarPost, ListFilters, Paginated};
use crate::api::ApiClient;
use crate::error::ApiError;

const POSTS: &str = "/divar/posts";

/// Divar classifieds integration: the merchant's posts and the try-on
/// add-ons attached to them.
#[derive(Clone)]
pub struct DivarService {
  client: ApiClient,
}

impl DivarService {
  pub fn new(client: ApiClient) -> Self {
    Self { client }
  }

  /// The API returns posts under `posts`; normalized like any other list.
  pub async fn list_posts(&self, filters: &ListFilters) -> Result<Paginated<DivarPost>, ApiError> {
    self.client.get_page(POSTS, filters.to_params()).await
  }

  pub async fn get_post(&self, token: &str) -> Result<DivarPost, ApiError> {
    self.client.get(&item_path(POSTS, token), Vec::new()).await
  }

  /// `POST /divar/posts/{token}/addons`, returns the updated post.
  pub async fn add_addon(&self, token: &str, addon: &DivarAddonInput) -> Result<DivarPost, ApiError> {
    let path = format!("{}/addons", item_path(POSTS, token));
    self.client.post(&path, addon).await
  }

  /// `DELETE /divar/posts/{token}/addons/{addon_id}`, returns the updated post.
  pub async fn remove_addon(&self, token: &str, addon_id: &str) -> Result<DivarPost, ApiError> {
    let addons = format!("{}/addons", item_path(POSTS, token));
    let path = item_path(&addons, addon_id);
    self.client.delete(&path).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::json;

  use super::*;
  use crate::api::Method;
  use crate::test_support::MockTransport;

  fn service() -> (DivarService, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    (DivarService::new(ApiClient::new(transport.clone())), transport)
  }

  #[tokio::test]
  async fn test_list_posts_reads_posts_field() {
    let (divar, transport) = service();
    transport.respond(
      Method::Get,
      POSTS,
      200,
      json!({ "posts": [{ "token": "p1" }, { "token": "p2" }], "page": 2 }),
    );

    let page = divar.list_posts(&ListFilters::page(2)).await.unwrap();
    let tokens: Vec<_> = page.results.iter().map(|p| p.token.as_str()).collect();
    assert_eq!(tokens, vec!["p1", "p2"]);
    assert_eq!((page.page, page.limit, page.total_pages, page.total_results), (2, 2, 1, 2));
  }

  #[tokio::test]
  async fn test_addon_paths() {
    let (divar, transport) = service();
    transport.respond(
      Method::Post,
      "/divar/posts/p1/addons",
      201,
      json!({ "token": "p1", "addons": [{ "id": "a1", "widgetType": "try_on", "enabled": true }] }),
    );
    transport.respond(Method::Delete, "/divar/posts/p1/addons/a1", 200, json!({ "token": "p1" }));

    let post = divar
      .add_addon(
        "p1",
        &DivarAddonInput {
          product_id: "prod1".into(),
          widget_type: "try_on".into(),
        },
      )
      .await
      .unwrap();
    assert_eq!(post.addons.len(), 1);

    let post = divar.remove_addon("p1", "a1").await.unwrap();
    assert!(post.addons.is_empty());
  }
}
