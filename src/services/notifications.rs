use serde_json::json;

use super::{item_path, CrudService, Notifications, Resource};
use crate::api::types::Notification;
use crate::error::ApiError;

impl CrudService<Notifications> {
  /// `PATCH /notifications/{id}/read`
  pub async fn mark_read(&self, id: &str) -> Result<Notification, ApiError> {
    let path = format!("{}/read", item_path(Notifications::PATH, id));
    self.client().patch(&path, &json!({})).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::api::{ApiClient, Method};
  use crate::test_support::MockTransport;

  #[tokio::test]
  async fn test_mark_read() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
      Method::Patch,
      "/notifications/n1/read",
      200,
      json!({ "id": "n1", "title": "Quota low", "isRead": true }),
    );
    let notifications: CrudService<Notifications> = CrudService::new(ApiClient::new(transport));

    let notification = notifications.mark_read("n1").await.unwrap();
    assert!(notification.is_read);
  }
}
