use super::ResourceHooks;
use crate::api::types::Notification;
use crate::cache::Cacheable;
use crate::error::ApiError;
use crate::mutation::{list_prefix, CacheEffects};
use crate::services::Notifications;

impl ResourceHooks<Notifications> {
  pub async fn mark_read(&self, id: &str) -> Result<Notification, ApiError> {
    self
      .ctx
      .mutations()
      .run(
        "notifications.mark_read",
        self.service.mark_read(id),
        Some(self.ctx.t("notifications.marked_read", &[])),
        |notification| {
          CacheEffects::new()
            .put_entity(notification)
            .invalidate_prefix(list_prefix(Notification::resource()))
        },
      )
      .await
  }
}
