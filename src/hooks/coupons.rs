use super::ResourceHooks;
use crate::api::types::{CouponValidation, CouponValidationRequest};
use crate::error::ApiError;
use crate::mutation::CacheEffects;
use crate::services::Coupons;
use crate::validation::clean_coupon_code;

impl ResourceHooks<Coupons> {
  /// Check a coupon code, optionally against the package being bought.
  ///
  /// A rejected code is a successful call with `valid == false`; it raises an
  /// error notification but is returned as `Ok`.
  pub async fn validate(
    &self,
    code: &str,
    package_id: Option<&str>,
  ) -> Result<CouponValidation, ApiError> {
    let request = CouponValidationRequest {
      code: clean_coupon_code(code),
      package_id: package_id.map(str::to_string),
    };

    let mutations = self.ctx.mutations();
    let result = mutations
      .run(
        "coupons.validate",
        self.service.validate(&request),
        None,
        |_| CacheEffects::new(),
      )
      .await?;

    let params = [("code", request.code.as_str())];
    if result.valid {
      mutations.notify_success(&self.ctx.t("coupons.valid", &params));
    } else {
      let message = result
        .message
        .clone()
        .unwrap_or_else(|| self.ctx.t("coupons.invalid", &params));
      mutations.notify_error(&message);
    }
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::api::types::ListFilters;
  use crate::api::Method;
  use crate::hooks::test_util::{harness, harness_with};
  use crate::notify::NotifyKind;
  use crate::services::CrudService;
  use crate::test_support::MockTransport;

  #[tokio::test]
  async fn test_validate_cleans_code_and_notifies() {
    let h = harness();
    h.transport.respond(
      Method::Post,
      "/coupons/validate",
      200,
      json!({ "valid": true, "discountAmount": 5000 }),
    );
    let coupons = ResourceHooks::new(h.ctx.clone(), CrudService::<Coupons>::new(h.client.clone()));

    let result = coupons.validate(" off 20 ", Some("pk1")).await.unwrap();
    assert!(result.valid);
    assert_eq!(
      h.transport.last_request().unwrap().body,
      Some(json!({ "code": "OFF20", "packageId": "pk1" }))
    );
    assert_eq!(
      h.notifier.records(),
      vec![(NotifyKind::Success, "Coupon OFF20 applied".to_string())]
    );
  }

  #[tokio::test]
  async fn test_rejected_code_notifies_error() {
    let h = harness();
    h.transport.respond(
      Method::Post,
      "/coupons/validate",
      200,
      json!({ "valid": false, "message": "Coupon expired" }),
    );
    let coupons = ResourceHooks::new(h.ctx.clone(), CrudService::<Coupons>::new(h.client.clone()));

    let result = coupons.validate("OLD", None).await.unwrap();
    assert!(!result.valid);
    assert_eq!(
      h.notifier.records(),
      vec![(NotifyKind::Error, "Coupon expired".to_string())]
    );
  }

  #[tokio::test]
  async fn test_created_coupon_shows_up_in_next_list_read() {
    let h = harness();
    h.transport.respond(
      Method::Get,
      "/coupons",
      200,
      json!({ "results": [{ "id": "c1", "code": "OFF10" }] }),
    );
    h.transport.respond(
      Method::Get,
      "/coupons",
      200,
      json!({ "results": [{ "id": "c1", "code": "OFF10" }, { "id": "c2", "code": "NEW50" }] }),
    );
    h.transport.respond(Method::Post, "/coupons", 201, json!({ "id": "c2", "code": "NEW50" }));
    let coupons = ResourceHooks::new(h.ctx.clone(), CrudService::<Coupons>::new(h.client.clone()));

    coupons.list(ListFilters::page(1)).load().await;
    coupons.create(&json!({ "code": "NEW50" })).await.unwrap();

    // No handle was watching, so the next read does the refetch
    let mut list = coupons.list(ListFilters::page(1));
    let page = list.load().await.data.unwrap();
    let codes: Vec<_> = page.results.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["OFF10", "NEW50"]);
    assert_eq!(h.transport.calls(Method::Get, "/coupons"), 2);

    // And the result is fresh again
    coupons.list(ListFilters::page(1)).load().await;
    assert_eq!(h.transport.calls(Method::Get, "/coupons"), 2);
  }

  #[tokio::test]
  async fn test_coupon_created_during_list_fetch_is_not_lost() {
    let h = harness_with(MockTransport::new().with_delay(std::time::Duration::from_millis(20)));
    h.transport.respond(Method::Get, "/coupons", 200, json!({ "results": [{ "id": "c1" }] }));
    h.transport.respond(
      Method::Get,
      "/coupons",
      200,
      json!({ "results": [{ "id": "c1" }, { "id": "c2" }] }),
    );
    h.transport.respond(Method::Post, "/coupons", 201, json!({ "id": "c2", "code": "NEW50" }));
    let coupons = ResourceHooks::new(h.ctx.clone(), CrudService::<Coupons>::new(h.client.clone()));

    let create = {
      let coupons = coupons.clone();
      tokio::spawn(async move { coupons.create(&json!({ "code": "NEW50" })).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    // Answered with the list as it was before the create landed
    let mut list = coupons.list(ListFilters::page(1));
    list.fetch();
    create.await.unwrap().unwrap();

    let first = list.settle().await;
    assert_eq!(first.data.map(|p| p.results.len()), Some(1));
    assert!(first.is_loading);

    let second = list.settle().await;
    assert_eq!(second.data.map(|p| p.results.len()), Some(2));
    assert!(!second.is_loading);
    assert!(!list.is_stale());

    let mut next = coupons.list(ListFilters::page(1));
    assert_eq!(next.load().await.data.map(|p| p.results.len()), Some(2));
    assert_eq!(h.transport.calls(Method::Get, "/coupons"), 2);
  }

  #[tokio::test]
  async fn test_unwatched_list_fetched_during_create_reads_fresh_next_time() {
    let h = harness_with(MockTransport::new().with_delay(std::time::Duration::from_millis(20)));
    h.transport.respond(Method::Get, "/coupons", 200, json!({ "results": [{ "id": "c1" }] }));
    h.transport.respond(
      Method::Get,
      "/coupons",
      200,
      json!({ "results": [{ "id": "c1" }, { "id": "c2" }] }),
    );
    h.transport.respond(Method::Post, "/coupons", 201, json!({ "id": "c2" }));
    let coupons = ResourceHooks::new(h.ctx.clone(), CrudService::<Coupons>::new(h.client.clone()));

    let create = {
      let coupons = coupons.clone();
      tokio::spawn(async move { coupons.create(&json!({ "code": "NEW50" })).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let mut list = coupons.list(ListFilters::page(1));
    list.fetch();
    drop(list);
    create.await.unwrap().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    let mut next = coupons.list(ListFilters::page(1));
    assert_eq!(next.load().await.data.map(|p| p.results.len()), Some(2));
    assert_eq!(h.transport.calls(Method::Get, "/coupons"), 2);
  }
}
