use super::HookContext;
use crate::api::types::{ListFilters, Paginated, Payment};
use crate::api::DashboardQueryKey;
use crate::cache::Cacheable;
use crate::error::ApiError;
use crate::mutation::{list_prefix, CacheEffects};
use crate::query::Query;
use crate::services::PaymentService;

#[derive(Clone)]
pub struct PaymentHooks {
  ctx: HookContext,
  service: PaymentService,
}

impl PaymentHooks {
  pub fn new(ctx: HookContext, service: PaymentService) -> Self {
    Self { ctx, service }
  }

  pub fn list(&self, filters: ListFilters) -> Query<Paginated<Payment>> {
    let key = DashboardQueryKey::list(Payment::resource(), filters.clone()).cache_key();
    let service = self.service.clone();
    self.ctx.query(key, move || {
      let service = service.clone();
      let filters = filters.clone();
      async move { service.list(&filters).await }
    })
  }

  pub fn get_by_id(&self, id: &str) -> Query<Payment> {
    let key = DashboardQueryKey::detail(Payment::resource(), id).cache_key();
    let service = self.service.clone();
    let id = id.to_string();
    self.ctx.query(key, move || {
      let service = service.clone();
      let id = id.clone();
      async move { service.get(&id).await }
    })
  }

  /// Confirm a gateway callback. The payment's status changes server-side,
  /// so its detail entry is replaced and payment lists go stale.
  pub async fn verify(&self, authority: &str) -> Result<Payment, ApiError> {
    self
      .ctx
      .mutations()
      .run(
        "payments.verify",
        self.service.verify(authority),
        Some(self.ctx.t("payments.verified", &[])),
        |payment| {
          CacheEffects::new()
            .put_entity(payment)
            .invalidate_prefix(list_prefix(Payment::resource()))
        },
      )
      .await
  }
}
