use super::{Coupons, CrudService};
use crate::api::types::{CouponValidation, CouponValidationRequest};
use crate::error::ApiError;

impl CrudService<Coupons> {
  /// `POST /coupons/validate`: check a code, optionally against a package.
  pub async fn validate(
    &self,
    request: &CouponValidationRequest,
  ) -> Result<CouponValidation, ApiError> {
    self.client().post("/coupons/validate", request).await
  }
}
