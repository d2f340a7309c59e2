use serde_json::json;

use super::item_path;
use crate::api::types::{ListFilters, Paginated, Payment};
use crate::api::ApiClient;
use crate::error::ApiError;

const PATH: &str = "/payments";

/// Payments are created by the gateway flow, so the dashboard only reads
/// and verifies them.
#[derive(Clone)]
pub struct PaymentService {
  client: ApiClient,
}

impl PaymentService {
  pub fn new(client: ApiClient) -> Self {
    Self { client }
  }

  pub async fn list(&self, filters: &ListFilters) -> Result<Paginated<Payment>, ApiError> {
    self.client.get_page(PATH, filters.to_params()).await
  }

  pub async fn get(&self, id: &str) -> Result<Payment, ApiError> {
    self.client.get(&item_path(PATH, id), Vec::new()).await
  }

  /// `POST /payments/verify`: confirm a gateway callback by authority code.
  pub async fn verify(&self, authority: &str) -> Result<Payment, ApiError> {
    self
      .client
      .post("/payments/verify", &json!({ "authority": authority }))
      .await
  }
}
