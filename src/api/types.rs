//! Business payloads exchanged with the dashboard API.
//!
//! The cache layer treats these as opaque; only their ids matter to it.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, KeyPart};

/// Canonical paginated list shape every list-returning service emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
  pub results: Vec<T>,
  pub page: u64,
  pub limit: u64,
  pub total_pages: u64,
  pub total_results: u64,
}

/// Generic `{ message }` response, e.g. from deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
  #[serde(default)]
  pub message: String,
}

/// Filters shared by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilters {
  pub page: Option<u32>,
  pub limit: Option<u32>,
  pub search: Option<String>,
  pub sort_by: Option<String>,
  pub status: Option<String>,
}

impl ListFilters {
  pub fn page(page: u32) -> Self {
    Self {
      page: Some(page),
      ..Self::default()
    }
  }

  pub fn with_limit(mut self, limit: u32) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Surrounding whitespace is dropped; a blank search is no search.
  pub fn with_search(mut self, search: impl Into<String>) -> Self {
    let search = search.into();
    let search = search.trim();
    self.search = (!search.is_empty()).then(|| search.to_string());
    self
  }

  pub fn with_status(mut self, status: impl Into<String>) -> Self {
    self.status = Some(status.into());
    self
  }

  /// Query-string parameters, unset filters omitted.
  pub fn to_params(&self) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(page) = self.page {
      params.push(("page".to_string(), page.to_string()));
    }
    if let Some(limit) = self.limit {
      params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(search) = &self.search {
      params.push(("search".to_string(), search.clone()));
    }
    if let Some(sort_by) = &self.sort_by {
      params.push(("sortBy".to_string(), sort_by.clone()));
    }
    if let Some(status) = &self.status {
      params.push(("status".to_string(), status.clone()));
    }
    params
  }

  /// Append the filters to `key` in a fixed order, unset ones as null.
  pub fn extend_key(&self, key: CacheKey) -> CacheKey {
    key
      .with(self.page)
      .with(self.limit)
      .with(self.search.clone())
      .with(KeyPart::from(self.sort_by.clone()))
      .with(KeyPart::from(self.status.clone()))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub role: Option<String>,
  #[serde(default)]
  pub is_active: bool,
  #[serde(default)]
  pub created_at: Option<String>,
}

impl User {
  pub fn named(id: &str, name: &str) -> Self {
    Self {
      id: id.to_string(),
      name: name.to_string(),
      ..Self::default()
    }
  }
}

/// Subscription plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub price: u64,
  #[serde(default)]
  pub duration_days: u32,
  #[serde(default)]
  pub features: Vec<String>,
  #[serde(default)]
  pub is_active: bool,
}

/// SDK usage package sold on top of a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub price: u64,
  #[serde(default)]
  pub plan_id: Option<String>,
  /// Number of try-on requests included
  #[serde(default)]
  pub quota: u64,
  #[serde(default)]
  pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub user_id: Option<String>,
  #[serde(default)]
  pub package_id: Option<String>,
  #[serde(default)]
  pub amount: u64,
  #[serde(default)]
  pub status: String,
  /// Gateway authority code used for verification
  #[serde(default)]
  pub authority: Option<String>,
  #[serde(default)]
  pub ref_id: Option<String>,
  #[serde(default)]
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
  #[default]
  Percent,
  Fixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
  #[serde(alias = "_id")]
  pub id: String,
  pub code: String,
  #[serde(default)]
  pub discount_type: DiscountType,
  #[serde(default)]
  pub value: u64,
  #[serde(default)]
  pub max_uses: Option<u32>,
  #[serde(default)]
  pub used_count: u32,
  #[serde(default)]
  pub expires_at: Option<String>,
  #[serde(default)]
  pub is_active: bool,
}

/// Create/update payload for coupons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
  pub code: String,
  pub discount_type: DiscountType,
  pub value: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_uses: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub expires_at: Option<String>,
  pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidationRequest {
  pub code: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub package_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
  #[serde(default)]
  pub valid: bool,
  #[serde(default)]
  pub discount_amount: u64,
  #[serde(default)]
  pub final_price: Option<u64>,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub coupon: Option<Coupon>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub body: String,
  #[serde(default)]
  pub user_id: Option<String>,
  #[serde(default)]
  pub is_read: bool,
  #[serde(default)]
  pub created_at: Option<String>,
}

/// Catalog product that can be tried on through the SDK.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub brand: Option<String>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub sku: Option<String>,
  /// Shade colors as hex strings
  #[serde(default)]
  pub colors: Vec<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub is_active: bool,
}

/// Listing on the Divar classifieds platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivarPost {
  pub token: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub city: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub addons: Vec<DivarAddon>,
}

/// Try-on widget attached to a Divar post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivarAddon {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub product_id: Option<String>,
  #[serde(default)]
  pub widget_type: String,
  #[serde(default)]
  pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivarAddonInput {
  pub product_id: String,
  pub widget_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSent {
  #[serde(default)]
  pub message: String,
  /// Seconds until the code expires
  #[serde(default)]
  pub expires_in: Option<u32>,
}
