//! Caching implementations for dashboard types.

use crate::cache::{CacheKey, Cacheable};
use crate::mutation::{detail_key, list_prefix};

use super::types::{
  Coupon, DivarPost, ListFilters, Notification, Package, Payment, Plan, Product, User,
};

// ============================================================================
// Cacheable implementations
// ============================================================================

macro_rules! cacheable_by_id {
  ($($ty:ty => $resource:literal),* $(,)?) => {
    $(
      impl Cacheable for $ty {
        fn cache_id(&self) -> String {
          self.id.clone()
        }

        fn resource() -> &'static str {
          $resource
        }
      }
    )*
  };
}

cacheable_by_id! {
  User => "users",
  Plan => "plans",
  Package => "packages",
  Payment => "payments",
  Coupon => "coupons",
  Notification => "notifications",
  Product => "products",
}

impl Cacheable for DivarPost {
  fn cache_id(&self) -> String {
    // Divar identifies posts by token, not by id
    self.token.clone()
  }

  fn resource() -> &'static str {
    "divar"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Query keys for dashboard API calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardQueryKey {
  /// Paginated list of a resource
  List {
    resource: &'static str,
    filters: ListFilters,
  },
  /// Single entity of a resource
  Detail { resource: &'static str, id: String },
  /// Currently signed-in user
  Me,
}

impl DashboardQueryKey {
  pub fn list(resource: &'static str, filters: ListFilters) -> Self {
    Self::List { resource, filters }
  }

  pub fn detail(resource: &'static str, id: impl Into<String>) -> Self {
    Self::Detail {
      resource,
      id: id.into(),
    }
  }

  /// The structured cache key: `[resource, "list", ...filters]`,
  /// `[resource, "detail", id]` or `["auth", "me"]`.
  pub fn cache_key(&self) -> CacheKey {
    match self {
      Self::List { resource, filters } => filters.extend_key(list_prefix(resource)),
      Self::Detail { resource, id } => detail_key(resource, id),
      Self::Me => me_key(),
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::List { resource, filters } => {
        let page = filters.page.unwrap_or(1);
        match filters.search.as_deref() {
          Some(search) => format!("{} page {} matching {:?}", resource, page, search),
          None => format!("{} page {}", resource, page),
        }
      }
      Self::Detail { resource, id } => format!("{} {}", resource, id),
      Self::Me => "current user".to_string(),
    }
  }
}

/// `["auth", "me"]`
pub fn me_key() -> CacheKey {
  CacheKey::new("auth").with("me")
}
