//! Resource services: one logical operation, one HTTP call.
//!
//! Services never cache, retry or notify. Errors come back exactly as the
//! transport produced them.

mod auth;
mod coupons;
mod crud;
mod divar;
mod notifications;
mod payments;

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::types::{Coupon, Notification, Package, Plan, Product, User};
use crate::cache::Cacheable;

pub use auth::AuthService;
pub use crud::CrudService;
pub use divar::DivarService;
pub use payments::PaymentService;

/// A REST collection with the standard list/get/create/update/remove
/// endpoints under [`Resource::PATH`].
pub trait Resource: Send + Sync + 'static {
  type Entity: Cacheable + Serialize + DeserializeOwned + Debug;

  /// Collection path, e.g. `/coupons`
  const PATH: &'static str;

  /// Singular display name used in notifications
  const LABEL: &'static str;
}

macro_rules! resource {
  ($name:ident, $entity:ty, $path:literal, $label:literal) => {
    #[derive(Debug, Clone, Copy)]
    pub struct $name;

    impl Resource for $name {
      type Entity = $entity;
      const PATH: &'static str = $path;
      const LABEL: &'static str = $label;
    }
  };
}

resource!(Users, User, "/users", "User");
resource!(Plans, Plan, "/plans", "Plan");
resource!(Packages, Package, "/packages", "Package");
resource!(Products, Product, "/products", "Product");
resource!(Notifications, Notification, "/notifications", "Notification");
resource!(Coupons, Coupon, "/coupons", "Coupon");

/// `{collection}/{id}`, with `id` percent-encoded as one path segment.
fn item_path(collection: &str, id: &str) -> String {
  format!("{}/{}", collection.trim_end_matches('/'), urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_item_path() {
    assert_eq!(item_path(Coupons::PATH, "c1"), "/coupons/c1");
    assert_eq!(item_path("/divar/posts/", "tok"), "/divar/posts/tok");
  }

  #[test]
  fn test_item_path_encodes_reserved_characters() {
    assert_eq!(item_path(Coupons::PATH, "a/b"), "/coupons/a%2Fb");
    assert_eq!(item_path(Coupons::PATH, "x?y#z"), "/coupons/x%3Fy%23z");
    assert_eq!(item_path(Coupons::PATH, "summer sale"), "/coupons/summer%20sale");
  }

  fn resource_name<R: Resource>() -> &'static str {
    <R::Entity as Cacheable>::resource()
  }

  #[test]
  fn test_resource_names_match_entities() {
    assert_eq!(resource_name::<Coupons>(), "coupons");
    assert_eq!(resource_name::<Packages>(), "packages");
    assert_eq!(resource_name::<Notifications>(), "notifications");
  }
}
