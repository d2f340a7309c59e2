//! Cache keys and key patterns.

use std::fmt;

/// One primitive element of a cache key tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
  Null,
  Bool(bool),
  Int(i64),
  Str(String),
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Null => f.write_str("null"),
      KeyPart::Bool(b) => write!(f, "{b}"),
      KeyPart::Int(i) => write!(f, "{i}"),
      KeyPart::Str(s) => write!(f, "{s:?}"),
    }
  }
}

impl From<&str> for KeyPart {
  fn from(value: &str) -> Self {
    KeyPart::Str(value.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(value: String) -> Self {
    KeyPart::Str(value)
  }
}

impl From<&String> for KeyPart {
  fn from(value: &String) -> Self {
    KeyPart::Str(value.clone())
  }
}

impl From<bool> for KeyPart {
  fn from(value: bool) -> Self {
    KeyPart::Bool(value)
  }
}

impl From<i64> for KeyPart {
  fn from(value: i64) -> Self {
    KeyPart::Int(value)
  }
}

impl From<u32> for KeyPart {
  fn from(value: u32) -> Self {
    KeyPart::Int(i64::from(value))
  }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(KeyPart::Null)
  }
}

/// Ordered tuple identifying one cached result set.
///
/// The first part is always the resource name. Two keys are equal iff their
/// tuples are equal element by element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
  parts: Vec<KeyPart>,
}

impl CacheKey {
  pub fn new(resource: &str) -> Self {
    Self {
      parts: vec![KeyPart::from(resource)],
    }
  }

  /// Append one element to the tuple.
  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.parts.push(part.into());
    self
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.parts
  }

  /// Resource name this key belongs to.
  pub fn resource(&self) -> &str {
    match self.parts.first() {
      Some(KeyPart::Str(s)) => s,
      _ => "",
    }
  }

  /// True if `prefix` is an element-wise prefix of this key.
  pub fn starts_with(&self, prefix: &CacheKey) -> bool {
    self.parts.starts_with(&prefix.parts)
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[")?;
    for (i, part) in self.parts.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{part}")?;
    }
    f.write_str("]")
  }
}

/// Target of an invalidation or eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
  /// Exactly this key.
  Exact(CacheKey),
  /// Every key that starts with this key, including the key itself.
  Prefix(CacheKey),
}

impl KeyPattern {
  pub fn matches(&self, key: &CacheKey) -> bool {
    match self {
      KeyPattern::Exact(k) => k == key,
      KeyPattern::Prefix(p) => key.starts_with(p),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_keys_compare_by_tuple() {
    let a = CacheKey::new("coupons").with("list").with(1u32).with(Some("off"));
    let b = CacheKey::new("coupons").with("list").with(1u32).with(Some("off"));
    let c = CacheKey::new("coupons").with("list").with(1u32).with(None::<&str>);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(c.parts()[3], KeyPart::Null);
  }

  #[test]
  fn test_int_and_string_parts_differ() {
    let a = CacheKey::new("users").with("detail").with(7i64);
    let b = CacheKey::new("users").with("detail").with("7");
    assert_ne!(a, b);
  }

  #[test]
  fn test_prefix_matching() {
    let list = CacheKey::new("coupons").with("list");
    let page = list.clone().with(2u32);
    let detail = CacheKey::new("coupons").with("detail").with("c1");

    let pattern = KeyPattern::Prefix(list.clone());
    assert!(pattern.matches(&list));
    assert!(pattern.matches(&page));
    assert!(!pattern.matches(&detail));

    assert!(KeyPattern::Prefix(CacheKey::new("coupons")).matches(&detail));
    assert!(!KeyPattern::Exact(list).matches(&page));
  }

  #[test]
  fn test_display_and_resource() {
    let key = CacheKey::new("divar").with("posts").with(2u32).with(true);
    assert_eq!(key.resource(), "divar");
    assert_eq!(key.to_string(), r#"["divar", "posts", 2, true]"#);
  }
}
