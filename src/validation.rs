//! Pure input cleaning and validation helpers.
//!
//! All functions are total: malformed input degrades to a best-effort cleaned
//! string, and the boolean predicates decide validity separately.

use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^09\d{9}$").unwrap());

pub const DEFAULT_OTP_MIN: usize = 4;
pub const DEFAULT_OTP_MAX: usize = 6;

/// Map Persian (U+06F0..U+06F9) and Arabic-Indic (U+0660..U+0669) digits to
/// ASCII. Any other character is returned unchanged.
fn to_ascii_digit(c: char) -> char {
  match c {
    '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
    '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
    _ => c,
  }
}

/// Localized digits to ASCII, everything that is not a digit dropped.
fn ascii_digits(input: &str) -> String {
  input
    .chars()
    .map(to_ascii_digit)
    .filter(|c| c.is_ascii_digit())
    .collect()
}

/// Normalize a phone number to the 11-digit local format `09XXXXXXXXX`.
///
/// Accepts localized digits, separators, and `+98`/`0098`/`98` country
/// prefixes. Input that cannot be fully normalized comes back as its cleaned
/// digits.
pub fn clean_phone(input: &str) -> String {
  let digits = ascii_digits(input);

  let local = if let Some(rest) = digits.strip_prefix("0098") {
    rest
  } else if digits.len() == 12 && digits.starts_with("98") {
    &digits[2..]
  } else {
    digits.as_str()
  };

  if local.len() == 10 && local.starts_with('9') {
    format!("0{local}")
  } else {
    local.to_string()
  }
}

pub fn validate_phone(phone: &str) -> bool {
  PHONE_RE.is_match(phone)
}

/// Strip everything but digits from an OTP, converting localized digits.
pub fn clean_otp(input: &str) -> String {
  ascii_digits(input)
}

/// OTP check with the default 4-6 digit bounds.
pub fn validate_otp(code: &str) -> bool {
  validate_otp_with_bounds(code, DEFAULT_OTP_MIN, DEFAULT_OTP_MAX)
}

/// True if `code` is all ASCII digits with a length in `min..=max`.
pub fn validate_otp_with_bounds(code: &str, min: usize, max: usize) -> bool {
  (min..=max).contains(&code.len()) && code.chars().all(|c| c.is_ascii_digit())
}

/// Coupon codes are case-insensitive on the server; send them upper-cased
/// with no whitespace.
pub fn clean_coupon_code(input: &str) -> String {
  input
    .chars()
    .map(to_ascii_digit)
    .filter(|c| !c.is_whitespace())
    .flat_map(char::to_uppercase)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_clean_phone_persian_digits() {
    assert_eq!(clean_phone("۰۹۱۲۳۴۵۶۷۸۹"), "09123456789");
  }

  #[test]
  fn test_clean_phone_arabic_indic_digits() {
    assert_eq!(clean_phone("٠٩١٢٣٤٥٦٧٨٩"), "09123456789");
  }

  #[test]
  fn test_clean_phone_country_prefixes() {
    assert_eq!(clean_phone("+98 912 345 6789"), "09123456789");
    assert_eq!(clean_phone("00989123456789"), "09123456789");
    assert_eq!(clean_phone("989123456789"), "09123456789");
    assert_eq!(clean_phone("9123456789"), "09123456789");
  }

  #[test]
  fn test_clean_phone_best_effort() {
    assert_eq!(clean_phone("12-3"), "123");
    assert_eq!(clean_phone(""), "");
    assert_eq!(clean_phone("abc"), "");
  }

  #[test]
  fn test_validate_phone() {
    assert!(validate_phone("09123456789"));
    assert!(!validate_phone("123"));
    assert!(!validate_phone("9123456789"));
    assert!(!validate_phone("091234567890"));
  }

  #[test]
  fn test_clean_otp() {
    assert_eq!(clean_otp("۱۲۳۴"), "1234");
    assert_eq!(clean_otp(" 12-34 "), "1234");
  }

  #[test]
  fn test_validate_otp_default_bounds() {
    assert!(validate_otp("1234"));
    assert!(validate_otp("123456"));
    assert!(!validate_otp("123"));
    assert!(!validate_otp("1234567"));
    assert!(!validate_otp("12a4"));
  }

  #[test]
  fn test_validate_otp_custom_bounds() {
    assert!(validate_otp_with_bounds("12345", 5, 5));
    assert!(!validate_otp_with_bounds("1234", 5, 5));
  }

  #[test]
  fn test_clean_coupon_code() {
    assert_eq!(clean_coupon_code(" summer 2024 "), "SUMMER2024");
    assert_eq!(clean_coupon_code("off۵۰"), "OFF50");
  }
}
