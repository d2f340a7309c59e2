//! Localization collaborator.
//!
//! Message templates are looked up by dotted key and interpolated with
//! `{name}` placeholders. A missing key translates to the key itself.

use std::collections::HashMap;

/// Built-in English catalog. Config translations are layered on top.
const DEFAULT_MESSAGES: &[(&str, &str)] = &[
  ("errors.generic", "Something went wrong, please try again"),
  ("errors.network", "Network error, check your connection"),
  ("errors.unauthorized", "Your session has expired, please sign in again"),
  ("errors.validation", "Some fields are invalid"),
  ("validation.phone", "Enter a valid mobile number like 09123456789"),
  ("validation.otp", "Enter the verification code you received"),
  ("resource.created", "{resource} created"),
  ("resource.updated", "{resource} updated"),
  ("resource.removed", "{resource} removed"),
  ("coupons.valid", "Coupon {code} applied"),
  ("coupons.invalid", "Coupon {code} is not valid"),
  ("divar.addon_added", "Add-on added to post {token}"),
  ("divar.addon_removed", "Add-on removed from post {token}"),
  ("auth.otp_sent", "Verification code sent to {phone}"),
  ("auth.signed_in", "Signed in"),
  ("auth.signed_out", "Signed out"),
  ("notifications.marked_read", "Notification marked as read"),
  ("payments.verified", "Payment verified"),
];

#[derive(Debug, Clone)]
pub struct Translator {
  locale: String,
  messages: HashMap<String, String>,
}

impl Default for Translator {
  fn default() -> Self {
    Self {
      locale: "en".to_string(),
      messages: DEFAULT_MESSAGES
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
    }
  }
}

impl Translator {
  /// Translator with no messages at all; every lookup returns its key.
  pub fn empty() -> Self {
    Self {
      locale: "en".to_string(),
      messages: HashMap::new(),
    }
  }

  /// Default catalog with `overrides` layered on top for `locale`.
  pub fn with_messages(locale: &str, overrides: HashMap<String, String>) -> Self {
    let mut translator = Self::default();
    translator.locale = locale.to_string();
    translator.messages.extend(overrides);
    translator
  }

  pub fn locale(&self) -> &str {
    &self.locale
  }

  /// Look up `key` and substitute `{name}` placeholders from `params`.
  pub fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
    let Some(template) = self.messages.get(key) else {
      return key.to_string();
    };

    params
      .iter()
      .fold(template.clone(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
      })
  }
}
