//! Closed error taxonomy for everything that talks to the dashboard API.
//!
//! Every failure the transport can produce is classified once, in
//! [`ApiError::from_response`], and every human-readable message is extracted
//! once, in [`ApiError::user_message`]. Nothing else reads error bodies.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::i18n::Translator;

/// Errors returned by the transport, services, queries and mutations.
///
/// `Clone` so a single failed in-flight request can be handed to every
/// caller that joined it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// Network failure or non-2xx response without a more specific shape.
  #[error("request failed{}: {}", fmt_status(.status), .message.as_deref().unwrap_or("no message"))]
  Transport {
    status: Option<u16>,
    message: Option<String>,
  },

  /// Non-2xx response whose body carries a field-keyed errors map.
  #[error("validation failed ({status}): {}", .message.as_deref().unwrap_or("invalid input"))]
  Validation {
    status: u16,
    message: Option<String>,
    errors: BTreeMap<String, Vec<String>>,
  },

  /// 401 or 403, optionally with a machine-readable failure code.
  #[error("not authorized ({status}){}", .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
  Auth {
    status: u16,
    code: Option<String>,
    message: Option<String>,
  },

  /// A body that could not be decoded at all.
  #[error("failed to decode response: {0}")]
  Decode(String),
}

fn fmt_status(status: &Option<u16>) -> String {
  status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Error body as the dashboard API sends it.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  message: Option<String>,
  #[serde(default)]
  code: Option<String>,
  #[serde(default)]
  errors: Option<BTreeMap<String, FieldErrors>>,
}

/// Field errors arrive either as a single string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldErrors {
  One(String),
  Many(Vec<String>),
}

impl From<FieldErrors> for Vec<String> {
  fn from(value: FieldErrors) -> Self {
    match value {
      FieldErrors::One(s) => vec![s],
      FieldErrors::Many(v) => v,
    }
  }
}

impl ApiError {
  /// Classify a non-2xx response.
  pub fn from_response(status: u16, body: &serde_json::Value) -> Self {
    let parsed: ErrorBody = serde_json::from_value(body.clone()).unwrap_or_default();
    let message = parsed.message.filter(|m| !m.trim().is_empty());

    if status == 401 || status == 403 {
      return ApiError::Auth {
        status,
        code: parsed.code,
        message,
      };
    }

    match parsed.errors {
      Some(errors) if !errors.is_empty() => ApiError::Validation {
        status,
        message,
        errors: errors.into_iter().map(|(k, v)| (k, v.into())).collect(),
      },
      _ => ApiError::Transport {
        status: Some(status),
        message,
      },
    }
  }

  /// A network-level failure with no HTTP status.
  pub fn network(message: impl Into<String>) -> Self {
    ApiError::Transport {
      status: None,
      message: Some(message.into()),
    }
  }

  /// Input rejected before any request was sent. Reported like a 400 so
  /// callers handle it the same way as a server-side validation failure.
  pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
    let message = message.into();
    ApiError::Validation {
      status: 400,
      message: Some(message.clone()),
      errors: BTreeMap::from([(field.to_string(), vec![message])]),
    }
  }

  /// HTTP status of the failed response, if there was one.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Transport { status, .. } => *status,
      ApiError::Validation { status, .. } | ApiError::Auth { status, .. } => Some(*status),
      ApiError::Decode(_) => None,
    }
  }

  pub fn is_auth(&self) -> bool {
    matches!(self, ApiError::Auth { .. })
  }

  /// Server-provided message, if any.
  pub fn server_message(&self) -> Option<&str> {
    match self {
      ApiError::Transport { message, .. }
      | ApiError::Validation { message, .. }
      | ApiError::Auth { message, .. } => message.as_deref(),
      ApiError::Decode(_) => None,
    }
  }

  /// The one place a human-readable message is pulled out of an error.
  ///
  /// Server message first, then the first field error, then a translated
  /// generic message for the error kind.
  pub fn user_message(&self, i18n: &Translator) -> String {
    if let Some(message) = self.server_message() {
      return message.to_string();
    }

    match self {
      ApiError::Validation { errors, .. } => errors
        .values()
        .flat_map(|v| v.iter())
        .next()
        .cloned()
        .unwrap_or_else(|| i18n.translate("errors.validation", &[])),
      ApiError::Auth { .. } => i18n.translate("errors.unauthorized", &[]),
      ApiError::Transport { status: None, .. } => i18n.translate("errors.network", &[]),
      ApiError::Transport { .. } | ApiError::Decode(_) => i18n.translate("errors.generic", &[]),
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ApiError::Decode(err.to_string())
    } else {
      ApiError::Transport {
        status: err.status().map(|s| s.as_u16()),
        message: Some(err.to_string()),
      }
    }
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    ApiError::Decode(err.to_string())
  }
}
