//! Raw response shapes and their normalization.
//!
//! The API is not consistent about where list results live or which paging
//! fields it sends. Everything here turns what it sends into the canonical
//! [`Paginated`] shape the hook layer relies on.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::types::Paginated;
use crate::error::ApiError;
use crate::session::Session;

/// Field names the API has been seen to nest list results under, in lookup
/// order.
const RESULT_FIELDS: &[&str] = &["results", "posts", "items", "docs", "data"];

/// Paging fields as sent by the API. All optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPageInfo {
  page: Option<u64>,
  limit: Option<u64>,
  total_pages: Option<u64>,
  #[serde(alias = "total", alias = "totalDocs")]
  total_results: Option<u64>,
}

/// Normalize a list response into [`Paginated`].
///
/// Results are read from the first of [`RESULT_FIELDS`] holding an array, or
/// from the body itself when it is a bare array. Missing `page` is 1, missing
/// `limit` and `totalResults` are the result count, missing `totalPages` is
/// derived from the other two (at least 1).
pub fn normalize_page<T: DeserializeOwned>(raw: Value) -> Result<Paginated<T>, ApiError> {
  let (items, info) = match raw {
    Value::Array(items) => (items, ApiPageInfo::default()),
    Value::Object(mut map) => {
      let field = RESULT_FIELDS
        .iter()
        .find(|field| matches!(map.get(**field), Some(Value::Array(_))));
      let items = match field.and_then(|field| map.remove(*field)) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
      };
      // Paging fields with the wrong type are treated as missing
      let info = serde_json::from_value(Value::Object(map)).unwrap_or_default();
      (items, info)
    }
    Value::Null => (Vec::new(), ApiPageInfo::default()),
    other => {
      return Err(ApiError::Decode(format!(
        "expected a list response, got {}",
        json_kind(&other)
      )))
    }
  };

  let results: Vec<T> = items
    .into_iter()
    .map(serde_json::from_value)
    .collect::<Result<_, _>>()?;

  let count = results.len() as u64;
  let limit = info.limit.unwrap_or(count);
  let total_results = info.total_results.unwrap_or(count);
  let total_pages = info
    .total_pages
    .unwrap_or_else(|| if limit == 0 { 1 } else { total_results.div_ceil(limit) })
    .max(1);

  Ok(Paginated {
    results,
    page: info.page.unwrap_or(1),
    limit,
    total_pages,
    total_results,
  })
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

/// Token response from OTP verification. Some deployments nest the tokens
/// under `tokens`, others return them at the top level.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLoginResponse {
  #[serde(default)]
  access_token: Option<String>,
  #[serde(default, alias = "token")]
  token_value: Option<String>,
  #[serde(default)]
  refresh_token: Option<String>,
  #[serde(default)]
  tokens: Option<ApiTokens>,
  #[serde(default)]
  user: Option<super::types::User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTokens {
  access: ApiToken,
  #[serde(default)]
  refresh: Option<ApiToken>,
}

#[derive(Debug, Deserialize)]
struct ApiToken {
  token: String,
}

impl ApiLoginResponse {
  pub fn into_session(self) -> Result<Session, ApiError> {
    let (access, refresh) = match self.tokens {
      Some(tokens) => (
        Some(tokens.access.token),
        tokens.refresh.map(|t| t.token).or(self.refresh_token),
      ),
      None => (self.access_token.or(self.token_value), self.refresh_token),
    };

    let access_token =
      access.ok_or_else(|| ApiError::Decode("login response carries no access token".into()))?;

    Ok(Session {
      access_token,
      refresh_token: refresh,
      user: self.user,
    })
  }
}
