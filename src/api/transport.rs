//! HTTP transport: the one configured client every service call goes through.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
    })
  }
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// One request against the API. Paths are relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub params: Vec<(String, String)>,
  pub body: Option<Value>,
  pub headers: Vec<(String, String)>,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      params: Vec::new(),
      body: None,
      headers: Vec::new(),
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::Post, path)
  }

  pub fn patch(path: impl Into<String>) -> Self {
    Self::new(Method::Patch, path)
  }

  pub fn put(path: impl Into<String>) -> Self {
    Self::new(Method::Put, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::Delete, path)
  }

  pub fn params(mut self, params: Vec<(String, String)>) -> Self {
    self.params.extend(params);
    self
  }

  pub fn body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }
}

/// Successful (2xx) response. Empty bodies read as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
  pub status: u16,
  pub data: Value,
}

/// Sends requests to the API. Non-2xx responses come back as `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport. Attaches the bearer token from the session
/// store and the configured `Accept-Language` to every request.
pub struct HttpTransport {
  client: Client,
  base_url: Url,
  locale: String,
  session: SessionStore,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self> {
    // Url::join drops the last path segment unless the base ends in '/'
    let mut base = config.base_url.trim().to_string();
    if !base.ends_with('/') {
      base.push('/');
    }
    let base_url =
      Url::parse(&base).map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .gzip(true)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url,
      locale: config.locale.clone(),
      session,
    })
  }

  fn url(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| ApiError::network(format!("invalid request path {path}: {e}")))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
    let url = self.url(&request.path)?;
    debug!(method = %request.method, %url, "api request");

    let mut builder = self
      .client
      .request(request.method.into(), url)
      .header(ACCEPT_LANGUAGE, &self.locale)
      .query(&request.params);
    if let Some(token) = self.session.token() {
      builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    let data = if bytes.is_empty() {
      Value::Null
    } else {
      match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) if !status.is_success() => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => return Err(e.into()),
      }
    };

    if status.is_success() {
      Ok(ApiResponse {
        status: status.as_u16(),
        data,
      })
    } else {
      debug!(status = status.as_u16(), path = %request.path, "api error response");
      Err(ApiError::from_response(status.as_u16(), &data))
    }
  }
}
