//! Scripted transport for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::ApiError;

/// Transport that answers from queued responses per `(method, path)` and
/// records every request. The last queued response for a route repeats.
/// Unknown routes answer 404.
#[derive(Default)]
pub struct MockTransport {
  routes: Mutex<HashMap<(Method, String), VecDeque<(u16, Value)>>>,
  requests: Mutex<Vec<ApiRequest>>,
  delay: Option<Duration>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Delay every response, so concurrent callers overlap.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  /// Queue a response for `method path`.
  pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
    self
      .routes
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .entry((method, path.to_string()))
      .or_default()
      .push_back((status, body));
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn last_request(&self) -> Option<ApiRequest> {
    self.requests().pop()
  }

  /// Number of requests sent to `method path`.
  pub fn calls(&self, method: Method, path: &str) -> usize {
    self
      .requests()
      .iter()
      .filter(|r| r.method == method && r.path == path)
      .count()
  }

  pub fn total_calls(&self) -> usize {
    self.requests().len()
  }

  fn next_response(&self, method: Method, path: &str) -> (u16, Value) {
    let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
    match routes.get_mut(&(method, path.to_string())) {
      Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or((404, Value::Null)),
      Some(queue) => queue.front().cloned().unwrap_or((404, Value::Null)),
      None => (404, serde_json::json!({ "message": format!("no route for {method} {path}") })),
    }
  }
}

#[async_trait]
impl Transport for MockTransport {
  async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
    let (method, path) = (request.method, request.path.clone());
    self
      .requests
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(request);

    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }

    let (status, data) = self.next_response(method, &path);
    if (200..300).contains(&status) {
      Ok(ApiResponse { status, data })
    } else {
      Err(ApiError::from_response(status, &data))
    }
  }
}
