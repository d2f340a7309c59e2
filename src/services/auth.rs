use serde::Serialize;

use crate::api::api_types::ApiLoginResponse;
use crate::api::types::{MessageResponse, OtpSent, User};
use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::Session;

#[derive(Debug, Serialize)]
struct SendOtpBody<'a> {
  phone: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyOtpBody<'a> {
  phone: &'a str,
  code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogoutBody<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  refresh_token: Option<&'a str>,
}

/// OTP sign-in. Token issuance and expiry are the API's business; this
/// only moves phone numbers, codes and tokens back and forth.
#[derive(Clone)]
pub struct AuthService {
  client: ApiClient,
}

impl AuthService {
  pub fn new(client: ApiClient) -> Self {
    Self { client }
  }

  /// `POST /auth/send-otp`. `phone` must already be cleaned.
  pub async fn send_otp(&self, phone: &str) -> Result<OtpSent, ApiError> {
    self.client.post("/auth/send-otp", &SendOtpBody { phone }).await
  }

  /// `POST /auth/verify-otp`, exchanging the code for a session.
  pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session, ApiError> {
    let response: ApiLoginResponse = self
      .client
      .post("/auth/verify-otp", &VerifyOtpBody { phone, code })
      .await?;
    response.into_session()
  }

  /// `GET /auth/me`
  pub async fn me(&self) -> Result<User, ApiError> {
    self.client.get("/auth/me", Vec::new()).await
  }

  /// `POST /auth/logout`, revoking the refresh token when there is one.
  pub async fn logout(&self, refresh_token: Option<&str>) -> Result<MessageResponse, ApiError> {
    let response: Option<MessageResponse> = self
      .client
      .post("/auth/logout", &LogoutBody { refresh_token })
      .await?;
    Ok(response.unwrap_or_default())
  }
}
