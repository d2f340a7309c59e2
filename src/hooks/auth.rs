use tracing::{info, warn};

use super::HookContext;
use crate::api::cache::me_key;
use crate::api::types::{MessageResponse, OtpSent, User};
use crate::error::ApiError;
use crate::mutation::CacheEffects;
use crate::query::Query;
use crate::services::AuthService;
use crate::session::Session;
use crate::validation::{clean_otp, clean_phone, validate_otp, validate_phone};

#[derive(Clone)]
pub struct AuthHooks {
  ctx: HookContext,
  service: AuthService,
}

impl AuthHooks {
  pub fn new(ctx: HookContext, service: AuthService) -> Self {
    Self { ctx, service }
  }

  /// Request a sign-in code. The number is cleaned first; a number that is
  /// still not a mobile number fails without a request.
  pub async fn send_otp(&self, phone: &str) -> Result<OtpSent, ApiError> {
    let phone = clean_phone(phone);
    if !validate_phone(&phone) {
      return Err(self.reject("auth.send_otp", "phone", "validation.phone"));
    }

    self
      .ctx
      .mutations()
      .run(
        "auth.send_otp",
        self.service.send_otp(&phone),
        Some(self.ctx.t("auth.otp_sent", &[("phone", phone.as_str())])),
        |_| CacheEffects::new(),
      )
      .await
  }

  /// Exchange a code for a session. The session store is set and the
  /// signed-in user, when the response carries one, is written to
  /// `["auth", "me"]`.
  pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session, ApiError> {
    let phone = clean_phone(phone);
    let code = clean_otp(code);
    if !validate_phone(&phone) {
      return Err(self.reject("auth.verify_otp", "phone", "validation.phone"));
    }
    if !validate_otp(&code) {
      return Err(self.reject("auth.verify_otp", "code", "validation.otp"));
    }

    let session = self
      .ctx
      .mutations()
      .run(
        "auth.verify_otp",
        self.service.verify_otp(&phone, &code),
        Some(self.ctx.t("auth.signed_in", &[])),
        |session: &Session| match &session.user {
          Some(user) => CacheEffects::new().set(me_key(), user.clone()),
          None => CacheEffects::new().invalidate(me_key()),
        },
      )
      .await?;
    self.ctx.session().set(session.clone());
    Ok(session)
  }

  /// The signed-in user. Enabled only while the session holds a token:
  /// a handle made while signed out starts fetching once a session is set,
  /// and goes idle again on sign-out.
  pub fn me(&self) -> Query<User> {
    let service = self.service.clone();
    let session = self.ctx.session().clone();
    let gate = session.clone();
    self
      .ctx
      .query(me_key(), move || {
        let service = service.clone();
        let session = session.clone();
        async move {
          let user = service.me().await?;
          session.set_user(user.clone());
          Ok(user)
        }
      })
      .enabled_when(move || gate.is_authenticated())
  }

  /// Sign out. The local session and the whole cache are cleared whether
  /// or not the API accepts the request; its error, if any, is still
  /// returned and notified.
  pub async fn logout(&self) -> Result<MessageResponse, ApiError> {
    let refresh_token = self.ctx.session().current().and_then(|s| s.refresh_token);
    let result = self.service.logout(refresh_token.as_deref()).await;

    self.ctx.session().clear();
    self.ctx.cache().reset();

    match result {
      Ok(response) => {
        info!("signed out");
        self.ctx.mutations().notify_success(&self.ctx.t("auth.signed_out", &[]));
        Ok(response)
      }
      Err(err) => {
        warn!(error = %err, "remote logout failed, local session cleared anyway");
        self.ctx.mutations().report_error("auth.logout", &err);
        Err(err)
      }
    }
  }

  fn reject(&self, label: &str, field: &str, message_key: &str) -> ApiError {
    let err = ApiError::invalid_field(field, self.ctx.t(message_key, &[]));
    self.ctx.mutations().report_error(label, &err);
    err
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::api::types::ListFilters;
  use crate::api::Method;
  use crate::hooks::test_util::{harness, harness_with, Harness};
  use crate::hooks::ResourceHooks;
  use crate::notify::NotifyKind;
  use crate::services::{CrudService, Plans};
  use crate::test_support::MockTransport;

  fn auth(h: &Harness) -> AuthHooks {
    AuthHooks::new(h.ctx.clone(), AuthService::new(h.client.clone()))
  }

  #[tokio::test]
  async fn test_send_otp_cleans_persian_number() {
    let h = harness();
    h.transport.respond(Method::Post, "/auth/send-otp", 200, json!({ "message": "sent", "expiresIn": 120 }));

    let sent = auth(&h).send_otp("۰۹۱۲ ۳۴۵ ۶۷۸۹").await.unwrap();
    assert_eq!(sent.expires_in, Some(120));
    assert_eq!(
      h.transport.last_request().unwrap().body,
      Some(json!({ "phone": "09123456789" }))
    );
  }

  #[tokio::test]
  async fn test_invalid_phone_is_rejected_locally() {
    let h = harness();

    let err = auth(&h).send_otp("123").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
    assert_eq!(h.transport.total_calls(), 0);
    assert_eq!(h.notifier.count(NotifyKind::Error), 1);
  }

  #[tokio::test]
  async fn test_verify_otp_sets_session_and_me() {
    let h = harness();
    h.transport.respond(
      Method::Post,
      "/auth/verify-otp",
      200,
      json!({ "accessToken": "tok", "user": { "id": "u1", "name": "Sara" } }),
    );
    let auth = auth(&h);

    let mut me = auth.me();
    assert!(!me.is_enabled());

    auth.verify_otp("09123456789", "۱۲۳۴").await.unwrap();
    assert_eq!(h.ctx.session().token().as_deref(), Some("tok"));

    // The signed-in user is already cached, so no /auth/me request is needed
    assert!(me.poll());
    assert_eq!(me.data().map(|u| u.name.as_str()), Some("Sara"));
    let mut fresh = auth.me();
    assert!(fresh.is_enabled());
    fresh.fetch();
    assert!(fresh.is_success());
    assert_eq!(h.transport.calls(Method::Get, "/auth/me"), 0);
  }

  #[tokio::test]
  async fn test_me_is_disabled_without_session() {
    let h = harness();
    let mut me = auth(&h).me();
    me.fetch();
    tokio::task::yield_now().await;
    assert!(!me.poll());
    assert_eq!(h.transport.total_calls(), 0);
  }

  #[tokio::test]
  async fn test_logout_clears_session_even_when_remote_fails() {
    let h = harness();
    h.ctx.session().set(Session::from_token("tok"));
    h.transport.respond(Method::Get, "/plans", 200, json!({ "results": [{ "id": "p1" }] }));
    h.transport.respond(Method::Post, "/auth/logout", 500, json!({ "message": "down" }));

    let plans = ResourceHooks::new(h.ctx.clone(), CrudService::<Plans>::new(h.client.clone()));
    let mut list = plans.list(ListFilters::default());
    list.load().await;

    let err = auth(&h).logout().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(!h.ctx.session().is_authenticated());
    assert!(h.ctx.cache().store().is_empty());
    assert!(list.poll());
    assert!(list.data().is_none());
    assert_eq!(
      h.notifier.records(),
      vec![(NotifyKind::Error, "down".to_string())]
    );
  }

  #[tokio::test]
  async fn test_logout_sends_refresh_token() {
    let h = harness();
    h.ctx.session().set(Session {
      access_token: "tok".into(),
      refresh_token: Some("ref".into()),
      user: None,
    });
    h.transport.respond(Method::Post, "/auth/logout", 200, json!({ "message": "bye" }));

    let response = auth(&h).logout().await.unwrap();
    assert_eq!(response.message, "bye");
    assert_eq!(
      h.transport.last_request().unwrap().body,
      Some(json!({ "refreshToken": "ref" }))
    );
    assert!(!h.ctx.session().is_authenticated());
    assert_eq!(h.notifier.count(NotifyKind::Success), 1);
  }

  #[tokio::test]
  async fn test_me_follows_sign_in_and_sign_out() {
    let h = harness();
    h.transport.respond(Method::Get, "/auth/me", 200, json!({ "id": "u1", "name": "Sara" }));
    h.transport.respond(Method::Post, "/auth/logout", 200, json!({ "message": "bye" }));
    let auth = auth(&h);

    let mut me = auth.me();
    assert!(!me.poll());

    h.ctx.session().set(Session::from_token("tok"));
    assert!(me.poll());
    assert!(me.is_loading());
    let result = me.settle().await;
    assert_eq!(result.data.map(|u| u.name), Some("Sara".to_string()));
    assert_eq!(
      h.ctx.session().current().and_then(|s| s.user).map(|u| u.name),
      Some("Sara".to_string())
    );

    auth.logout().await.unwrap();
    assert!(me.poll());
    assert!(!me.is_enabled());
    assert!(me.data().is_none());

    me.fetch();
    me.refetch();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(!me.poll());
    assert_eq!(h.transport.calls(Method::Get, "/auth/me"), 1);
  }

  #[tokio::test]
  async fn test_logout_during_fetch_keeps_signed_in_data_out() {
    let h = harness_with(MockTransport::new().with_delay(std::time::Duration::from_millis(20)));
    h.ctx.session().set(Session::from_token("tok"));
    h.transport.respond(Method::Get, "/plans", 200, json!({ "results": [{ "id": "p1" }] }));
    h.transport.respond(Method::Get, "/plans", 200, json!({ "results": [{ "id": "p2" }] }));
    h.transport.respond(Method::Post, "/auth/logout", 200, json!({ "message": "bye" }));
    let plans = ResourceHooks::new(h.ctx.clone(), CrudService::<Plans>::new(h.client.clone()));

    let logout = {
      let auth = auth(&h);
      tokio::spawn(async move { auth.logout().await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let mut list = plans.list(ListFilters::default());
    list.fetch();

    logout.await.unwrap().unwrap();
    // Let the request made before sign-out finish
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert!(h.ctx.cache().store().is_empty());
    list.poll();
    assert!(list.data().is_none());
    drop(list);
    assert!(h.ctx.cache().store().is_empty());

    let mut again = plans.list(ListFilters::default());
    let result = again.load().await;
    assert_eq!(result.data.unwrap().results[0].id, "p2");
    assert_eq!(h.transport.calls(Method::Get, "/plans"), 2);
  }
}
