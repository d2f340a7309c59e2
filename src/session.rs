//! Injectable auth/session store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::api::types::User;

/// Tokens and the signed-in user, as issued by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub access_token: String,
  #[serde(default)]
  pub refresh_token: Option<String>,
  #[serde(default)]
  pub user: Option<User>,
}

impl Session {
  pub fn from_token(access_token: impl Into<String>) -> Self {
    Self {
      access_token: access_token.into(),
      refresh_token: None,
      user: None,
    }
  }
}

/// Holds the current session and notifies watchers on every change.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
  tx: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionStore {
  fn default() -> Self {
    Self::new()
  }
}

impl SessionStore {
  /// Signed-out store.
  pub fn new() -> Self {
    let (tx, _) = watch::channel(None);
    Self { tx: Arc::new(tx) }
  }

  pub fn with_session(session: Session) -> Self {
    let store = Self::new();
    store.set(session);
    store
  }

  pub fn current(&self) -> Option<Session> {
    self.tx.borrow().clone()
  }

  pub fn token(&self) -> Option<String> {
    self.tx.borrow().as_ref().map(|s| s.access_token.clone())
  }

  pub fn is_authenticated(&self) -> bool {
    self.tx.borrow().is_some()
  }

  pub fn set(&self, session: Session) {
    self.tx.send_replace(Some(session));
  }

  /// Replace the signed-in user, keeping the tokens.
  pub fn set_user(&self, user: User) {
    self.tx.send_if_modified(|current| match current {
      Some(session) => {
        session.user = Some(user);
        true
      }
      None => false,
    });
  }

  /// Drop the session. Watchers see the store as signed out.
  pub fn clear(&self) {
    self.tx.send_replace(None);
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
    self.tx.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_and_clear() {
    let store = SessionStore::new();
    assert!(!store.is_authenticated());

    store.set(Session::from_token("abc"));
    assert_eq!(store.token().as_deref(), Some("abc"));

    store.clear();
    assert!(!store.is_authenticated());
    assert!(store.token().is_none());
  }

  #[test]
  fn test_set_user_requires_session() {
    let store = SessionStore::new();
    store.set_user(User::named("u1", "Sara"));
    assert!(store.current().is_none());

    store.set(Session::from_token("abc"));
    store.set_user(User::named("u1", "Sara"));
    assert_eq!(store.current().unwrap().user.unwrap().name, "Sara");
  }

  #[tokio::test]
  async fn test_watchers_see_sign_out() {
    let store = SessionStore::with_session(Session::from_token("abc"));
    let mut rx = store.subscribe();

    store.clear();
    rx.changed().await.unwrap();
    assert!(rx.borrow().is_none());
  }
}
