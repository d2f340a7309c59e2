//! Toast/notification collaborator.

use std::sync::Mutex;

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
  Success,
  Error,
}

/// Sink for user-facing notifications raised by mutations.
pub trait Notifier: Send + Sync {
  fn notify(&self, kind: NotifyKind, message: &str);
}

/// Notifier that writes to the log. Used by the CLI, which prints results
/// itself.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, kind: NotifyKind, message: &str) {
    match kind {
      NotifyKind::Success => info!(target: "vmdash::notify", "{}", message),
      NotifyKind::Error => warn!(target: "vmdash::notify", "{}", message),
    }
  }
}

/// Notifier that keeps every notification in memory.
#[derive(Default)]
pub struct RecordingNotifier {
  records: Mutex<Vec<(NotifyKind, String)>>,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot of everything notified so far, oldest first.
  pub fn records(&self) -> Vec<(NotifyKind, String)> {
    self
      .records
      .lock()
      .map(|r| r.clone())
      .unwrap_or_default()
  }

  pub fn count(&self, kind: NotifyKind) -> usize {
    self.records().iter().filter(|(k, _)| *k == kind).count()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, kind: NotifyKind, message: &str) {
    if let Ok(mut records) = self.records.lock() {
      records.push((kind, message.to_string()));
    }
  }
}
