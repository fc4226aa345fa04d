//! Transient user notifications
//!
//! Failed requests surface as a short notice rather than an error the
//! caller must handle. The CLI logs them; tests record them.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

/// Receiver of transient notices
pub trait Notifier: Send + Sync {
    /// Show `message` to the user
    fn notify(&self, message: &str);
}

/// Emits notices as `warn` events on `mircs::api`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!(target: "mircs::api", "{}", message);
    }
}

/// Collects notices for inspection
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Drain the received notices
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_shares_messages() {
        let notifier = RecordingNotifier::new();
        let handle: Arc<dyn Notifier> = Arc::new(notifier.clone());
        handle.notify("Sign in failed");
        assert_eq!(notifier.messages(), vec!["Sign in failed"]);
        assert_eq!(notifier.take().len(), 1);
        assert!(notifier.messages().is_empty());
    }
}
