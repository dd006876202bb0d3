//! Outward notification side effect.

use log::info;

const DETECTED_TITLE: &str = "New Gmail account detected";
const FALLBACK_MESSAGE: &str = "New account detected";

/// User-facing notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    /// Notification for a merge; `label` is the most recently affected email.
    pub fn identity_detected(label: Option<&str>) -> Self {
        Self {
            title: DETECTED_TITLE.to_string(),
            message: label.unwrap_or(FALLBACK_MESSAGE).to_string(),
        }
    }
}

/// Host notification display capability.
///
/// Display failures belong to the host and never fail a core operation.
pub trait Notifier {
    fn notify(&self, notification: &Notification);
}

/// Notifier that only records a metadata log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        info!(
            "event=notify module=service status=ok title_len={} message_len={}",
            notification.title.len(),
            notification.message.len()
        );
    }
}
