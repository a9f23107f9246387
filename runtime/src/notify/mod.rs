//! Alert formatting and dispatch.
//!
//! The [`Notifier`] renders a fixed template per [`NotificationKind`] and hands
//! the text to a [`NotificationSink`]. Delivery failures are logged and
//! swallowed so a flaky messaging API never interrupts the poll loop.

pub mod telegram;

use crate::error::DeliveryError;
use crate::target::Target;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Marker disappeared.
    Changed,
    /// Marker came back.
    Restored,
    /// The check itself failed.
    Error,
}

/// Render the alert text for a target.
///
/// `detail` is only used for [`NotificationKind::Error`].
pub fn render(kind: NotificationKind, target: &Target, detail: Option<&str>) -> String {
    let Target { name, url, marker } = target;
    match kind {
        NotificationKind::Changed => format!(
            "🔄 \"{name}\" - Site has changed!\nValue \"{marker}\" is not present anymore.\n{url}"
        ),
        NotificationKind::Restored => {
            format!("✅ \"{name}\" - Value restored!\nValue \"{marker}\" is present again.\n{url}")
        }
        NotificationKind::Error => {
            let detail = detail.unwrap_or("unknown error");
            format!("❌ Error checking \"{name}\":\n{url}\nError: {detail}")
        }
    }
}

/// External delivery channel for rendered alerts.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one message. Must report failure instead of panicking.
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Formats and dispatches alerts.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Render and deliver an alert. Returns whether delivery succeeded.
    pub async fn notify(&self, kind: NotificationKind, target: &Target, detail: Option<&str>) -> bool {
        let text = render(kind, target, detail);
        match self.sink.send(&text).await {
            Ok(()) => {
                debug!(target_name = %target.name, ?kind, "notification delivered");
                true
            }
            Err(e) => {
                error!(target_name = %target.name, ?kind, "failed to send notification: {e}");
                false
            }
        }
    }
}
