//! User-facing notifications raised by the expiry monitor, and where they go.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::subscription::TimeRemaining;

/// Day count at or below which an expiring-soon notice is a warning rather than info.
pub const URGENT_DAYS: u64 = 3;

/// Which boundary or band a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The active subscription just lapsed.
    Expired,
    /// Less than a day remains.
    ExpiringToday,
    /// Seven or fewer days remain.
    ExpiringSoon,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::ExpiringToday => "expiring_today",
            Self::ExpiringSoon => "expiring_soon",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A formatted message plus severity, ready for a toast or alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn expired() -> Self {
        Self {
            kind: NotificationKind::Expired,
            severity: Severity::Error,
            message: "Your subscription has expired. Renew your plan to keep access to premium features."
                .to_string(),
        }
    }

    #[must_use]
    pub fn expiring_today(remaining: &TimeRemaining) -> Self {
        Self {
            kind: NotificationKind::ExpiringToday,
            severity: Severity::Warning,
            message: format!("Your subscription expires today ({} left).", label(remaining)),
        }
    }

    #[must_use]
    pub fn expiring_soon(remaining: &TimeRemaining) -> Self {
        let severity = if remaining.days <= URGENT_DAYS {
            Severity::Warning
        } else {
            Severity::Info
        };
        Self {
            kind: NotificationKind::ExpiringSoon,
            severity,
            message: format!("Your subscription expires in {}.", label(remaining)),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

fn label(remaining: &TimeRemaining) -> String {
    if remaining.is_zero() {
        "less than a minute".to_string()
    } else {
        remaining.to_string()
    }
}

/// Destination for monitor notifications.
///
/// Implementations should not fail loudly; a lost toast must never stop the monitor.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: &str, notification: &Notification);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn notify(&self, _user_id: &str, _notification: &Notification) {}
}

/// Sink that logs through `tracing` at a level matching the severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, user_id: &str, notification: &Notification) {
        match notification.severity {
            Severity::Info => tracing::info!(
                target: "examgate::notify",
                user_id = %user_id,
                kind = %notification.kind,
                "{}", notification.message
            ),
            Severity::Warning => tracing::warn!(
                target: "examgate::notify",
                user_id = %user_id,
                kind = %notification.kind,
                "{}", notification.message
            ),
            Severity::Error => tracing::error!(
                target: "examgate::notify",
                user_id = %user_id,
                kind = %notification.kind,
                "{}", notification.message
            ),
        }
    }
}

/// A notification addressed to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivered {
    pub user_id: String,
    pub notification: Notification,
}

/// Sink that forwards notifications to a channel, e.g. a websocket fan-out task.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    tx: mpsc::UnboundedSender<Delivered>,
}

impl ChannelNotificationSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivered>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelNotificationSink {
    async fn notify(&self, user_id: &str, notification: &Notification) {
        let delivered = Delivered {
            user_id: user_id.to_string(),
            notification: notification.clone(),
        };
        if self.tx.send(delivered).is_err() {
            tracing::debug!(
                target: "examgate::notify",
                user_id = %user_id,
                "Notification receiver dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remaining(days: u64, hours: u64, minutes: u64) -> TimeRemaining {
        TimeRemaining {
            days,
            hours,
            minutes,
            is_expiring_today: days == 0,
            is_expiring_soon: days <= 7,
        }
    }

    #[test]
    fn test_expiring_soon_severity_bands() {
        assert_eq!(Notification::expiring_soon(&remaining(6, 0, 0)).severity, Severity::Info);
        assert_eq!(Notification::expiring_soon(&remaining(3, 2, 0)).severity, Severity::Warning);
        assert_eq!(Notification::expiring_soon(&remaining(0, 2, 0)).severity, Severity::Warning);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Notification::expiring_soon(&remaining(5, 1, 0)).message,
            "Your subscription expires in 5 days, 1 hour."
        );
        assert_eq!(
            Notification::expiring_today(&remaining(0, 2, 15)).message,
            "Your subscription expires today (2 hours, 15 minutes left)."
        );
        assert_eq!(
            Notification::expiring_today(&remaining(0, 0, 0)).message,
            "Your subscription expires today (less than a minute left)."
        );
        assert_eq!(Notification::expired().severity, Severity::Error);
    }

    #[test]
    fn test_display() {
        let shown = Notification::expired().to_string();
        assert!(shown.starts_with("[expired] "));
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = ChannelNotificationSink::new();
        sink.notify("u_1", &Notification::expired()).await;

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.user_id, "u_1");
        assert_eq!(delivered.notification.kind, NotificationKind::Expired);
    }

    #[tokio::test]
    async fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelNotificationSink::new();
        drop(rx);
        sink.notify("u_1", &Notification::expired()).await;
    }

    #[tokio::test]
    async fn test_noop_and_tracing_sinks() {
        NoOpNotificationSink.notify("u_1", &Notification::expired()).await;
        TracingNotificationSink
            .notify("u_1", &Notification::expiring_soon(&remaining(4, 0, 0)))
            .await;
    }
}
