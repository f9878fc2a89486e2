//! Expiry transition monitoring.
//!
//! Watches a user's subscription list and raises one-shot notifications when the
//! active/inactive boundary is crossed, or when the remaining time enters a
//! warning band.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use examgate::clock::SystemClock;
//! use examgate::monitor::{ExpiryMonitor, TracingNotificationSink};
//!
//! let subscriptions = store.subscriptions(&user_id).await?;
//! let handle = ExpiryMonitor::new(&user_id, subscriptions, Arc::new(SystemClock), Arc::new(TracingNotificationSink))
//!     .with_config(&config.monitor)
//!     .spawn();
//!
//! // After a purchase or a document change notification:
//! handle.push(store.subscriptions(&user_id).await?).await?;
//!
//! // When the session ends:
//! handle.shutdown().await?;
//! ```

pub mod notification;
pub mod state;
pub mod worker;

pub use notification::{
    ChannelNotificationSink, Delivered, NoOpNotificationSink, Notification, NotificationKind,
    NotificationSink, Severity, TracingNotificationSink, URGENT_DAYS,
};
pub use state::{EntitlementStatus, MonitorEvent, MonitorState, WarningTracker};
pub use worker::{ExpiryMonitor, MonitorHandle};
