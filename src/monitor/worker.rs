//! Background expiry monitor.
//!
//! One monitor runs per user session. It re-checks the local subscription list on
//! a fixed interval and whenever an update is pushed, and forwards the resulting
//! notifications to a [`NotificationSink`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::notification::NotificationSink;
use super::state::{MonitorEvent, MonitorState};
use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::{ExamgateError, Result};
use crate::subscription::SubscriptionRecord;

/// Expiry monitor for a single user.
pub struct ExpiryMonitor {
    user_id: String,
    state: MonitorState,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    poll_interval: Option<Duration>,
    update_buffer: usize,
}

impl ExpiryMonitor {
    /// Create a monitor using the default [`MonitorConfig`].
    pub fn new(
        user_id: impl Into<String>,
        subscriptions: Vec<SubscriptionRecord>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            state: MonitorState::new(subscriptions),
            clock,
            sink,
            poll_interval: None,
            update_buffer: 1,
        }
        .with_config(&MonitorConfig::default())
    }

    /// Apply poll cadence and buffer size from config.
    ///
    /// A disabled config turns off polling; pushed updates are still handled.
    #[must_use]
    pub fn with_config(mut self, config: &MonitorConfig) -> Self {
        self.poll_interval = (config.enabled && config.poll_interval_secs > 0)
            .then(|| config.poll_interval());
        self.update_buffer = config.update_buffer.max(1);
        self
    }

    /// Override the poll cadence. A zero duration disables polling.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Start the monitor on the current tokio runtime.
    pub fn spawn(self) -> MonitorHandle {
        let (updates_tx, updates_rx) = mpsc::channel(self.update_buffer);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let user_id = self.user_id.clone();

        let task = tokio::spawn(self.run(updates_rx, shutdown_rx));

        MonitorHandle {
            user_id,
            updates_tx,
            shutdown_tx,
            task,
        }
    }

    async fn run(
        mut self,
        mut updates: mpsc::Receiver<Vec<SubscriptionRecord>>,
        mut shutdown: mpsc::Receiver<()>,
    ) -> Vec<SubscriptionRecord> {
        tracing::info!(
            target: "examgate::monitor",
            user_id = %self.user_id,
            poll_interval_secs = ?self.poll_interval.map(|d| d.as_secs()),
            "Expiry monitor started"
        );

        // Initial resolution establishes ACTIVE or INACTIVE.
        self.handle(MonitorEvent::Tick).await;

        let polling = self.poll_interval.is_some();
        let period = self.poll_interval.unwrap_or(Duration::from_secs(60));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::debug!(target: "examgate::monitor", user_id = %self.user_id, "Shutdown requested");
                    break;
                }
                update = updates.recv() => match update {
                    Some(subscriptions) => self.handle(MonitorEvent::Replace(subscriptions)).await,
                    None => break,
                },
                _ = ticker.tick(), if polling => {
                    self.handle(MonitorEvent::Tick).await;
                }
            }
        }

        tracing::info!(target: "examgate::monitor", user_id = %self.user_id, "Expiry monitor stopped");
        self.state.into_subscriptions()
    }

    async fn handle(&mut self, event: MonitorEvent) {
        let pushed = matches!(event, MonitorEvent::Replace(_));
        let before = self.state.status();
        let notifications = self.state.apply(event, self.clock.now());
        let after = self.state.status();

        if before != after {
            tracing::info!(
                target: "examgate::monitor",
                user_id = %self.user_id,
                from = ?before,
                to = ?after,
                pushed,
                "Subscription status changed"
            );
        }

        for notification in &notifications {
            self.sink.notify(&self.user_id, notification).await;
        }
    }
}

/// Handle to a running [`ExpiryMonitor`].
///
/// Dropping the handle also stops the monitor.
pub struct MonitorHandle {
    user_id: String,
    updates_tx: mpsc::Sender<Vec<SubscriptionRecord>>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<Vec<SubscriptionRecord>>,
}

impl MonitorHandle {
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Push a full replacement of the user's subscription list.
    pub async fn push(&self, subscriptions: Vec<SubscriptionRecord>) -> Result<()> {
        self.updates_tx.send(subscriptions).await.map_err(|_| {
            ExamgateError::service_unavailable(format!("expiry monitor for {} has stopped", self.user_id))
        })
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling and return the monitor's final local subscription list.
    pub async fn shutdown(self) -> Result<Vec<SubscriptionRecord>> {
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| ExamgateError::internal(format!("expiry monitor task failed: {}", e)))
    }
}
