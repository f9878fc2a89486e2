//! Expiry transition reducer.
//!
//! Poll ticks and pushed updates both land in [`MonitorState::apply`]. Pushes
//! replace the whole subscription list and ticks only re-evaluate it, so the two
//! sources need no ordering between them: whichever arrives last wins and both
//! converge on the same resolved state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::notification::Notification;
use crate::subscription::{SubscriptionRecord, TimeRemaining, resolve_active, time_remaining};

/// Whether the user currently holds an active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    Active,
    Inactive,
}

/// Input to the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Periodic re-check of the current list.
    Tick,
    /// Externally pushed replacement of the full list.
    Replace(Vec<SubscriptionRecord>),
}

/// De-duplicates warning notifications.
///
/// Each tier remembers the banded value it last fired for and only fires again
/// when that value changes. The expiring-today tier is banded by remaining hours,
/// the expiring-soon tier by remaining days. The tiers are independent, so both
/// may fire on the same check. Bands belong to the record being watched and are
/// forgotten when a different record becomes the active one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningTracker {
    watching: Option<WatchedRecord>,
    today_key: Option<u64>,
    soon_key: Option<u64>,
}

/// Identity of the active record the bands were fired for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WatchedRecord {
    plan: Option<String>,
    end_date: Option<DateTime<Utc>>,
}

impl WatchedRecord {
    fn of(record: &SubscriptionRecord) -> Self {
        Self {
            plan: record.plan.clone(),
            end_date: record.end_date,
        }
    }
}

impl WarningTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `record`, forgetting fired bands if it is not the one already watched.
    pub fn watch(&mut self, record: &SubscriptionRecord) {
        let next = WatchedRecord::of(record);
        if self.watching.as_ref() != Some(&next) {
            self.reset();
            self.watching = Some(next);
        }
    }

    /// Warnings due for `remaining` that have not fired for its band yet.
    pub fn check(&mut self, remaining: &TimeRemaining) -> Vec<Notification> {
        let mut due = Vec::new();

        if remaining.is_expiring_today && self.today_key != Some(remaining.hours) {
            self.today_key = Some(remaining.hours);
            due.push(Notification::expiring_today(remaining));
        }

        if remaining.is_expiring_soon && self.soon_key != Some(remaining.days) {
            self.soon_key = Some(remaining.days);
            due.push(Notification::expiring_soon(remaining));
        }

        due
    }

    /// Forget fired bands and the watched record.
    pub fn reset(&mut self) {
        self.watching = None;
        self.today_key = None;
        self.soon_key = None;
    }
}

/// Per-session monitor state.
#[derive(Debug, Clone)]
pub struct MonitorState {
    subscriptions: Vec<SubscriptionRecord>,
    status: Option<EntitlementStatus>,
    warnings: WarningTracker,
}

impl MonitorState {
    /// State before the first evaluation. The initial status comes from the
    /// first event applied.
    #[must_use]
    pub fn new(subscriptions: Vec<SubscriptionRecord>) -> Self {
        Self {
            subscriptions,
            status: None,
            warnings: WarningTracker::new(),
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<EntitlementStatus> {
        self.status
    }

    #[must_use]
    pub fn subscriptions(&self) -> &[SubscriptionRecord] {
        &self.subscriptions
    }

    #[must_use]
    pub fn into_subscriptions(self) -> Vec<SubscriptionRecord> {
        self.subscriptions
    }

    /// Apply one event at `now`, returning the notifications it raises.
    pub fn apply(&mut self, event: MonitorEvent, now: DateTime<Utc>) -> Vec<Notification> {
        if let MonitorEvent::Replace(subscriptions) = event {
            self.subscriptions = subscriptions;
        }
        self.evaluate(now)
    }

    fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        let active = resolve_active(&self.subscriptions, now);
        if let Some(record) = active {
            self.warnings.watch(record);
        }
        let remaining = active.map(|r| time_remaining(r, now));

        match (self.status, remaining) {
            (Some(EntitlementStatus::Active), None) => {
                self.status = Some(EntitlementStatus::Inactive);
                for record in &mut self.subscriptions {
                    record.deactivate();
                }
                self.warnings.reset();
                vec![Notification::expired()]
            }
            (None, None) | (Some(EntitlementStatus::Inactive), None) => {
                self.status = Some(EntitlementStatus::Inactive);
                Vec::new()
            }
            (_, Some(remaining)) => {
                self.status = Some(EntitlementStatus::Active);
                self.warnings.check(&remaining)
            }
        }
    }
}
