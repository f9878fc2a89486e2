//! Active-subscription resolution and remaining-time arithmetic.
//!
//! All functions here are pure: the result depends only on the input list and the
//! `now` passed in. They never fail; malformed records are simply not active.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::SubscriptionRecord;
use crate::clock::{Clock, SystemClock};

/// Day count at or below which a subscription is "expiring soon".
pub const EXPIRING_SOON_DAYS: u64 = 7;

const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// First record in list order that is currently active.
#[must_use]
pub fn resolve_active(
    subscriptions: &[SubscriptionRecord],
    now: DateTime<Utc>,
) -> Option<&SubscriptionRecord> {
    subscriptions.iter().find(|s| s.is_currently_active(now))
}

/// Whether any record is currently active.
#[must_use]
pub fn is_active(subscriptions: &[SubscriptionRecord], now: DateTime<Utc>) -> bool {
    resolve_active(subscriptions, now).is_some()
}

/// Time left on a subscription, floored to whole units.
///
/// Calendar-naive: the difference is plain millisecond subtraction, with no
/// time zone or DST adjustment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeRemaining {
    pub days: u64,
    /// Hours past the last whole day (0..24).
    pub hours: u64,
    /// Minutes past the last whole hour (0..60).
    pub minutes: u64,
    /// Less than a day left.
    pub is_expiring_today: bool,
    /// Seven or fewer whole days left. Includes the expiring-today case.
    pub is_expiring_soon: bool,
}

impl TimeRemaining {
    /// Nothing left.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    fn from_millis(ms: i64) -> Self {
        if ms <= 0 {
            return Self::none();
        }

        let days = (ms / MS_PER_DAY) as u64;
        let hours = ((ms % MS_PER_DAY) / MS_PER_HOUR) as u64;
        let minutes = ((ms % MS_PER_HOUR) / MS_PER_MINUTE) as u64;

        Self {
            days,
            hours,
            minutes,
            is_expiring_today: days == 0,
            is_expiring_soon: days <= EXPIRING_SOON_DAYS,
        }
    }

    /// All displayed components are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }

    /// Components as a tuple, for ordering comparisons.
    #[must_use]
    pub fn as_tuple(&self) -> (u64, u64, u64) {
        (self.days, self.hours, self.minutes)
    }
}

/// Renders "3 days, 4 hours", "2 hours, 15 minutes", "45 minutes" or "Expired".
///
/// Minutes are only shown when no whole day remains.
impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if self.days > 0 {
            parts.push(unit(self.days, "day"));
        }
        if self.hours > 0 {
            parts.push(unit(self.hours, "hour"));
        }
        if self.days == 0 && self.minutes > 0 {
            parts.push(unit(self.minutes, "minute"));
        }

        if parts.is_empty() {
            f.write_str("Expired")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

fn unit(count: u64, name: &str) -> String {
    if count == 1 {
        format!("1 {}", name)
    } else {
        format!("{} {}s", count, name)
    }
}

/// Time left until `subscription.end_date`.
///
/// The caller is expected to have resolved the record as active first; this does
/// not re-check the `is_active` flag. A missing or past end date yields
/// [`TimeRemaining::none`].
#[must_use]
pub fn time_remaining(subscription: &SubscriptionRecord, now: DateTime<Utc>) -> TimeRemaining {
    match subscription.end_date {
        Some(end) => TimeRemaining::from_millis((end - now).num_milliseconds()),
        None => TimeRemaining::none(),
    }
}

/// Human-readable [`time_remaining`].
#[must_use]
pub fn format_time_remaining(subscription: &SubscriptionRecord, now: DateTime<Utc>) -> String {
    time_remaining(subscription, now).to_string()
}

/// The resolver operations bound to a clock.
#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    clock: Arc<dyn Clock>,
}

impl EntitlementResolver {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Resolver backed by the system clock.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    #[must_use]
    pub fn resolve_active<'a>(
        &self,
        subscriptions: &'a [SubscriptionRecord],
    ) -> Option<&'a SubscriptionRecord> {
        resolve_active(subscriptions, self.now())
    }

    #[must_use]
    pub fn is_active(&self, subscriptions: &[SubscriptionRecord]) -> bool {
        is_active(subscriptions, self.now())
    }

    #[must_use]
    pub fn time_remaining(&self, subscription: &SubscriptionRecord) -> TimeRemaining {
        time_remaining(subscription, self.now())
    }

    #[must_use]
    pub fn format_time_remaining(&self, subscription: &SubscriptionRecord) -> String {
        format_time_remaining(subscription, self.now())
    }
}

impl Default for EntitlementResolver {
    fn default() -> Self {
        Self::system()
    }
}
