//! Subscription fixtures for tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};

use crate::subscription::SubscriptionRecord;

/// A fixed reference instant, so fixtures are deterministic.
#[must_use]
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Builder for subscription records relative to a reference instant.
#[derive(Debug, Clone)]
pub struct SubscriptionFixture {
    now: DateTime<Utc>,
    record: SubscriptionRecord,
}

impl SubscriptionFixture {
    /// A 30-day "monthly" plan that started 30 days before `now` and ends at `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            record: SubscriptionRecord::new("monthly", now - Duration::days(30), now)
                .with_plan_name("Monthly")
                .with_price(499.0),
        }
    }

    pub fn plan(mut self, plan: &str, name: &str) -> Self {
        self.record.plan = Some(plan.to_string());
        self.record.plan_name = Some(name.to_string());
        self
    }

    /// End `by` after the reference instant (negative for the past).
    pub fn ends_in(mut self, by: Duration) -> Self {
        self.record.end_date = Some(self.now + by);
        self
    }

    pub fn superseded(mut self) -> Self {
        self.record.deactivate();
        self
    }

    pub fn features(mut self, features: &[&str]) -> Self {
        self.record.features = features.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn limit(mut self, name: &str, max: u64) -> Self {
        self.record.limits.insert(name.to_string(), max);
        self
    }

    pub fn build(self) -> SubscriptionRecord {
        self.record
    }
}

/// A list as stored in the sparse index-keyed legacy format.
#[must_use]
pub fn sparse_map(entries: &[(u64, &SubscriptionRecord)]) -> Value {
    let mut map = serde_json::Map::new();
    for (index, record) in entries {
        map.insert(
            index.to_string(),
            serde_json::to_value(record).unwrap_or(Value::Null),
        );
    }
    Value::Object(map)
}

/// A record with its end date in the `{_seconds, _nanoseconds}` shape.
#[must_use]
pub fn with_epoch_object_dates(record: &SubscriptionRecord) -> Value {
    let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
    if let (Some(end), Some(obj)) = (record.end_date, value.as_object_mut()) {
        obj.insert(
            "endDate".to_string(),
            json!({ "_seconds": end.timestamp(), "_nanoseconds": end.timestamp_subsec_nanos() }),
        );
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::normalize_subscriptions;

    #[test]
    fn test_fixture_builder() {
        let now = reference_now();
        let record = SubscriptionFixture::at(now)
            .plan("jee_pro", "JEE Pro")
            .ends_in(Duration::days(3))
            .features(&["mock_tests"])
            .limit("tests", 10)
            .build();

        assert!(record.is_currently_active(now));
        assert_eq!(record.plan_name.as_deref(), Some("JEE Pro"));
        assert_eq!(record.limits.get("tests"), Some(&10));
        assert!(!SubscriptionFixture::at(now).superseded().ends_in(Duration::days(1)).build().is_currently_active(now));
    }

    #[test]
    fn test_legacy_shapes_decode_back() {
        let now = reference_now();
        let a = SubscriptionFixture::at(now).plan("a", "A").build();
        let b = SubscriptionFixture::at(now).plan("b", "B").ends_in(Duration::hours(5)).build();

        let decoded = normalize_subscriptions(&sparse_map(&[(4, &b), (1, &a)]));
        assert_eq!(decoded, vec![a, b.clone()]);

        let epoch = with_epoch_object_dates(&b);
        assert!(epoch["endDate"]["_seconds"].is_i64());
        assert_eq!(normalize_subscriptions(&epoch)[0].end_date, b.end_date);
    }
}
