//! Entitlements and feature gating.
//!
//! Feature access and usage caps come from the plan snapshot on the currently
//! active subscription record. When no record is active the user is on the free
//! tier: no premium features, and every capped resource is at its limit.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::error::Result;
use crate::subscription::{
    EntitlementResolver, SubscriptionRecord, SubscriptionStore, TimeRemaining, resolve_active,
    time_remaining,
};

/// Label shown when no paid plan is active.
pub const FREE_TIER_LABEL: &str = "Free tier";

/// Entitlements derived from a user's subscriptions at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct Entitlements {
    /// Whether a paid subscription is currently active.
    pub is_active: bool,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    /// Features granted by the active plan.
    pub features: Vec<String>,
    /// Usage caps granted by the active plan.
    pub limits: BTreeMap<String, u64>,
    pub ends_at: Option<DateTime<Utc>>,
    pub remaining: Option<TimeRemaining>,
}

impl Entitlements {
    /// Free-tier entitlements.
    pub fn free() -> Self {
        Self {
            is_active: false,
            plan_id: None,
            plan_name: None,
            features: Vec::new(),
            limits: BTreeMap::new(),
            ends_at: None,
            remaining: None,
        }
    }

    /// Entitlements granted by `record`, which the caller has resolved as active.
    pub fn from_active(record: &SubscriptionRecord, now: DateTime<Utc>) -> Self {
        Self {
            is_active: true,
            plan_id: record.plan.clone(),
            plan_name: record.plan_name.clone(),
            features: record.features.clone(),
            limits: record.limits.clone(),
            ends_at: record.end_date,
            remaining: Some(time_remaining(record, now)),
        }
    }

    /// Resolve the active record in `subscriptions` and derive its entitlements.
    pub fn resolve(subscriptions: &[SubscriptionRecord], now: DateTime<Utc>) -> Self {
        match resolve_active(subscriptions, now) {
            Some(record) => Self::from_active(record, now),
            None => Self::free(),
        }
    }

    /// Check if a feature is available.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.is_active && self.features.iter().any(|f| f == feature)
    }

    /// Check a limit against current usage.
    ///
    /// Inactive users are always at a limit of zero. Active plans without an
    /// entry for `limit_name` are unlimited.
    #[must_use]
    pub fn check_limit(&self, limit_name: &str, current_usage: u64) -> LimitCheckResult {
        if !self.is_active {
            return LimitCheckResult::AtLimit { current: current_usage, max: 0 };
        }

        match self.limits.get(limit_name).copied() {
            None => LimitCheckResult::Unlimited,
            Some(max) if current_usage < max => {
                LimitCheckResult::WithinLimit { current: current_usage, max }
            }
            Some(max) => LimitCheckResult::AtLimit { current: current_usage, max },
        }
    }

    /// Plan label for display: plan name, else plan id, else "Premium".
    #[must_use]
    pub fn tier_label(&self) -> String {
        if !self.is_active {
            return FREE_TIER_LABEL.to_string();
        }
        self.plan_name
            .clone()
            .or_else(|| self.plan_id.clone())
            .unwrap_or_else(|| "Premium".to_string())
    }

    /// Human-readable remaining time, if a plan is active.
    #[must_use]
    pub fn remaining_label(&self) -> Option<String> {
        self.remaining.map(|r| r.to_string())
    }
}

/// Result of checking usage against a plan limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LimitCheckResult {
    /// Usage is below the limit.
    WithinLimit { current: u64, max: u64 },
    /// Usage has reached or exceeded the limit.
    AtLimit { current: u64, max: u64 },
    /// The plan does not cap this resource.
    Unlimited,
}

impl LimitCheckResult {
    /// Whether one more unit may be used.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::AtLimit { .. })
    }
}

/// Result of requiring a feature in a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCheckResult {
    /// Feature is available.
    Allowed,
    /// The user has never subscribed.
    NoSubscription,
    /// The user has subscriptions but none is active.
    SubscriptionInactive,
    /// Feature not included in the active plan.
    FeatureNotIncluded,
}

impl FeatureCheckResult {
    /// Check if the feature is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Check a feature against a subscription list.
#[must_use = "feature check result must be used to enforce access control"]
pub fn require_feature(
    subscriptions: &[SubscriptionRecord],
    now: DateTime<Utc>,
    feature: &str,
) -> FeatureCheckResult {
    if subscriptions.is_empty() {
        return FeatureCheckResult::NoSubscription;
    }

    match resolve_active(subscriptions, now) {
        None => FeatureCheckResult::SubscriptionInactive,
        Some(record) if record.has_feature(feature) => FeatureCheckResult::Allowed,
        Some(_) => FeatureCheckResult::FeatureNotIncluded,
    }
}

/// Entitlements manager for checking feature access by user id.
pub struct EntitlementsManager<S: SubscriptionStore> {
    store: S,
    resolver: EntitlementResolver,
}

impl<S: SubscriptionStore> EntitlementsManager<S> {
    #[must_use]
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            resolver: EntitlementResolver::new(clock),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn resolver(&self) -> &EntitlementResolver {
        &self.resolver
    }

    /// Get all entitlements for a user.
    pub async fn get_entitlements(&self, user_id: &str) -> Result<Entitlements> {
        let subscriptions = self.store.subscriptions(user_id).await?;
        Ok(Entitlements::resolve(&subscriptions, self.resolver.now()))
    }

    /// Check if a feature is available.
    pub async fn has_feature(&self, user_id: &str, feature: &str) -> Result<bool> {
        let entitlements = self.get_entitlements(user_id).await?;
        Ok(entitlements.has_feature(feature))
    }

    /// Check if the user has an active paid plan.
    pub async fn is_active(&self, user_id: &str) -> Result<bool> {
        let subscriptions = self.store.subscriptions(user_id).await?;
        Ok(self.resolver.is_active(&subscriptions))
    }

    /// Check a limit against current usage.
    pub async fn check_limit(
        &self,
        user_id: &str,
        limit_name: &str,
        current_usage: u64,
    ) -> Result<LimitCheckResult> {
        let entitlements = self.get_entitlements(user_id).await?;
        Ok(entitlements.check_limit(limit_name, current_usage))
    }

    /// Remaining time on the active plan, if any.
    pub async fn time_remaining(&self, user_id: &str) -> Result<Option<TimeRemaining>> {
        let subscriptions = self.store.subscriptions(user_id).await?;
        Ok(self
            .resolver
            .resolve_active(&subscriptions)
            .map(|record| self.resolver.time_remaining(record)))
    }

    /// Check a feature for use in guards.
    pub async fn require_feature(&self, user_id: &str, feature: &str) -> Result<FeatureCheckResult> {
        let subscriptions = self.store.subscriptions(user_id).await?;
        Ok(require_feature(&subscriptions, self.resolver.now(), feature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::subscription::InMemorySubscriptionStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap()
    }

    fn pro_plan(end: DateTime<Utc>) -> SubscriptionRecord {
        SubscriptionRecord::new("plan_pro", now() - Duration::days(10), end)
            .with_plan_name("JEE Pro")
            .with_features(["mock_tests", "analytics", "admin:institutes"])
            .with_limit("tests", 5)
    }

    #[test]
    fn test_resolve_active_entitlements() {
        let subs = vec![pro_plan(now() + Duration::days(2))];
        let e = Entitlements::resolve(&subs, now());

        assert!(e.is_active);
        assert_eq!(e.plan_id.as_deref(), Some("plan_pro"));
        assert_eq!(e.tier_label(), "JEE Pro");
        assert_eq!(e.remaining_label().as_deref(), Some("2 days"));
        assert!(e.has_feature("analytics"));
        assert!(!e.has_feature("live_classes"));
    }

    #[test]
    fn test_free_tier() {
        let subs = vec![pro_plan(now() - Duration::days(1))];
        let e = Entitlements::resolve(&subs, now());

        assert_eq!(e, Entitlements::free());
        assert_eq!(e.tier_label(), FREE_TIER_LABEL);
        assert!(!e.has_feature("mock_tests"));
        assert_eq!(e.remaining_label(), None);
    }

    #[test]
    fn test_tier_label_fallbacks() {
        let mut record = pro_plan(now() + Duration::days(1));
        record.plan_name = None;
        assert_eq!(Entitlements::from_active(&record, now()).tier_label(), "plan_pro");

        record.plan = None;
        assert_eq!(Entitlements::from_active(&record, now()).tier_label(), "Premium");
    }

    #[test]
    fn test_check_limit() {
        let e = Entitlements::resolve(&[pro_plan(now() + Duration::days(30))], now());

        assert_eq!(
            e.check_limit("tests", 3),
            LimitCheckResult::WithinLimit { current: 3, max: 5 }
        );
        assert_eq!(e.check_limit("tests", 5), LimitCheckResult::AtLimit { current: 5, max: 5 });
        assert_eq!(e.check_limit("doubts", 1_000), LimitCheckResult::Unlimited);
        assert!(e.check_limit("doubts", 1_000).is_allowed());

        let free = Entitlements::free();
        let result = free.check_limit("tests", 0);
        assert_eq!(result, LimitCheckResult::AtLimit { current: 0, max: 0 });
        assert!(!result.is_allowed());
    }

    #[test]
    fn test_require_feature() {
        assert_eq!(require_feature(&[], now(), "analytics"), FeatureCheckResult::NoSubscription);

        let lapsed = vec![pro_plan(now() - Duration::hours(1))];
        assert_eq!(
            require_feature(&lapsed, now(), "analytics"),
            FeatureCheckResult::SubscriptionInactive
        );

        let active = vec![pro_plan(now() + Duration::hours(1))];
        assert_eq!(require_feature(&active, now(), "analytics"), FeatureCheckResult::Allowed);
        assert_eq!(
            require_feature(&active, now(), "live_classes"),
            FeatureCheckResult::FeatureNotIncluded
        );
    }

    #[test]
    fn test_feature_check_result() {
        assert!(FeatureCheckResult::Allowed.is_allowed());
        assert!(!FeatureCheckResult::NoSubscription.is_allowed());
        assert!(!FeatureCheckResult::SubscriptionInactive.is_allowed());
        assert!(!FeatureCheckResult::FeatureNotIncluded.is_allowed());
    }

    #[tokio::test]
    async fn test_manager_by_user_id() {
        let store = InMemorySubscriptionStore::new();
        store.register_user("u_pro").unwrap();
        store.register_user("u_free").unwrap();
        store
            .record_purchase("u_pro", pro_plan(now() + Duration::hours(30)))
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::new(now()));
        let manager = EntitlementsManager::new(store, clock.clone());

        assert!(manager.is_active("u_pro").await.unwrap());
        assert!(manager.has_feature("u_pro", "mock_tests").await.unwrap());
        assert!(!manager.is_active("u_free").await.unwrap());
        assert_eq!(
            manager.require_feature("u_free", "mock_tests").await.unwrap(),
            FeatureCheckResult::NoSubscription
        );

        let remaining = manager.time_remaining("u_pro").await.unwrap().unwrap();
        assert_eq!(remaining.as_tuple(), (1, 6, 0));

        clock.advance(Duration::hours(31));
        assert!(!manager.is_active("u_pro").await.unwrap());
        assert_eq!(manager.time_remaining("u_pro").await.unwrap(), None);
        assert_eq!(
            manager.check_limit("u_pro", "tests", 0).await.unwrap(),
            LimitCheckResult::AtLimit { current: 0, max: 0 }
        );
    }

    #[tokio::test]
    async fn test_manager_unknown_user() {
        let manager = EntitlementsManager::new(
            InMemorySubscriptionStore::new(),
            Arc::new(ManualClock::new(now())),
        );
        assert!(manager.get_entitlements("ghost").await.is_err());
    }
}
