use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entitlements::{Entitlements, FeatureCheckResult};
use crate::subscription::TimeRemaining;

/// Standard JSON response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// A user's subscription status as shown on dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionStatus {
    pub active: bool,
    /// Plan label, or "Free tier".
    pub tier: String,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub ends_at: Option<DateTime<Utc>>,
    pub remaining: Option<TimeRemaining>,
    pub remaining_label: Option<String>,
}

impl From<&Entitlements> for SubscriptionStatus {
    fn from(e: &Entitlements) -> Self {
        Self {
            active: e.is_active,
            tier: e.tier_label(),
            plan_id: e.plan_id.clone(),
            plan_name: e.plan_name.clone(),
            ends_at: e.ends_at,
            remaining: e.remaining,
            remaining_label: e.remaining_label(),
        }
    }
}

/// Outcome of a feature check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureAccess {
    pub feature: String,
    pub allowed: bool,
    pub reason: FeatureCheckResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_status_envelope() {
        let body = serde_json::to_value(ApiResponse::success(SubscriptionStatus::from(
            &Entitlements::free(),
        )))
        .unwrap();

        assert_eq!(body["success"], true);
        assert!(body.get("message").is_none());
        assert_eq!(body["data"]["tier"], "Free tier");
        assert_eq!(body["data"]["remaining_label"], serde_json::Value::Null);
    }
}
