use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use super::response::{ApiResponse, FeatureAccess, SubscriptionStatus};
use crate::clock::Clock;
use crate::entitlements::EntitlementsManager;
use crate::error::Result;
use crate::subscription::SubscriptionStore;

/// Shared state for the subscription routes.
#[derive(Clone)]
pub struct AppState {
    entitlements: Arc<EntitlementsManager<Arc<dyn SubscriptionStore>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn SubscriptionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entitlements: Arc::new(EntitlementsManager::new(store, clock)),
        }
    }

    pub fn entitlements(&self) -> &EntitlementsManager<Arc<dyn SubscriptionStore>> {
        &self.entitlements
    }
}

/// Read-only subscription routes.
///
/// - `GET /users/:user_id/subscription`
/// - `GET /users/:user_id/features/:feature`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users/:user_id/subscription", get(subscription_status))
        .route("/users/:user_id/features/:feature", get(feature_access))
        .with_state(state)
}

async fn subscription_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<SubscriptionStatus>>> {
    let entitlements = state.entitlements.get_entitlements(&user_id).await?;
    Ok(Json(ApiResponse::success(SubscriptionStatus::from(&entitlements))))
}

async fn feature_access(
    State(state): State<AppState>,
    Path((user_id, feature)): Path<(String, String)>,
) -> Result<Json<ApiResponse<FeatureAccess>>> {
    let reason = state.entitlements.require_feature(&user_id, &feature).await?;
    tracing::debug!(user_id = %user_id, feature = %feature, result = ?reason, "Feature check");

    Ok(Json(ApiResponse::success(FeatureAccess {
        feature,
        allowed: reason.is_allowed(),
        reason,
    })))
}
