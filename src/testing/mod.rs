//! Testing utilities for examgate
//!
//! - Alba-style HTTP endpoint testing without running a server
//! - Subscription fixtures relative to a fixed reference instant
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use examgate::clock::ManualClock;
//! use examgate::http::{AppState, router};
//! use examgate::subscription::InMemorySubscriptionStore;
//! use examgate::testing::{self, reference_now};
//!
//! #[tokio::test]
//! async fn test_free_tier() {
//!     let store = InMemorySubscriptionStore::new();
//!     store.register_user("u_1").unwrap();
//!     let app = router(AppState::new(Arc::new(store), Arc::new(ManualClock::new(reference_now()))));
//!
//!     testing::get(app, "/users/u_1/subscription")
//!         .execute()
//!         .await
//!         .assert_ok()
//!         .assert_json_field("data.active", serde_json::json!(false))
//!         .await;
//! }
//! ```

mod fixtures;
mod scenario;

pub use fixtures::{SubscriptionFixture, reference_now, sparse_map, with_epoch_object_dates};
pub use scenario::{Scenario, ScenarioAssert, get};
