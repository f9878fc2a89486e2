//! HTTP surface for subscription status.
//!
//! Exposes the resolver and gating checks to dashboards over a small read-only
//! axum router. Errors render through [`ExamgateError`](crate::ExamgateError).

pub mod response;
pub mod routes;

pub use response::{ApiResponse, FeatureAccess, SubscriptionStatus};
pub use routes::{AppState, router};
