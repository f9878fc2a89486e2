//! examgate - subscription entitlements for an exam-prep service
//!
//! Resolves which of a user's subscription records currently grants access,
//! reports the time left on it, and watches for the moment access lapses.
//!
//! # Features
//!
//! - **Subscriptions**: lenient record decoding and normalization of legacy storage shapes
//! - **Resolution**: first-match active subscription lookup and time-remaining breakdown
//! - **Entitlements**: feature and usage-limit gating on top of the active plan
//! - **Monitoring**: background expiry monitor with de-duplicated warnings
//! - **HTTP**: read-only Axum routes for subscription status and feature access
//! - **Testing**: Alba-style HTTP testing utilities and subscription fixtures
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use examgate::{ConfigBuilder, clock::SystemClock, http, subscription::InMemorySubscriptionStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     examgate::init_tracing_with_config(&config);
//!
//!     let state = http::AppState::new(Arc::new(InMemorySubscriptionStore::new()), Arc::new(SystemClock));
//!     let listener = tokio::net::TcpListener::bind(config.server.addr()?).await?;
//!     axum::serve(listener, http::router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod entitlements;
mod error;
pub mod http;
pub mod monitor;
pub mod subscription;
pub mod testing;
pub mod utils;

// Re-exports for public API
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigBuilder, LoggingConfig, MonitorConfig, ServerConfig};
pub use entitlements::{
    Entitlements, EntitlementsManager, FeatureCheckResult, LimitCheckResult, require_feature,
};
pub use error::{ErrorResponse, ExamgateError, Result};
pub use monitor::{ExpiryMonitor, MonitorHandle, Notification, NotificationKind, NotificationSink};
pub use subscription::{
    EntitlementResolver, InMemorySubscriptionStore, SubscriptionRecord, SubscriptionStore,
    TimeRemaining, format_time_remaining, is_active, resolve_active, time_remaining,
};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call this early in `main()`, before spawning monitors.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "examgate::monitor=debug")
/// - `EXAMGATE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::parse_env_with_prefix::<bool>("LOG_JSON").unwrap_or(false);

    install(env_filter, json_logs);
}

/// Initialize tracing from a [`Config`]
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    install(env_filter, config.logging.json);
}

fn install(env_filter: EnvFilter, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
