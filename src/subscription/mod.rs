//! Subscription records and entitlement resolution.
//!
//! A user owns an ordered list of [`SubscriptionRecord`]s. The list is appended to
//! on every verified purchase (after marking the previous records inactive) and
//! never pruned. [`resolve_active`] picks the record that currently grants access.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use examgate::subscription::{SubscriptionRecord, format_time_remaining, resolve_active};
//!
//! let now = Utc::now();
//! let subs = vec![SubscriptionRecord::new("jee_pro", now, now + Duration::days(3))];
//!
//! let active = resolve_active(&subs, now).expect("active");
//! assert_eq!(format_time_remaining(active, now), "3 days");
//! ```

pub mod normalize;
pub mod record;
pub mod resolver;
pub mod store;
pub mod timestamp;

pub use normalize::{StoredShape, detect_shape, from_user_document, normalize_subscriptions};
pub use record::SubscriptionRecord;
pub use resolver::{
    EXPIRING_SOON_DAYS, EntitlementResolver, TimeRemaining, format_time_remaining, is_active,
    resolve_active, time_remaining,
};
pub use store::{InMemorySubscriptionStore, SubscriptionStore};
