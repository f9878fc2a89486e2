//! Storage trait for the user-owned subscription list.
//!
//! Implement [`SubscriptionStore`] over your document database. The provided
//! methods carry the list lifecycle: normalization on read, and the
//! "deactivate everything, then append" step on purchase.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::normalize::{StoredShape, detect_shape, normalize_subscriptions};
use super::record::SubscriptionRecord;
use crate::error::{ExamgateError, Result};

/// Trait for reading and appending a user's subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Raw `subscription` field of the user document.
    ///
    /// Returns `Ok(None)` when the user does not exist. A user without the
    /// field should return `Ok(Some(Value::Null))`.
    async fn load_raw(&self, user_id: &str) -> Result<Option<Value>>;

    /// Overwrite the user's subscription field with `subscriptions`.
    async fn save(&self, user_id: &str, subscriptions: &[SubscriptionRecord]) -> Result<()>;

    /// The user's subscriptions in list order.
    async fn subscriptions(&self, user_id: &str) -> Result<Vec<SubscriptionRecord>> {
        let raw = self
            .load_raw(user_id)
            .await?
            .ok_or_else(|| ExamgateError::not_found(format!("user {}", user_id)))?;

        let shape = detect_shape(&raw);
        if matches!(shape, StoredShape::LegacyRecord | StoredShape::SparseMap) {
            tracing::debug!(
                target: "examgate::store",
                user_id = %user_id,
                shape = ?shape,
                "Normalizing legacy subscription field"
            );
        }

        Ok(normalize_subscriptions(&raw))
    }

    /// Record a verified purchase.
    ///
    /// Every existing record is marked inactive, then `record` is appended as
    /// the active one. The list is written back as a plain array, which also
    /// migrates legacy shapes. Returns the list as saved.
    async fn record_purchase(
        &self,
        user_id: &str,
        mut record: SubscriptionRecord,
    ) -> Result<Vec<SubscriptionRecord>> {
        let mut subscriptions = self.subscriptions(user_id).await?;
        for existing in &mut subscriptions {
            existing.deactivate();
        }

        record.is_active = Some(true);
        subscriptions.push(record);
        self.save(user_id, &subscriptions).await?;

        tracing::info!(
            target: "examgate::store",
            user_id = %user_id,
            plan = ?subscriptions.last().and_then(|r| r.plan.as_deref()),
            total = subscriptions.len(),
            "Recorded subscription purchase"
        );

        Ok(subscriptions)
    }
}

#[async_trait]
impl<T: SubscriptionStore + ?Sized> SubscriptionStore for Arc<T> {
    async fn load_raw(&self, user_id: &str) -> Result<Option<Value>> {
        (**self).load_raw(user_id).await
    }

    async fn save(&self, user_id: &str, subscriptions: &[SubscriptionRecord]) -> Result<()> {
        (**self).save(user_id, subscriptions).await
    }

    async fn subscriptions(&self, user_id: &str) -> Result<Vec<SubscriptionRecord>> {
        (**self).subscriptions(user_id).await
    }

    async fn record_purchase(
        &self,
        user_id: &str,
        record: SubscriptionRecord,
    ) -> Result<Vec<SubscriptionRecord>> {
        (**self).record_purchase(user_id, record).await
    }
}

/// In-memory subscription store for development and tests.
///
/// Keeps the raw field per user so legacy shapes can be seeded. Clones share data.
#[derive(Debug, Default, Clone)]
pub struct InMemorySubscriptionStore {
    users: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemorySubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user with an empty subscription list. Existing users are left as-is.
    pub fn register_user(&self, user_id: &str) -> Result<()> {
        let mut users = self.write()?;
        users
            .entry(user_id.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        Ok(())
    }

    /// Seed a user's raw subscription field.
    pub fn insert_raw(&self, user_id: &str, raw: Value) -> Result<()> {
        self.write()?.insert(user_id.to_string(), raw);
        Ok(())
    }

    /// Raw field as currently stored.
    #[must_use]
    pub fn raw(&self, user_id: &str) -> Option<Value> {
        self.users.read().ok().and_then(|users| users.get(user_id).cloned())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Value>>> {
        self.users
            .write()
            .map_err(|_| ExamgateError::internal("subscription store lock poisoned"))
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn load_raw(&self, user_id: &str) -> Result<Option<Value>> {
        let users = self
            .users
            .read()
            .map_err(|_| ExamgateError::internal("subscription store lock poisoned"))?;
        Ok(users.get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, subscriptions: &[SubscriptionRecord]) -> Result<()> {
        let value = serde_json::to_value(subscriptions)?;
        let mut users = self.write()?;
        match users.get_mut(user_id) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ExamgateError::not_found(format!("user {}", user_id))),
        }
    }
}
