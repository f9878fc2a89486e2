//! Boundary adapter from stored subscription fields to an ordered list.
//!
//! The `subscription` field on user documents has been written in three shapes
//! over time: a list, a single legacy record, and a sparse map keyed by list
//! index (`{"0": {...}, "3": {...}}`). Everything past this module sees only
//! `Vec<SubscriptionRecord>`.

use serde_json::Value;

use super::record::SubscriptionRecord;

/// Field on the user document that holds subscriptions.
pub const SUBSCRIPTION_FIELD: &str = "subscription";

/// Storage shape detected for a raw subscription field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredShape {
    /// Missing, null, empty object, or a scalar.
    Absent,
    List,
    /// A single record stored directly on the field.
    LegacyRecord,
    /// An object whose keys are all list indices.
    SparseMap,
}

/// Classify a raw subscription field.
#[must_use]
pub fn detect_shape(raw: &Value) -> StoredShape {
    match raw {
        Value::Array(_) => StoredShape::List,
        Value::Object(map) if map.is_empty() => StoredShape::Absent,
        Value::Object(map) if map.keys().all(|k| k.parse::<u64>().is_ok()) => StoredShape::SparseMap,
        Value::Object(_) => StoredShape::LegacyRecord,
        _ => StoredShape::Absent,
    }
}

/// Normalize a raw subscription field into list order.
///
/// Sparse maps are ordered by their numeric keys. Elements that are not JSON
/// objects are dropped.
#[must_use]
pub fn normalize_subscriptions(raw: &Value) -> Vec<SubscriptionRecord> {
    match (detect_shape(raw), raw) {
        (StoredShape::List, Value::Array(items)) => decode_all(items.iter()),
        (StoredShape::SparseMap, Value::Object(map)) => {
            let mut entries: Vec<(u64, &Value)> = map
                .iter()
                .filter_map(|(key, value)| key.parse::<u64>().ok().map(|index| (index, value)))
                .collect();
            entries.sort_by_key(|(index, _)| *index);
            decode_all(entries.into_iter().map(|(_, value)| value))
        }
        (StoredShape::LegacyRecord, _) => decode_record(raw).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Normalize the `subscription` field of a whole user document.
#[must_use]
pub fn from_user_document(document: &Value) -> Vec<SubscriptionRecord> {
    document
        .get(SUBSCRIPTION_FIELD)
        .map(normalize_subscriptions)
        .unwrap_or_default()
}

fn decode_all<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<SubscriptionRecord> {
    values.filter_map(decode_record).collect()
}

fn decode_record(value: &Value) -> Option<SubscriptionRecord> {
    if !value.is_object() {
        tracing::debug!(
            target: "examgate::store",
            "Dropping non-object subscription entry"
        );
        return None;
    }

    match serde_json::from_value(value.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(
                target: "examgate::store",
                error = %e,
                "Dropping undecodable subscription entry"
            );
            None
        }
    }
}
