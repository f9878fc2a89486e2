use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use examgate::{
    EntitlementResolver, ManualClock, SubscriptionRecord, TimeRemaining, format_time_remaining, is_active, resolve_active,
    subscription::{EXPIRING_SOON_DAYS, from_user_document},
    time_remaining,
};
use serde_json::json;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 28, 23, 30, 0).unwrap()
}

fn plan(id: &str, ends_in: Duration) -> SubscriptionRecord {
    SubscriptionRecord::new(id, now() - Duration::days(90), now() + ends_in)
}

#[test]
fn test_first_active_record_wins_regardless_of_end_date() {
    let list = vec![
        plan("expired", Duration::days(-1)),
        plan("short", Duration::days(2)),
        plan("long", Duration::days(200)),
    ];

    assert_eq!(resolve_active(&list, now()).unwrap().plan.as_deref(), Some("short"));

    let mut superseded = list.clone();
    superseded[1].deactivate();
    assert_eq!(resolve_active(&superseded, now()).unwrap().plan.as_deref(), Some("long"));
}

#[test]
fn test_resolution_is_repeatable_at_the_same_instant() {
    let active = vec![plan("only", Duration::days(4))];
    let mut mixed = vec![
        plan("superseded", Duration::days(9)),
        plan("expired", Duration::hours(-1)),
        plan("current", Duration::hours(6)),
    ];
    mixed[0].deactivate();
    let empty: Vec<SubscriptionRecord> = Vec::new();

    for list in [&active, &mixed, &empty] {
        let first = resolve_active(list, now());
        let second = resolve_active(list, now());
        assert_eq!(first, second);
        if let (Some(a), Some(b)) = (first, second) {
            assert!(std::ptr::eq(a, b));
        }
    }
    assert!(resolve_active(&empty, now()).is_none());

    let resolver = EntitlementResolver::new(Arc::new(ManualClock::new(now())));
    let first = resolver.resolve_active(&mixed);
    let second = resolver.resolve_active(&mixed);
    assert_eq!(first.and_then(|r| r.plan.as_deref()), Some("current"));
    assert!(std::ptr::eq(first.unwrap(), second.unwrap()));
    assert_eq!(resolver.time_remaining(first.unwrap()), resolver.time_remaining(second.unwrap()));
}

#[test]
fn test_end_boundary_is_exclusive() {
    let list = vec![plan("edge", Duration::zero())];
    assert!(!is_active(&list, now()));
    assert!(is_active(&list, now() - Duration::milliseconds(1)));
}

#[test]
fn test_missing_end_date_never_resolves_but_missing_flag_does() {
    let mut no_end = plan("a", Duration::days(3));
    no_end.end_date = None;
    let mut unflagged = plan("b", Duration::days(3));
    unflagged.is_active = None;

    assert!(resolve_active(&[no_end.clone()], now()).is_none());
    assert_eq!(
        resolve_active(&[no_end, unflagged], now()).unwrap().plan.as_deref(),
        Some("b")
    );
    assert!(resolve_active(&[], now()).is_none());
}

#[test]
fn test_remaining_time_never_increases() {
    let record = plan("p", Duration::days(9) + Duration::hours(7) + Duration::minutes(41));
    let mut previous = time_remaining(&record, now());

    for step in 1..=(10 * 24 * 4) {
        let at = now() + Duration::minutes(15 * step);
        let current = time_remaining(&record, at);
        assert!(current.as_tuple() <= previous.as_tuple(), "remaining grew at step {}", step);
        previous = current;
    }

    assert_eq!(previous, TimeRemaining::none());
}

#[test]
fn test_flags_follow_day_count() {
    for hours in 1..(10 * 24) {
        let remaining = time_remaining(&plan("p", Duration::hours(hours)), now());
        assert_eq!(remaining.hours, (hours % 24) as u64);
        assert_eq!(remaining.is_expiring_today, remaining.days == 0);
        assert_eq!(remaining.is_expiring_soon, remaining.days <= EXPIRING_SOON_DAYS);
        assert!(!remaining.is_expiring_today || remaining.is_expiring_soon);
    }
}

#[test]
fn test_time_remaining_ignores_activity_flag() {
    let mut record = plan("p", Duration::hours(30));
    record.deactivate();

    let remaining = time_remaining(&record, now());
    assert_eq!(remaining.as_tuple(), (1, 6, 0));
    assert_eq!(format_time_remaining(&record, now()), "1 day, 6 hours");
}

#[test]
fn test_formatting() {
    let cases = [
        (Duration::days(3) + Duration::hours(4) + Duration::minutes(59), "3 days, 4 hours"),
        (Duration::days(1) + Duration::minutes(20), "1 day"),
        (Duration::hours(2) + Duration::minutes(15), "2 hours, 15 minutes"),
        (Duration::hours(1) + Duration::minutes(1), "1 hour, 1 minute"),
        (Duration::minutes(45), "45 minutes"),
        (Duration::seconds(30), "Expired"),
        (Duration::days(-2), "Expired"),
    ];

    for (ends_in, expected) in cases {
        assert_eq!(format_time_remaining(&plan("p", ends_in), now()), expected);
    }
}

#[test]
fn test_user_document_in_each_stored_shape() {
    let end = (now() + Duration::days(5)).to_rfc3339();
    let record = json!({ "plan": "neet", "isActive": true, "endDate": end });

    let shapes = [
        json!({ "subscription": [record.clone()] }),
        json!({ "subscription": record.clone() }),
        json!({ "subscription": { "0": record.clone() } }),
    ];
    for document in &shapes {
        let list = from_user_document(document);
        assert_eq!(list.len(), 1);
        assert!(is_active(&list, now()));
    }

    assert!(from_user_document(&json!({ "name": "no field" })).is_empty());
    assert!(from_user_document(&json!({ "subscription": null })).is_empty());
}

#[test]
fn test_malformed_fields_decode_as_absent() {
    let document = json!({
        "subscription": [
            { "plan": ["neet"], "isActive": "yes", "endDate": "not a date" },
            "garbage",
            { "plan": "ok", "isActive": true, "endDate": { "_seconds": (now() + Duration::hours(3)).timestamp() } }
        ]
    });

    let list = from_user_document(&document);
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].plan, None);
    assert_eq!(list[0].is_active, None);
    assert_eq!(list[0].end_date, None);
    assert_eq!(resolve_active(&list, now()).unwrap().plan.as_deref(), Some("ok"));
}
