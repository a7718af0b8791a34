//! Store-level tests for the subscription upsert and the charge ledger.

mod common;

use common::*;

fn base_upsert(user_id: &str, transaction_id: &str) -> SubscriptionUpsert {
    SubscriptionUpsert {
        user_id: user_id.to_string(),
        flutterwave_transaction_id: transaction_id.to_string(),
        flutterwave_plan_id: "101".to_string(),
        flutterwave_customer_id: None,
        flutterwave_subscription_id: None,
        customer_email: None,
        status: SubscriptionStatus::Active,
        amount: 5000.0,
        currency: "NGN".to_string(),
        current_period_start: 1_700_000_000,
        current_period_end: 1_700_000_000 + 30 * 86400,
    }
}

fn base_charge(transaction_id: &str) -> CreateCharge {
    CreateCharge {
        flutterwave_transaction_id: transaction_id.to_string(),
        user_id: Some("u-1".to_string()),
        flutterwave_plan_id: Some("101".to_string()),
        amount: 5000.0,
        currency: "NGN".to_string(),
        status: "successful".to_string(),
        customer_email: Some("jane@mail.com".to_string()),
        source: ChargeSource::Webhook,
    }
}

// ============ Subscription Upsert Tests ============

#[test]
fn test_upsert_keeps_one_row_per_user() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let first = queries::upsert_subscription(&conn, &base_upsert("u-1", "tx-1")).unwrap();
    let second = queries::upsert_subscription(&conn, &base_upsert("u-1", "tx-2")).unwrap();

    assert_eq!(first.id, second.id, "renewal should update the existing row");
    assert_eq!(second.flutterwave_transaction_id, "tx-2");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM subscriptions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_upsert_on_transaction_conflict_keeps_original_owner() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    queries::upsert_subscription(&conn, &base_upsert("u-1", "tx-1")).unwrap();
    // Same transaction attributed to a different resolved user id.
    let row = queries::upsert_subscription(&conn, &base_upsert("u-2", "tx-1")).unwrap();

    assert_eq!(row.user_id, "u-1", "first attribution should win");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM subscriptions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_optional_fields_survive_either_write_order() {
    let mut rich = base_upsert("u-1", "tx-1");
    rich.flutterwave_customer_id = Some("7".to_string());
    rich.flutterwave_subscription_id = Some("4092".to_string());
    rich.customer_email = Some("jane@mail.com".to_string());
    let poor = base_upsert("u-1", "tx-1");

    let pool_a = test_pool();
    let conn_a = pool_a.get().unwrap();
    queries::upsert_subscription(&conn_a, &rich).unwrap();
    let row_a = queries::upsert_subscription(&conn_a, &poor).unwrap();

    let pool_b = test_pool();
    let conn_b = pool_b.get().unwrap();
    queries::upsert_subscription(&conn_b, &poor).unwrap();
    let row_b = queries::upsert_subscription(&conn_b, &rich).unwrap();

    for row in [&row_a, &row_b] {
        assert_eq!(row.flutterwave_customer_id.as_deref(), Some("7"));
        assert_eq!(row.flutterwave_subscription_id.as_deref(), Some("4092"));
        assert_eq!(row.customer_email.as_deref(), Some("jane@mail.com"));
        assert_eq!(row.status, SubscriptionStatus::Active);
    }
}

#[test]
fn test_active_upsert_clears_cancellation_state() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let sub = queries::upsert_subscription(&conn, &base_upsert("u-1", "tx-1")).unwrap();
    queries::mark_subscription_cancelled(&conn, &sub.id)
        .unwrap()
        .expect("row should exist");

    let renewed = queries::upsert_subscription(&conn, &base_upsert("u-1", "tx-2")).unwrap();

    assert_eq!(renewed.status, SubscriptionStatus::Active);
    assert!(
        !renewed.cancel_at_period_end,
        "successful charge should clear the pending cancellation"
    );
    assert!(renewed.cancelled_at.is_none());
}

#[test]
fn test_failed_upsert_preserves_cancellation_state() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let sub = queries::upsert_subscription(&conn, &base_upsert("u-1", "tx-1")).unwrap();
    queries::mark_subscription_cancelled(&conn, &sub.id)
        .unwrap()
        .expect("row should exist");

    let mut failed = base_upsert("u-1", "tx-2");
    failed.status = SubscriptionStatus::Failed;
    let after = queries::upsert_subscription(&conn, &failed).unwrap();

    assert_eq!(after.status, SubscriptionStatus::Failed);
    assert!(
        after.cancel_at_period_end,
        "failed charge should not clear the pending cancellation"
    );
    assert!(after.cancelled_at.is_some());
}

#[test]
fn test_cancel_by_transaction_id() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    queries::upsert_subscription(&conn, &base_upsert("u-1", "tx-1")).unwrap();

    assert!(queries::cancel_subscription_by_transaction(&conn, "tx-1").unwrap());

    let row = queries::get_subscription_by_transaction(&conn, "tx-1")
        .unwrap()
        .expect("row should exist");
    assert_eq!(row.status, SubscriptionStatus::Cancelled);
    assert!(row.cancelled_at.is_some());

    assert!(
        !queries::cancel_subscription_by_transaction(&conn, "tx-9").unwrap(),
        "unknown transaction should report no match"
    );
}

// ============ Charge Ledger Tests ============

#[test]
fn test_charge_recorded_at_most_once() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let charge = base_charge("tx-1");
    assert!(queries::try_record_charge(&conn, &charge).unwrap());
    assert!(
        !queries::try_record_charge(&conn, &charge).unwrap(),
        "second insert for the same transaction should be ignored"
    );

    let stored = queries::get_charge_by_transaction(&conn, "tx-1")
        .unwrap()
        .expect("charge should be recorded");
    assert_eq!(stored.source, ChargeSource::Webhook);
    assert_eq!(stored.status, "successful");
    assert_eq!(stored.user_id.as_deref(), Some("u-1"));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM charges", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_charge_without_user_is_kept() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let mut charge = base_charge("tx-1");
    charge.user_id = None;
    assert!(queries::try_record_charge(&conn, &charge).unwrap());

    let stored = queries::get_charge_by_transaction(&conn, "tx-1")
        .unwrap()
        .expect("charge should be recorded");
    assert!(stored.user_id.is_none());
}

// ============ User Mirror Tests ============

#[test]
fn test_user_sync_lowercases_email_and_keeps_name() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let created = queries::upsert_user(
        &conn,
        &SyncUser {
            id: "u-1".to_string(),
            email: "Jane@Mail.com".to_string(),
            full_name: Some("Jane Doe".to_string()),
        },
    )
    .unwrap();
    assert_eq!(created.email, "jane@mail.com");

    // Re-sync without a name keeps the stored one.
    let resynced = queries::upsert_user(
        &conn,
        &SyncUser {
            id: "u-1".to_string(),
            email: "jane@mail.com".to_string(),
            full_name: None,
        },
    )
    .unwrap();
    assert_eq!(resynced.full_name.as_deref(), Some("Jane Doe"));

    let found = queries::get_user_by_email(&conn, "JANE@mail.com")
        .unwrap()
        .expect("lookup should be case-insensitive via lowercasing");
    assert_eq!(found.id, "u-1");
}
