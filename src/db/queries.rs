use chrono::Utc;
use rusqlite::{Connection, params, types::Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{CHARGE_COLS, SUBSCRIPTION_COLS, USER_COLS, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    /// Execute the update and return the updated entity using RETURNING.
    /// Returns None if no row matched.
    fn execute_returning<T: super::from_row::FromRow>(
        mut self,
        conn: &Connection,
        returning_cols: &str,
    ) -> Result<Option<T>> {
        use rusqlite::OptionalExtension;

        if self.fields.is_empty() {
            return Ok(None);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? RETURNING {}",
            self.table,
            sets.join(", "),
            returning_cols
        );
        conn.query_row(&sql, rusqlite::params_from_iter(values), T::from_row)
            .optional()
            .map_err(Into::into)
    }
}

// ============ Users ============

/// Insert or refresh a user mirror row. The auth provider owns the id, so
/// conflicts resolve on it; a sync without a name keeps the stored one.
pub fn upsert_user(conn: &Connection, input: &SyncUser) -> Result<User> {
    let now = now();
    let email = input.email.trim().to_lowercase();
    query_one(
        conn,
        &format!(
            "INSERT INTO users (id, email, full_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 full_name = COALESCE(excluded.full_name, users.full_name),
                 updated_at = excluded.updated_at
             RETURNING {}",
            USER_COLS
        ),
        &[&input.id, &email, &input.full_name, &now],
    )?
    .ok_or_else(|| AppError::Internal("user upsert returned no row".into()))
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email],
    )
}

// ============ Subscriptions ============

/// Insert or update the subscription row for a charge.
///
/// Conflicts on either unique key resolve to the same update: mandatory
/// fields take the incoming value, optional provider fields keep whichever
/// side is non-null. A successful charge also clears any pending
/// cancellation state; a failed one leaves it alone.
pub fn upsert_subscription(conn: &Connection, input: &SubscriptionUpsert) -> Result<Subscription> {
    const UPDATE_SET: &str = "
                 flutterwave_transaction_id = excluded.flutterwave_transaction_id,
                 flutterwave_plan_id = excluded.flutterwave_plan_id,
                 flutterwave_customer_id = COALESCE(excluded.flutterwave_customer_id, subscriptions.flutterwave_customer_id),
                 flutterwave_subscription_id = COALESCE(excluded.flutterwave_subscription_id, subscriptions.flutterwave_subscription_id),
                 customer_email = COALESCE(excluded.customer_email, subscriptions.customer_email),
                 status = excluded.status,
                 amount = excluded.amount,
                 currency = excluded.currency,
                 current_period_start = excluded.current_period_start,
                 current_period_end = excluded.current_period_end,
                 cancel_at_period_end = CASE WHEN excluded.status = 'active'
                     THEN 0 ELSE subscriptions.cancel_at_period_end END,
                 cancelled_at = CASE WHEN excluded.status = 'active'
                     THEN NULL ELSE subscriptions.cancelled_at END,
                 updated_at = excluded.updated_at";

    let id = gen_id();
    let now = now();
    let status = input.status.as_str();
    query_one(
        conn,
        &format!(
            "INSERT INTO subscriptions (
                 id, user_id, flutterwave_transaction_id, flutterwave_plan_id,
                 flutterwave_customer_id, flutterwave_subscription_id, customer_email,
                 status, amount, currency, current_period_start, current_period_end,
                 cancel_at_period_end, cancelled_at, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, NULL, ?13, ?13)
             ON CONFLICT(user_id) DO UPDATE SET {UPDATE_SET}
             ON CONFLICT(flutterwave_transaction_id) DO UPDATE SET {UPDATE_SET}
             RETURNING {SUBSCRIPTION_COLS}"
        ),
        &[
            &id,
            &input.user_id,
            &input.flutterwave_transaction_id,
            &input.flutterwave_plan_id,
            &input.flutterwave_customer_id,
            &input.flutterwave_subscription_id,
            &input.customer_email,
            &status,
            &input.amount,
            &input.currency,
            &input.current_period_start,
            &input.current_period_end,
            &now,
        ],
    )?
    .ok_or_else(|| AppError::Internal("subscription upsert returned no row".into()))
}

pub fn get_subscription_by_id(conn: &Connection, id: &str) -> Result<Option<Subscription>> {
    query_one(
        conn,
        &format!("SELECT {} FROM subscriptions WHERE id = ?1", SUBSCRIPTION_COLS),
        &[&id],
    )
}

pub fn get_subscription_by_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<Option<Subscription>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM subscriptions WHERE flutterwave_transaction_id = ?1",
            SUBSCRIPTION_COLS
        ),
        &[&transaction_id],
    )
}

pub fn get_subscription_for_user(conn: &Connection, user_id: &str) -> Result<Option<Subscription>> {
    query_one(
        conn,
        &format!("SELECT {} FROM subscriptions WHERE user_id = ?1", SUBSCRIPTION_COLS),
        &[&user_id],
    )
}

/// Explicit cancellation: flag the row cancelled now and stop renewal.
pub fn mark_subscription_cancelled(conn: &Connection, id: &str) -> Result<Option<Subscription>> {
    UpdateBuilder::new("subscriptions", id)
        .set("status", SubscriptionStatus::Cancelled.to_string())
        .set("cancel_at_period_end", true)
        .set("cancelled_at", now())
        .with_updated_at()
        .execute_returning(conn, SUBSCRIPTION_COLS)
}

/// Provider-driven cancellation, matched by the transaction id the webhook
/// carries. Returns false when no local row matches.
pub fn cancel_subscription_by_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "UPDATE subscriptions
         SET status = 'cancelled', cancelled_at = ?1, updated_at = ?1
         WHERE flutterwave_transaction_id = ?2",
        params![now, transaction_id],
    )?;
    Ok(affected > 0)
}

// ============ Charges ============

/// Record a charge in the ledger. Returns false when this transaction id
/// was already recorded, which callers treat as a replayed delivery.
pub fn try_record_charge(conn: &Connection, input: &CreateCharge) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO charges (
             id, flutterwave_transaction_id, user_id, flutterwave_plan_id,
             amount, currency, status, customer_email, source, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            gen_id(),
            &input.flutterwave_transaction_id,
            &input.user_id,
            &input.flutterwave_plan_id,
            input.amount,
            &input.currency,
            &input.status,
            &input.customer_email,
            input.source.as_str(),
            now(),
        ],
    )?;
    Ok(affected > 0)
}

pub fn get_charge_by_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<Option<Charge>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM charges WHERE flutterwave_transaction_id = ?1",
            CHARGE_COLS
        ),
        &[&transaction_id],
    )
}
