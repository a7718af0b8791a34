//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on unexpected stored values.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, full_name, created_at, updated_at";

pub const SUBSCRIPTION_COLS: &str = "id, user_id, flutterwave_transaction_id, flutterwave_plan_id, flutterwave_customer_id, flutterwave_subscription_id, customer_email, status, amount, currency, current_period_start, current_period_end, cancel_at_period_end, cancelled_at, created_at, updated_at";

pub const CHARGE_COLS: &str = "id, flutterwave_transaction_id, user_id, flutterwave_plan_id, amount, currency, status, customer_email, source, created_at";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl FromRow for Subscription {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Subscription {
            id: row.get(0)?,
            user_id: row.get(1)?,
            flutterwave_transaction_id: row.get(2)?,
            flutterwave_plan_id: row.get(3)?,
            flutterwave_customer_id: row.get(4)?,
            flutterwave_subscription_id: row.get(5)?,
            customer_email: row.get(6)?,
            status: parse_enum(row, 7, "status")?,
            amount: row.get(8)?,
            currency: row.get(9)?,
            current_period_start: row.get(10)?,
            current_period_end: row.get(11)?,
            cancel_at_period_end: row.get(12)?,
            cancelled_at: row.get(13)?,
            created_at: row.get(14)?,
            updated_at: row.get(15)?,
        })
    }
}

impl FromRow for Charge {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Charge {
            id: row.get(0)?,
            flutterwave_transaction_id: row.get(1)?,
            user_id: row.get(2)?,
            flutterwave_plan_id: row.get(3)?,
            amount: row.get(4)?,
            currency: row.get(5)?,
            status: row.get(6)?,
            customer_email: row.get(7)?,
            source: parse_enum(row, 8, "source")?,
            created_at: row.get(9)?,
        })
    }
}
