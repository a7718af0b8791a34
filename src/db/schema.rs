use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Local mirror of auth-provider users (email is the fallback lookup key)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

        -- Subscriptions: one row per user. A new successful charge for the
        -- same user updates the row; per-charge history lives in charges.
        -- No FK on user_id: charge metadata is authoritative even when the
        -- user mirror has not seen that id yet.
        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            flutterwave_transaction_id TEXT NOT NULL UNIQUE,
            flutterwave_plan_id TEXT NOT NULL,
            flutterwave_customer_id TEXT,
            flutterwave_subscription_id TEXT,
            customer_email TEXT,
            status TEXT NOT NULL CHECK (status IN ('pending', 'active', 'cancelled', 'expired', 'failed')),
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            current_period_start INTEGER NOT NULL,
            current_period_end INTEGER NOT NULL,
            cancel_at_period_end INTEGER NOT NULL DEFAULT 0,
            cancelled_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_transaction ON subscriptions(flutterwave_transaction_id);

        -- Charge ledger: append-only, one row per provider transaction.
        -- Doubles as the webhook replay guard.
        CREATE TABLE IF NOT EXISTS charges (
            id TEXT PRIMARY KEY,
            flutterwave_transaction_id TEXT NOT NULL UNIQUE,
            user_id TEXT,
            flutterwave_plan_id TEXT,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL,
            customer_email TEXT,
            source TEXT NOT NULL CHECK (source IN ('verification', 'webhook')),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_charges_user ON charges(user_id);
        "#,
    )
}
