use serde::{Deserialize, Serialize};

/// Lifecycle state of a subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
    Failed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's subscription. One row per user: a new successful charge for the
/// same user updates the existing row instead of appending. Individual
/// charges are kept separately in the immutable charge ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    /// Transaction id of the most recent successful charge.
    pub flutterwave_transaction_id: String,
    pub flutterwave_plan_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flutterwave_customer_id: Option<String>,
    /// Provider-side recurring-subscription id, needed to stop billing.
    /// Absent when the provider's subscription object could not be located
    /// at verification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flutterwave_subscription_id: Option<String>,
    /// Email as reported by the provider (may carry a sandbox prefix).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub status: SubscriptionStatus,
    pub amount: f64,
    pub currency: String,
    pub current_period_start: i64,
    pub current_period_end: i64,
    /// "Do not renew." The row stays `active` until `current_period_end`.
    pub cancel_at_period_end: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Computed upsert for the subscriptions table, produced by reconciliation.
///
/// Optional fields are additive on conflict: a write that lacks one never
/// clears a value an earlier write already set.
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub user_id: String,
    pub flutterwave_transaction_id: String,
    pub flutterwave_plan_id: String,
    pub flutterwave_customer_id: Option<String>,
    pub flutterwave_subscription_id: Option<String>,
    pub customer_email: Option<String>,
    pub status: SubscriptionStatus,
    pub amount: f64,
    pub currency: String,
    pub current_period_start: i64,
    pub current_period_end: i64,
}
