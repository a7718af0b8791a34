use serde::{Deserialize, Serialize};

/// Which path recorded a charge first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeSource {
    Verification,
    Webhook,
}

impl ChargeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verification => "verification",
            Self::Webhook => "webhook",
        }
    }
}

impl std::str::FromStr for ChargeSource {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "verification" => Ok(Self::Verification),
            "webhook" => Ok(Self::Webhook),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ChargeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One provider charge, recorded at most once per transaction id.
///
/// The ledger is append-only. It doubles as the replay guard for webhook
/// deliveries: a charge that is already present has been processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub flutterwave_transaction_id: String,
    /// None when the charge arrived with no resolvable user (webhook with
    /// neither metadata user id nor a matching email).
    pub user_id: Option<String>,
    pub flutterwave_plan_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    /// Provider-reported payment status, stored verbatim.
    pub status: String,
    pub customer_email: Option<String>,
    pub source: ChargeSource,
    pub created_at: i64,
}

/// Data required to record a new charge.
#[derive(Debug, Clone)]
pub struct CreateCharge {
    pub flutterwave_transaction_id: String,
    pub user_id: Option<String>,
    pub flutterwave_plan_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub customer_email: Option<String>,
    pub source: ChargeSource,
}
