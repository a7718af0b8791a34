//! Computing the canonical subscription row from provider charge evidence.
//!
//! Both write paths feed through here: client-driven verification and the
//! asynchronous `charge.completed` webhook. Given the same charge they must
//! produce the same upsert, whichever lands first.

use chrono::{DateTime, Days, Months, Utc};

use crate::flutterwave::{FlwTransaction, json_id_string};
use crate::models::{ChargeSource, CreateCharge, SubscriptionStatus, SubscriptionUpsert};

/// Normalized view of one provider charge, however it was delivered.
#[derive(Debug, Clone)]
pub struct ChargeEvent {
    pub transaction_id: String,
    /// Payment status as the provider reported it.
    pub status: String,
    pub amount: f64,
    pub currency: String,
    /// Provider-reported plan id, when the payload carried one.
    pub plan_id: Option<String>,
    /// Billing cadence, when the payload carried one.
    pub interval: Option<String>,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    /// Internal user id the client attached at charge time.
    pub meta_user_id: Option<String>,
    pub source: ChargeSource,
}

impl ChargeEvent {
    pub fn from_verification(tx: &FlwTransaction) -> Self {
        Self {
            transaction_id: tx.id.to_string(),
            status: tx.status.clone(),
            amount: tx.amount,
            currency: tx.currency.clone(),
            plan_id: tx.plan_id(),
            interval: tx.payment_plan.as_ref().and_then(|p| p.interval.clone()),
            customer_id: tx
                .customer
                .as_ref()
                .and_then(|c| c.id.map(|id| id.to_string())),
            customer_email: tx.customer_email().map(str::to_string),
            meta_user_id: tx.meta_user_id(),
            source: ChargeSource::Verification,
        }
    }

    /// Build from a `charge.completed` webhook body. Returns None when the
    /// payload carries no transaction id to key on.
    pub fn from_webhook(
        data: &serde_json::Value,
        meta: Option<&serde_json::Value>,
    ) -> Option<Self> {
        let transaction_id = data.get("id").and_then(json_id_string)?;
        Some(Self {
            transaction_id,
            status: data
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            amount: data.get("amount").and_then(|v| v.as_f64()).unwrap_or_default(),
            currency: data
                .get("currency")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            plan_id: data.get("plan").and_then(json_id_string),
            interval: data
                .get("payment_plan")
                .and_then(|p| p.get("interval"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            customer_id: data
                .get("customer")
                .and_then(|c| c.get("id"))
                .and_then(json_id_string),
            customer_email: data
                .get("customer")
                .and_then(|c| c.get("email"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            meta_user_id: meta.and_then(|m| m.get("userId")).and_then(json_id_string),
            source: ChargeSource::Webhook,
        })
    }

    /// Plan id to store, preferring the provider's over the one the client
    /// originally requested. Empty when neither side knows it.
    pub fn resolved_plan_id(&self, requested: Option<&str>) -> String {
        self.plan_id
            .clone()
            .or_else(|| requested.map(str::to_string))
            .unwrap_or_default()
    }
}

/// Billing-period end for an interval, anchored at `start`. Month and year
/// arithmetic is calendar-aware (Jan 31 + 1 month = Feb 28). Unknown
/// intervals bill monthly.
pub fn period_end(start: DateTime<Utc>, interval: &str) -> DateTime<Utc> {
    let end = match interval {
        "daily" => start.checked_add_days(Days::new(1)),
        "weekly" => start.checked_add_days(Days::new(7)),
        "yearly" => start.checked_add_months(Months::new(12)),
        _ => start.checked_add_months(Months::new(1)),
    };
    end.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn status_for_payment(raw_status: &str) -> SubscriptionStatus {
    if raw_status == "successful" {
        SubscriptionStatus::Active
    } else {
        SubscriptionStatus::Failed
    }
}

/// Compute the subscription upsert for a resolved charge.
///
/// `now` anchors the billing period; callers pass the same instant they use
/// elsewhere in the request so the row is reproducible.
pub fn build_upsert(
    event: &ChargeEvent,
    user_id: &str,
    requested_plan_id: Option<&str>,
    provider_subscription_id: Option<String>,
    now: DateTime<Utc>,
) -> SubscriptionUpsert {
    let interval = event.interval.as_deref().unwrap_or("monthly");
    SubscriptionUpsert {
        user_id: user_id.to_string(),
        flutterwave_transaction_id: event.transaction_id.clone(),
        flutterwave_plan_id: event.resolved_plan_id(requested_plan_id),
        flutterwave_customer_id: event.customer_id.clone(),
        flutterwave_subscription_id: provider_subscription_id,
        customer_email: event.customer_email.clone(),
        status: status_for_payment(&event.status),
        amount: event.amount,
        currency: event.currency.clone(),
        current_period_start: now.timestamp(),
        current_period_end: period_end(now, interval).timestamp(),
    }
}

/// Ledger entry for a charge, resolved user or not.
pub fn build_charge(
    event: &ChargeEvent,
    user_id: Option<&str>,
    requested_plan_id: Option<&str>,
) -> CreateCharge {
    CreateCharge {
        flutterwave_transaction_id: event.transaction_id.clone(),
        user_id: user_id.map(str::to_string),
        flutterwave_plan_id: event
            .plan_id
            .clone()
            .or_else(|| requested_plan_id.map(str::to_string)),
        amount: event.amount,
        currency: event.currency.clone(),
        status: event.status.clone(),
        customer_email: event.customer_email.clone(),
        source: event.source,
    }
}
