use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Envelope every Flutterwave v3 endpoint wraps its payload in.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: String,
    message: Option<String>,
    data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    fn is_success(&self) -> bool {
        self.status == "success"
    }

    fn message_or_default(&self) -> String {
        match &self.message {
            Some(m) if !m.is_empty() => m.clone(),
            _ => "request failed".to_string(),
        }
    }
}

/// Stringify an id that may arrive as a JSON number or a string.
/// Empty strings count as absent.
pub(crate) fn json_id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

// ============ /payment-plans ============

/// Billing plan as configured in the provider dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    pub interval: String, // "daily", "weekly", "monthly", "yearly"
    pub duration: Option<i64>,
    pub status: String,
    pub plan_token: Option<String>,
    pub created_at: Option<String>,
}

// ============ /transactions ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlwCustomer {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Nested plan details some transaction payloads carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlwPaymentPlan {
    pub interval: Option<String>,
}

/// Transaction as returned by the verify and list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlwTransaction {
    pub id: i64,
    pub tx_ref: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: String, // "successful", "failed", "pending"
    pub created_at: Option<String>,
    pub customer: Option<FlwCustomer>,
    /// Plan id; a number in most payloads, a string in some.
    pub plan: Option<serde_json::Value>,
    pub payment_plan: Option<FlwPaymentPlan>,
    /// Opaque metadata the client attached at charge time.
    pub meta: Option<serde_json::Value>,
}

impl FlwTransaction {
    /// Provider-reported plan id, normalized to a string.
    pub fn plan_id(&self) -> Option<String> {
        self.plan.as_ref().and_then(json_id_string)
    }

    /// Internal user id attached at charge time, if any.
    pub fn meta_user_id(&self) -> Option<String> {
        self.meta
            .as_ref()
            .and_then(|m| m.get("userId"))
            .and_then(json_id_string)
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer.as_ref()?.email.as_deref()
    }
}

/// Outcome of a transaction verification.
///
/// `verified` is false for any provider answer short of a fully successful
/// charge. That is a semantic result, not an error.
#[derive(Debug, Clone)]
pub struct Verification {
    pub verified: bool,
    /// Charge status as the provider reported it, kept for logging and for
    /// the failure response.
    pub raw_status: String,
    pub transaction: Option<FlwTransaction>,
}

// ============ /subscriptions ============

/// Recurring-billing subscription object owned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: i64,
    pub status: String, // "active", "cancelled"
    /// Plan id; a number in most payloads.
    pub plan: Option<serde_json::Value>,
    pub amount: Option<f64>,
    pub created_at: Option<String>,
}

impl ProviderSubscription {
    pub fn plan_id(&self) -> Option<String> {
        self.plan.as_ref().and_then(json_id_string)
    }
}

/// Pick the provider subscription matching a plan, preferring one that is
/// still active.
pub fn find_subscription_for_plan<'a>(
    subscriptions: &'a [ProviderSubscription],
    plan_id: &str,
) -> Option<&'a ProviderSubscription> {
    subscriptions
        .iter()
        .find(|s| s.status == "active" && s.plan_id().as_deref() == Some(plan_id))
        .or_else(|| {
            subscriptions
                .iter()
                .find(|s| s.plan_id().as_deref() == Some(plan_id))
        })
}

/// Outcome of a provider-side cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelDisposition {
    Cancelled,
    /// The provider reported the subscription already cancelled or missing.
    /// Treated as success so cancellation stays idempotent.
    AlreadyCancelled,
}

// ============ webhooks ============

/// Raw webhook delivery. `data` stays untyped; payload shapes vary by event
/// type and provider version.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub data: serde_json::Value,
    /// Charge metadata; newer payloads nest it under `data.meta` instead.
    pub meta_data: Option<serde_json::Value>,
}

impl WebhookPayload {
    pub fn meta(&self) -> Option<&serde_json::Value> {
        self.meta_data.as_ref().or_else(|| self.data.get("meta"))
    }
}

/// Thin client over the Flutterwave v3 REST API.
///
/// One request per call with a bounded timeout, no retries, no backoff.
/// Failures surface immediately to the caller.
#[derive(Debug, Clone)]
pub struct FlutterwaveClient {
    client: Client,
    api_url: String,
    secret_key: String,
}

impl FlutterwaveClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.flw_timeout_secs))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            api_url: config.flw_api_url.trim_end_matches('/').to_string(),
            secret_key: config.flw_secret_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// GET a provider endpoint and decode the envelope. The body is decoded
    /// regardless of the HTTP status code; the provider signals errors
    /// through the envelope's `status` field.
    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiEnvelope<T>> {
        let mut request = self.client.get(self.url(path)).bearer_auth(&self.secret_key);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Flutterwave API error: {}", e)))?;
        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Flutterwave response: {}", e)))
    }

    /// Fetch all billing plans configured for this account.
    pub async fn list_plans(&self) -> Result<Vec<Plan>> {
        let envelope: ApiEnvelope<Vec<Plan>> = self.get_envelope("/payment-plans", &[]).await?;
        if !envelope.is_success() {
            return Err(AppError::upstream(envelope.message_or_default()));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Plan> {
        let envelope: ApiEnvelope<Plan> = self
            .get_envelope(&format!("/payment-plans/{}", plan_id), &[])
            .await?;
        if !envelope.is_success() {
            return Err(AppError::upstream(envelope.message_or_default()));
        }
        envelope
            .data
            .ok_or_else(|| AppError::upstream("plan missing from response"))
    }

    /// Verify a transaction by id.
    ///
    /// A transaction counts as verified only when the provider answers
    /// `success` at the top level AND reports the charge itself as
    /// `successful`. Anything short of that is a failed verification.
    pub async fn verify_transaction(&self, transaction_id: &str) -> Result<Verification> {
        let envelope: ApiEnvelope<FlwTransaction> = self
            .get_envelope(&format!("/transactions/{}/verify", transaction_id), &[])
            .await?;

        let raw_status = match &envelope.data {
            Some(tx) => tx.status.clone(),
            None => envelope.status.clone(),
        };
        let verified = envelope.is_success()
            && matches!(&envelope.data, Some(tx) if tx.status == "successful");

        Ok(Verification {
            verified,
            raw_status,
            transaction: envelope.data,
        })
    }

    /// Charges recorded against a customer email.
    pub async fn list_transactions(&self, email: &str) -> Result<Vec<FlwTransaction>> {
        let envelope: ApiEnvelope<Vec<FlwTransaction>> = self
            .get_envelope("/transactions", &[("customer_email", email)])
            .await?;
        if !envelope.is_success() {
            return Err(AppError::upstream(envelope.message_or_default()));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    /// Recurring subscriptions registered for a customer email.
    pub async fn list_subscriptions(&self, email: &str) -> Result<Vec<ProviderSubscription>> {
        let envelope: ApiEnvelope<Vec<ProviderSubscription>> =
            self.get_envelope("/subscriptions", &[("email", email)]).await?;
        if !envelope.is_success() {
            return Err(AppError::upstream(envelope.message_or_default()));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    /// Stop recurring billing for a provider subscription.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<CancelDisposition> {
        let response = self
            .client
            .put(self.url(&format!("/subscriptions/{}/cancel", subscription_id)))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Flutterwave API error: {}", e)))?;
        let envelope: ApiEnvelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Flutterwave response: {}", e)))?;

        if envelope.is_success() {
            return Ok(CancelDisposition::Cancelled);
        }

        let message = envelope.message_or_default();
        let lowered = message.to_lowercase();
        if lowered.contains("already cancelled") || lowered.contains("not found") {
            tracing::info!(
                "provider reports subscription {} already cancelled: {}",
                subscription_id,
                message
            );
            return Ok(CancelDisposition::AlreadyCancelled);
        }

        Err(AppError::upstream(message))
    }
}
