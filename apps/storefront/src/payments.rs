//! # Payment Gateway
//!
//! Card payments go through Stripe PaymentIntents. Handlers only see the
//! [`PaymentGateway`] trait so tests can run against [`StubPaymentGateway`].
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Browser                     Storefront                    Stripe       │
//! │     │ POST /api/create-payment-intent                          │        │
//! │     │─────────────────────────►│ create_intent(amount, cur) ──►│        │
//! │     │◄──── { clientSecret } ───│◄──────────── intent ──────────│        │
//! │     │                          │                               │        │
//! │     │ confirm card with clientSecret ─────────────────────────►│        │
//! │     │                          │                               │        │
//! │     │ POST /api/orders { paymentIntentId }                     │        │
//! │     │─────────────────────────►│ retrieve_intent(id) ─────────►│        │
//! │     │                          │ status == succeeded?          │        │
//! │     │                          │ amount/currency == order?     │        │
//! │     │◄──── 201 order ──────────│                               │        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use jewel_core::{Currency, Money};

/// Status string of a PaymentIntent that has been paid.
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// Payment errors.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payments are not configured")]
    NotConfigured,

    #[error("payment {0} not found")]
    NotFound(String),

    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    #[error("gateway unreachable: {0}")]
    Transport(String),

    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// A request to collect `amount` from the customer.
#[derive(Debug, Clone)]
pub struct CreateIntent {
    pub amount: Money,
    pub currency: Currency,
    /// Cart snapshot, JSON-encoded into the intent metadata.
    pub items: serde_json::Value,
}

/// The fields of a PaymentIntent the storefront relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Minor units.
    pub amount: i64,
    /// Lowercase ISO code.
    pub currency: String,
    pub status: String,
}

impl PaymentIntent {
    /// Checks that this intent paid exactly `amount` in `currency`.
    pub fn verify(&self, amount: Money, currency: Currency) -> Result<(), String> {
        if self.status != STATUS_SUCCEEDED {
            return Err(format!("payment status is {}", self.status));
        }
        if !self.currency.eq_ignore_ascii_case(currency.gateway_code()) {
            return Err(format!(
                "payment currency {} does not match order currency {}",
                self.currency,
                currency.gateway_code()
            ));
        }
        if self.amount != amount.minor_units() {
            return Err(format!(
                "payment amount {} does not match order total {}",
                self.amount,
                amount.minor_units()
            ));
        }
        Ok(())
    }
}

/// Card payment provider.
pub trait PaymentGateway: Send + Sync {
    fn create_intent(&self, request: CreateIntent) -> BoxFuture<'_, Result<PaymentIntent, PaymentError>>;

    fn retrieve_intent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<PaymentIntent, PaymentError>>;
}

// =============================================================================
// Stripe
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Stripe PaymentIntents over the REST API.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        StripeGateway {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Joins `segments` onto the API base, each as one percent-encoded path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, PaymentError> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| PaymentError::Transport(format!("invalid API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PaymentError::Transport("API base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_intent(response: reqwest::Response, id_hint: &str) -> Result<PaymentIntent, PaymentError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<PaymentIntent>()
                .await
                .map_err(|e| PaymentError::InvalidResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<StripeErrorBody>(&body).ok().map(|b| b.error);

        if status == reqwest::StatusCode::NOT_FOUND
            || detail.as_ref().and_then(|d| d.code.as_deref()) == Some("resource_missing")
        {
            return Err(PaymentError::NotFound(id_hint.to_string()));
        }

        let message = detail
            .and_then(|d| d.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        warn!(status = %status, message = %message, "Stripe request failed");
        Err(PaymentError::Rejected(message))
    }

    async fn create(&self, request: CreateIntent) -> Result<PaymentIntent, PaymentError> {
        let items = serde_json::to_string(&request.items)
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;
        let amount = request.amount.minor_units().to_string();

        let form = [
            ("amount", amount.as_str()),
            ("currency", request.currency.gateway_code()),
            ("metadata[integration_check]", "accept_a_payment"),
            ("metadata[items]", items.as_str()),
        ];

        debug!(amount = %amount, currency = %request.currency, "Creating PaymentIntent");

        let response = self
            .client
            .post(self.endpoint(&["v1", "payment_intents"])?)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let intent = Self::read_intent(response, "new").await?;
        info!(intent_id = %intent.id, amount = intent.amount, "PaymentIntent created");
        Ok(intent)
    }

    async fn retrieve(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .client
            .get(self.endpoint(&["v1", "payment_intents", id])?)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        Self::read_intent(response, id).await
    }
}

impl PaymentGateway for StripeGateway {
    fn create_intent(&self, request: CreateIntent) -> BoxFuture<'_, Result<PaymentIntent, PaymentError>> {
        self.create(request).boxed()
    }

    fn retrieve_intent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<PaymentIntent, PaymentError>> {
        self.retrieve(id).boxed()
    }
}

// =============================================================================
// Stub
// =============================================================================

/// In-memory gateway for tests and offline development.
///
/// Intents start as `requires_payment_method`; [`StubPaymentGateway::complete`]
/// marks one as paid.
#[derive(Debug, Default)]
pub struct StubPaymentGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    next_id: AtomicU64,
}

impl StubPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an intent as succeeded. Returns false for unknown ids.
    pub fn complete(&self, id: &str) -> bool {
        match self.intents.lock() {
            Ok(mut intents) => match intents.get_mut(id) {
                Some(intent) => {
                    intent.status = STATUS_SUCCEEDED.to_string();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

impl PaymentGateway for StubPaymentGateway {
    fn create_intent(&self, request: CreateIntent) -> BoxFuture<'_, Result<PaymentIntent, PaymentError>> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("pi_stub_{}", n);
        let intent = PaymentIntent {
            id: id.clone(),
            client_secret: Some(format!("{}_secret_{}", id, n)),
            amount: request.amount.minor_units(),
            currency: request.currency.gateway_code().to_string(),
            status: "requires_payment_method".to_string(),
        };

        let result = match self.intents.lock() {
            Ok(mut intents) => {
                intents.insert(id, intent.clone());
                Ok(intent)
            }
            Err(_) => Err(PaymentError::Transport("stub store poisoned".to_string())),
        };
        async move { result }.boxed()
    }

    fn retrieve_intent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<PaymentIntent, PaymentError>> {
        let result = match self.intents.lock() {
            Ok(intents) => intents
                .get(id)
                .cloned()
                .ok_or_else(|| PaymentError::NotFound(id.to_string())),
            Err(_) => Err(PaymentError::Transport("stub store poisoned".to_string())),
        };
        async move { result }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(status: &str, amount: i64, currency: &str) -> PaymentIntent {
        PaymentIntent {
            id: "pi_1".to_string(),
            client_secret: None,
            amount,
            currency: currency.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_verify_requires_success_amount_and_currency() {
        let total = Money::from_minor(150_000);

        assert!(intent("succeeded", 150_000, "inr").verify(total, Currency::Inr).is_ok());
        assert!(intent("processing", 150_000, "inr").verify(total, Currency::Inr).is_err());
        assert!(intent("succeeded", 149_999, "inr").verify(total, Currency::Inr).is_err());
        assert!(intent("succeeded", 150_000, "bhd").verify(total, Currency::Inr).is_err());
    }

    #[tokio::test]
    async fn test_stub_lifecycle() {
        let gateway = StubPaymentGateway::new();

        let created = gateway
            .create_intent(CreateIntent {
                amount: Money::from_minor(12_345),
                currency: Currency::Bhd,
                items: serde_json::json!([]),
            })
            .await
            .unwrap();

        assert_eq!(created.currency, "bhd");
        assert!(created.client_secret.is_some());
        assert_ne!(created.status, STATUS_SUCCEEDED);

        assert!(gateway.complete(&created.id));
        let paid = gateway.retrieve_intent(&created.id).await.unwrap();
        assert_eq!(paid.status, STATUS_SUCCEEDED);

        assert!(matches!(
            gateway.retrieve_intent("pi_missing").await,
            Err(PaymentError::NotFound(_))
        ));
    }

    /// Serves one charge and one intent; everything else is a 404.
    async fn fake_stripe() -> String {
        use axum::routing::get;
        use axum::Json;

        let object = |id: &'static str| {
            move || async move {
                Json(serde_json::json!({
                    "id": id,
                    "amount": 150_000,
                    "currency": "inr",
                    "status": "succeeded",
                }))
            }
        };
        let app = axum::Router::new()
            .route("/v1/charges/ch_A", get(object("ch_A")))
            .route("/v1/payment_intents/pi_A", get(object("pi_A")));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[test]
    fn test_endpoint_keeps_id_in_one_segment() {
        let gateway = StripeGateway::new("sk_test", "https://api.stripe.test/");

        let url = gateway
            .endpoint(&["v1", "payment_intents", "../charges/ch_A"])
            .unwrap();
        assert_eq!(url.path(), "/v1/payment_intents/..%2Fcharges%2Fch_A");
    }

    #[tokio::test]
    async fn test_retrieve_stays_on_payment_intents() {
        let gateway = StripeGateway::new("sk_test", fake_stripe().await);

        let intent = gateway.retrieve_intent("pi_A").await.unwrap();
        assert_eq!(intent.id, "pi_A");

        assert!(matches!(
            gateway.retrieve_intent("../charges/ch_A").await,
            Err(PaymentError::NotFound(_))
        ));
    }
}
