use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

// 1. PaymentService Contract
/// PaymentService
///
/// Opaque external payment-intent collaborator. The API never sees card data;
/// it only asks the provider for a client secret the frontend completes against.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Creates a payment intent for `amount` in the smallest currency unit
    /// and returns its client secret.
    async fn create_payment_intent(&self, amount: i64) -> Result<String, String>;
}

// 2. The Real Implementation (Stripe-compatible HTTP API)
/// HttpPaymentClient
///
/// Talks to a Stripe-compatible `POST /v1/payment_intents` endpoint with a
/// form-encoded body and Bearer secret key.
#[derive(Clone)]
pub struct HttpPaymentClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    currency: String,
}

#[derive(Deserialize)]
struct PaymentIntentBody {
    client_secret: String,
}

impl HttpPaymentClient {
    pub fn new(base_url: &str, secret_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            currency: "usd".to_string(),
        }
    }
}

#[async_trait]
impl PaymentService for HttpPaymentClient {
    async fn create_payment_intent(&self, amount: i64) -> Result<String, String> {
        let url = format!("{}/v1/payment_intents", self.base_url);
        let amount = amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", self.currency.as_str()),
            ("payment_method_types[]", "card"),
        ];

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("payment provider returned {}", response.status()));
        }

        response
            .json::<PaymentIntentBody>()
            .await
            .map(|body| body.client_secret)
            .map_err(|e| e.to_string())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockPaymentService
///
/// Deterministic stand-in used by the test suite.
#[derive(Clone, Default)]
pub struct MockPaymentService {
    /// When true, every call returns a simulated provider failure.
    pub should_fail: bool,
}

impl MockPaymentService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl PaymentService for MockPaymentService {
    async fn create_payment_intent(&self, amount: i64) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Payment Error: Simulation requested".to_string());
        }
        Ok(format!("pi_mock_{amount}_secret_fake"))
    }
}

/// PaymentState
///
/// Shared handle to the payment collaborator.
pub type PaymentState = Arc<dyn PaymentService>;
