use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::StripeConfig;

/// What the checkout redirector asks the payment processor for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub user_id: i64,
    pub customer_email: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider secret key is not configured")]
    NotConfigured,
    #[error("payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("checkout session {0} has no redirect url")]
    MissingUrl(String),
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

/// Stripe Checkout over the plain REST API (form-encoded `v1/checkout/sessions`).
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &StripeConfig) -> Self {
        Self::new(cfg.secret_key.clone(), cfg.api_base.clone())
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured);
        }

        // The user id travels both on the session and on the subscription so
        // either webhook shape can be mapped back to an account.
        let user_id = req.user_id.to_string();
        let form = [
            ("mode", "subscription"),
            ("payment_method_types[]", "card"),
            ("line_items[0][price]", req.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("success_url", req.success_url.as_str()),
            ("cancel_url", req.cancel_url.as_str()),
            ("client_reference_id", user_id.as_str()),
            ("customer_email", req.customer_email.as_str()),
            ("subscription_data[metadata][user_id]", user_id.as_str()),
        ];

        let res = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.json::<ErrorBody>().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message: body
                    .error
                    .message
                    .unwrap_or_else(|| status.to_string()),
            });
        }

        let session = res.json::<SessionObject>().await?;
        debug!(session_id = %session.id, "stripe checkout session created");
        match session.url {
            Some(url) => Ok(CheckoutSession { id: session.id, url }),
            None => Err(PaymentError::MissingUrl(session.id)),
        }
    }
}
