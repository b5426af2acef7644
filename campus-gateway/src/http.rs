//! HTTP adapter for a Razorpay-style payment gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use campus_types::{GatewayError, Money, PaymentConfirmation, PaymentGateway, PaymentOrder};

use crate::signature;

/// Order creation request body, as the gateway expects it.
#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    amount: i64,
    currency: String,
    receipt: &'a str,
}

/// Order object returned by the gateway.
#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

/// Payment gateway adapter talking to the real gateway over HTTP.
///
/// The key id doubles as the publishable checkout key; the key secret signs
/// confirmations and never leaves the server.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpGateway {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    #[tracing::instrument(skip(self), fields(amount = amount.amount(), receipt))]
    async fn create_order(
        &self,
        amount: Money,
        receipt: &str,
    ) -> Result<PaymentOrder, GatewayError> {
        let body = OrderRequest {
            amount: amount.amount(),
            currency: amount.currency().to_string(),
            receipt,
        };

        let resp = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("HTTP {}: {}", status, detail)));
        }

        let order: OrderResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("malformed order response: {}", e)))?;

        tracing::debug!(order_id = %order.id, "gateway order created");

        Ok(PaymentOrder {
            order_id: order.id,
            amount,
            receipt: receipt.to_string(),
        })
    }

    fn checkout_key(&self) -> &str {
        &self.key_id
    }

    fn verify_confirmation(&self, confirmation: &PaymentConfirmation) -> bool {
        signature::verify_confirmation(confirmation, &self.key_secret)
    }
}
