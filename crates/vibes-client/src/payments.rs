use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use vibes_types::api::{
    CreateOrderRequest, ErrorResponse, OrderResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};

use crate::error::ClientError;

/// The order-creation and verification service.
#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderResponse>;

    async fn verify(&self, confirmation: &VerifyPaymentRequest) -> Result<bool>;
}

/// What the checkout sheet reports back once the user is done with it.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Succeeded(VerifyPaymentRequest),
    Failed(String),
    Cancelled,
}

/// The interactive part of a payment, owned by the UI.
#[async_trait]
pub trait Checkout: Send + Sync {
    async fn collect(&self, order: &OrderResponse) -> PaymentOutcome;
}

/// [`PaymentGateway`] backed by the `vibes-payments` HTTP service.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderResponse> {
        let url = format!("{}/create-order", self.base_url);
        debug!("Creating order for {} at {}", request.amount, url);

        let resp = self.client.post(&url).json(request).send().await?;
        if resp.status() == StatusCode::OK {
            return Ok(resp.json::<OrderResponse>().await?);
        }
        Err(error_from(resp).await)
    }

    async fn verify(&self, confirmation: &VerifyPaymentRequest) -> Result<bool> {
        let url = format!("{}/verify-payment", self.base_url);
        let resp = self.client.post(&url).json(confirmation).send().await?;
        if resp.status() == StatusCode::OK {
            return Ok(resp.json::<VerifyPaymentResponse>().await?.verified);
        }
        Err(error_from(resp).await)
    }
}

async fn error_from(resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<ErrorResponse>().await {
        Ok(body) => anyhow!(body.error),
        Err(_) => anyhow!("Payment service returned {}", status),
    }
}

/// Local check matching the service's amount validation, so a bad price
/// never reaches the network.
pub fn validate_amount(amount: f64) -> crate::error::Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ClientError::validation("Amount must be a positive number"));
    }
    Ok(())
}
