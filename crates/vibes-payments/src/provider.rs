use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vibes_types::api::OrderResponse;

/// An order to open with the provider. `amount` is in minor units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
    pub amount: u64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<serde_json::Value>,
}

#[async_trait]
pub trait OrderProvider: Send + Sync + 'static {
    async fn create_order(&self, order: NewOrder) -> Result<OrderResponse>;
}

/// Orders API of Razorpay, authenticated with the key id and secret.
pub struct RazorpayProvider {
    client: reqwest::Client,
    api_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayProvider {
    pub fn new(api_url: impl Into<String>, key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }
}

#[derive(Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    description: String,
}

#[async_trait]
impl OrderProvider for RazorpayProvider {
    async fn create_order(&self, order: NewOrder) -> Result<OrderResponse> {
        let url = format!("{}/orders", self.api_url);
        debug!("Opening order for {} {}", order.amount, order.currency);

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&order)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<OrderResponse>().await?);
        }

        let reason = match resp.json::<ProviderError>().await {
            Ok(body) => body.error.description,
            Err(_) => status.to_string(),
        };
        warn!("Order provider returned {}: {}", status, reason);
        bail!("Order provider rejected the order: {}", reason)
    }
}
