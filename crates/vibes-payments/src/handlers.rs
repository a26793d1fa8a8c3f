use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info, warn};
use vibes_types::api::{
    CreateOrderRequest, ErrorResponse, OrderResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};

use crate::config::DEFAULT_CURRENCY;
use crate::provider::{NewOrder, OrderProvider};
use crate::signature;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub provider: Arc<dyn OrderProvider>,
    pub key_secret: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Provider(String),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        };
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Major units to minor units, rejecting anything that is not a positive amount.
pub fn to_minor_units(amount: f64) -> Result<u64, ApiError> {
    let minor = (amount * 100.0).round();
    if !amount.is_finite() || minor < 1.0 || minor > u64::MAX as f64 {
        return Err(ApiError::BadRequest("Amount must be a positive number".into()));
    }
    Ok(minor as u64)
}

pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<OrderResponse>, ApiError> {
    let req: CreateOrderRequest = json_body(&headers, &body)?;
    let amount = to_minor_units(req.amount)?;

    let currency = req
        .currency
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let notes = match (req.notes, req.description) {
        (Some(Value::Object(mut notes)), Some(description)) => {
            notes.insert("description".into(), Value::String(description));
            Some(Value::Object(notes))
        }
        (None, Some(description)) => Some(json!({ "description": description })),
        (notes, _) => notes,
    };

    let order = state
        .provider
        .create_order(NewOrder {
            amount,
            currency,
            receipt: None,
            notes,
        })
        .await
        .map_err(|e| {
            error!("Order creation failed: {:#}", e);
            ApiError::Provider("Failed to create order".into())
        })?;

    info!("Order {} created for {} {}", order.id, order.amount, order.currency);
    Ok(Json(order))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let req: VerifyPaymentRequest = json_body(&headers, &body)?;
    if req.order_id.is_empty() || req.payment_id.is_empty() || req.signature.is_empty() {
        return Err(ApiError::BadRequest("Missing payment confirmation fields".into()));
    }

    let verified = signature::verify(&state.key_secret, &req.order_id, &req.payment_id, &req.signature);
    if verified {
        info!("Payment {} verified for order {}", req.payment_id, req.order_id);
    } else {
        warn!("Signature mismatch for order {}", req.order_id);
    }
    Ok(Json(VerifyPaymentResponse { verified }))
}

/// Plain `OPTIONS` requests. CORS preflights are answered by the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn json_body<T: DeserializeOwned>(headers: &HeaderMap, body: &[u8]) -> Result<T, ApiError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));
    if !is_json {
        return Err(ApiError::BadRequest("Content-Type must be application/json".into()));
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_round_to_minor_units() {
        assert_eq!(to_minor_units(499.0).unwrap(), 49_900);
        assert_eq!(to_minor_units(19.999).unwrap(), 2_000);
        assert_eq!(to_minor_units(0.01).unwrap(), 1);
        assert!(to_minor_units(0.0).is_err());
        assert!(to_minor_units(0.004).is_err());
        assert!(to_minor_units(-10.0).is_err());
        assert!(to_minor_units(f64::INFINITY).is_err());
        assert!(to_minor_units(f64::NAN).is_err());
    }
}
