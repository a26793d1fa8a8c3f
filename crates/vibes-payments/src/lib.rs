//! Payment service: opens provider orders and verifies checkout signatures.

pub mod config;
pub mod handlers;
pub mod provider;
pub mod signature;

use axum::{Router, routing::post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/create-order",
            post(handlers::create_order)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/verify-payment",
            post(handlers::verify_payment)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::bail;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use vibes_types::api::OrderResponse;

    use super::*;
    use crate::handlers::AppStateInner;
    use crate::provider::{NewOrder, OrderProvider};

    const SECRET: &str = "test_secret";

    #[derive(Default)]
    struct StubProvider {
        fail: bool,
        seen: Mutex<Vec<NewOrder>>,
    }

    #[async_trait]
    impl OrderProvider for StubProvider {
        async fn create_order(&self, order: NewOrder) -> anyhow::Result<OrderResponse> {
            if self.fail {
                bail!("connection refused");
            }
            self.seen.lock().unwrap().push(order.clone());
            Ok(OrderResponse {
                id: "order_test1".into(),
                amount: order.amount,
                currency: order.currency,
                status: "created".into(),
            })
        }
    }

    fn app(provider: Arc<StubProvider>) -> Router {
        router(Arc::new(AppStateInner {
            provider,
            key_secret: SECRET.into(),
        }))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_order_converts_to_minor_units() {
        let provider = Arc::new(StubProvider::default());
        let resp = app(provider.clone())
            .oneshot(post_json(
                "/create-order",
                json!({ "amount": 499.5, "description": "24h campaign" }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["id"], "order_test1");
        assert_eq!(body["amount"], 49_950);
        assert_eq!(body["currency"], "INR");
        assert_eq!(body["status"], "created");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].amount, 49_950);
        assert_eq!(seen[0].notes, Some(json!({ "description": "24h campaign" })));
    }

    #[tokio::test]
    async fn create_order_rejects_bad_input() {
        let provider = Arc::new(StubProvider::default());

        let wrong_type = Request::builder()
            .method("POST")
            .uri("/create-order")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"amount": 10}"#))
            .unwrap();
        let malformed = Request::builder()
            .method("POST")
            .uri("/create-order")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from("{amount"))
            .unwrap();

        for req in [
            wrong_type,
            malformed,
            post_json("/create-order", json!({ "amount": 0 })),
            post_json("/create-order", json!({ "amount": -5 })),
            post_json("/create-order", json!({ "amount": "ten" })),
            post_json("/create-order", json!({ "currency": "INR" })),
        ] {
            let resp = app(provider.clone()).oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body = body_json(resp).await;
            assert_eq!(body["status"], "error");
            assert!(body["error"].is_string());
        }
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_a_server_error() {
        let provider = Arc::new(StubProvider {
            fail: true,
            ..StubProvider::default()
        });
        let resp = app(provider)
            .oneshot(post_json("/create-order", json!({ "amount": 10 })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Failed to create order");
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        let resp = app(Arc::new(StubProvider::default()))
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/create-order")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(resp).await["status"], "error");
    }

    #[tokio::test]
    async fn preflight_is_answered_with_cors_headers() {
        let resp = app(Arc::new(StubProvider::default()))
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/create-order")
                    .header(header::ORIGIN, "https://app.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

        let plain = app(Arc::new(StubProvider::default()))
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/verify-payment")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(plain.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn verify_payment_checks_signature() {
        let signed = signature::sign(SECRET, "order_test1", "pay_1").unwrap();

        let resp = app(Arc::new(StubProvider::default()))
            .oneshot(post_json(
                "/verify-payment",
                json!({ "orderId": "order_test1", "paymentId": "pay_1", "signature": signed }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["verified"], true);

        let resp = app(Arc::new(StubProvider::default()))
            .oneshot(post_json(
                "/verify-payment",
                json!({ "orderId": "order_test1", "paymentId": "pay_2", "signature": signed }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["verified"], false);

        let resp = app(Arc::new(StubProvider::default()))
            .oneshot(post_json("/verify-payment", json!({ "orderId": "order_test1" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
