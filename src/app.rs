use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{cart, claims, donations, notifications};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(donations::router())
                .merge(cart::router())
                .merge(claims::router())
                .merge(notifications::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub fn bind_addr() -> anyhow::Result<SocketAddr> {
    let addr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;
    Ok(addr)
}

pub async fn serve<F>(app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = bind_addr()?;
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::donations::repo_types::sample_donation;

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health() {
        let (state, _) = AppState::fake();
        let app = build_app(state);
        let res = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cart_add_then_checkout_round_trip() {
        let (state, fakes) = AppState::fake();
        let d = sample_donation(5);
        let id = d.id;
        fakes.inventory.insert(d).await;
        let app = build_app(state);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(json!({ "userId": "Ravi@Example.com", "donationId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cart"]["userId"], "ravi@example.com");
        assert_eq!(body["cart"]["items"][0]["quantity"], 5);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(json!({ "userId": "ravi@example.com", "donationId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Item already exists in cart");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cart/checkout",
            Some(json!({
                "userId": "ravi@example.com",
                "claims": [{ "donationId": id, "servings": 2 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Checkout successful! Donations updated.");
        assert_eq!(body["donations"][0]["quantity"], 3);
        assert_eq!(body["donations"][0]["status"], "available");
        assert_eq!(body["cart"]["items"], json!([]));
        assert_eq!(body["lines"][0]["outcome"], "applied");
        assert_eq!(body["lines"][0]["granted"], 2);
    }

    #[tokio::test]
    async fn checkout_validation_is_400() {
        let (state, _) = AppState::fake();
        let app = build_app(state);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cart/checkout",
            Some(json!({ "claims": [{ "donationId": "x", "servings": 1 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "userId is required");

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/cart/checkout",
            Some(json!({ "userId": "a@example.com", "claims": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cart/checkout",
            Some(json!({ "userId": "a@example.com", "claims": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Claims are required");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cart/checkout",
            Some(json!({
                "userId": "a@example.com",
                "claims": [{ "donationId": uuid::Uuid::new_v4(), "servings": 1 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cart is empty");
    }

    #[tokio::test]
    async fn malformed_bodies_are_400_with_message() {
        let (state, _) = AppState::fake();
        let app = build_app(state);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(json!({ "userId": 5, "donationId": uuid::Uuid::new_v4() })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, body) = call(
            &app,
            Method::DELETE,
            "/api/cart/remove",
            Some(json!(["not", "an", "object"])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/notifications/mark-all-read",
            Some(json!({ "email": true })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, body) = call(&app, Method::POST, "/api/notifications/test", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn donation_reads() {
        let (state, fakes) = AppState::fake();
        let d = sample_donation(2);
        let id = d.id;
        fakes.inventory.insert(d).await;
        let app = build_app(state);

        let (status, body) = call(&app, Method::GET, &format!("/api/donations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.to_string());

        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/donations/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, Method::GET, "/api/donations/donor/PRIYA", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = call(&app, Method::GET, "/api/donations/donor/nobody", None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn cart_get_creates_and_clear_missing_is_404() {
        let (state, _) = AppState::fake();
        let app = build_app(state);

        let (status, _) = call(&app, Method::DELETE, "/api/cart/clear/new@example.com", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, Method::GET, "/api/cart/new@example.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], json!([]));

        let (status, body) = call(&app, Method::DELETE, "/api/cart/clear/new@example.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Cart cleared successfully");
    }

    #[tokio::test]
    async fn notification_feed_flow() {
        let (state, _) = AppState::fake();
        let app = build_app(state);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/notifications/test",
            Some(json!({ "email": "ravi@example.com", "pushToken": "tok" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["notification"]["id"].as_str().unwrap().to_string();

        let (_, body) = call(&app, Method::GET, "/api/notifications/user/ravi@example.com", None).await;
        assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
        assert_eq!(body["notifications"][0]["type"], "test");

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/api/notifications/read/{id}"),
            Some(json!({ "email": "someone-else@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/notifications/mark-all-read",
            Some(json!({ "email": "ravi@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (_, body) = call(
            &app,
            Method::DELETE,
            "/api/notifications/clear-all",
            Some(json!({ "email": "ravi@example.com" })),
        )
        .await;
        assert_eq!(body["count"], 1);
    }
}
