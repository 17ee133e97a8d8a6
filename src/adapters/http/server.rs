//! HTTP server assembly and lifecycle.
//!
//! Builds the full router (health check plus webhook routes behind the
//! trace and timeout layers) and serves it until shutdown is signalled
//! on the shared watch channel, letting in-flight deliveries finish.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::webhook::{webhook_routes, BillingAppState};

/// Webhook bodies are small event pointers; anything bigger is noise.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the complete application router.
pub fn app_router(state: BillingAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/webhooks", webhook_routes())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router until shutdown is signalled.
pub async fn serve(
    addr: SocketAddr,
    state: BillingAppState,
    request_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let app = app_router(state, request_timeout);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    // Sender dropped; treat as shutdown.
                    break;
                }
            }
            tracing::info!("webhook server shutting down");
        })
        .await
}

/// GET /health - Liveness probe.
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use secrecy::SecretString;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::adapters::memory::{
        InMemoryBillingStore, InMemoryWebhookLedger, StubPaymentGateway,
    };
    use crate::application::webhook::{WebhookIngestor, WebhookVerifier};
    use crate::domain::foundation::{ManualClock, Timestamp};

    fn state() -> BillingAppState {
        let clock = Arc::new(ManualClock::new(Timestamp::from_unix_secs(1_700_000_000)));
        let (tx, _rx) = mpsc::channel(16);

        let ingestor = WebhookIngestor::new(
            WebhookVerifier::new(SecretString::new("whsec_server_test".to_string())),
            Arc::new(InMemoryWebhookLedger::new()),
            Arc::new(InMemoryBillingStore::new()),
            Arc::new(StubPaymentGateway::new()),
            clock,
            tx,
        );

        BillingAppState {
            ingestor: Arc::new(ingestor),
        }
    }

    #[tokio::test]
    async fn health_check_responds_ok() {
        let app = app_router(state(), Duration::from_secs(30));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_route_is_mounted_under_webhooks() {
        let app = app_router(state(), Duration::from_secs(30));

        // No signature header: the route exists and rejects with 401
        // rather than axum's 404/405.
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/mercadopago")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
