//! End-to-end tests for correlation id assignment over a live HTTP server.

use std::net::SocketAddr;

use axum::routing::get;
use axum::{Extension, Router};
use wiretap::stack::{priority, Pipeline};
use wiretap::{CorrelationId, RequestLogConfig, RequestLogLayer};

async fn whoami(Extension(id): Extension<CorrelationId>) -> String {
    id.to_string()
}

async fn start_test_server() -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/whoami", get(whoami))
        .route("/api/orders", get(|| async { "orders" }));

    let router = Pipeline::new()
        .register(priority::CORRELATION, "correlation", |r| {
            r.layer(RequestLogLayer::tagging())
        })
        .register(priority::REQUEST_LOG, "request-log", |r| {
            r.layer(RequestLogLayer::new(RequestLogConfig::logging()))
        })
        .apply(router);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

#[tokio::test]
async fn inbound_id_is_reused_verbatim() {
    let (addr, shutdown) = start_test_server().await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/health"))
        .header("X-Request-Id", "abc-123")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.headers().get("x-request-id").unwrap(), "abc-123");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn missing_id_is_generated_and_differs_per_request() {
    let (addr, shutdown) = start_test_server().await;
    let url = format!("http://{addr}/health");

    let first = reqwest::get(&url).await.unwrap();
    let second = reqwest::get(&url).await.unwrap();

    let first_id = first.headers().get("x-request-id").unwrap().to_str().unwrap().to_owned();
    let second_id = second.headers().get("x-request-id").unwrap().to_str().unwrap().to_owned();

    assert!(!first_id.trim().is_empty());
    assert!(!second_id.trim().is_empty());
    assert_ne!(first_id, second_id);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn blank_id_counts_as_absent() {
    let (addr, shutdown) = start_test_server().await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/health"))
        .header("X-Request-Id", "   ")
        .send()
        .await
        .unwrap();

    let id = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(!id.trim().is_empty());
    assert_ne!(id, "   ");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn handler_observes_the_same_id_the_response_carries() {
    let (addr, shutdown) = start_test_server().await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/whoami"))
        .header("X-Request-Id", "corr-42")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.headers().get("x-request-id").unwrap(), "corr-42");
    assert_eq!(resp.text().await.unwrap(), "corr-42");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn business_paths_still_get_tagged() {
    // The logger skips /api/*, but the tagging stage covers every path.
    let (addr, shutdown) = start_test_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/orders")).await.unwrap();
    assert!(resp.headers().get("x-request-id").is_some());

    let _ = shutdown.send(());
}
