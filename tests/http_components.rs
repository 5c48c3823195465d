//! HTTP and diagnostic servers driven through a full service run.

use std::time::Duration;

use axum::{routing::get, Router};
use svc_lifecycle::http::{DiagnosticServer, HttpService};
use svc_lifecycle::observability::{LogConfigComponent, RuntimeMetricsComponent};
use svc_lifecycle::service::EXIT_OK;
use svc_lifecycle::{with_command_handler, with_global, with_named_component, CompositeComponent, Service};

fn free_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

async fn get_text(url: &str) -> Option<String> {
    for _ in 0..50 {
        if let Ok(response) = reqwest::get(url).await {
            return response.text().await.ok();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}

#[tokio::test]
async fn test_servers_follow_service_lifecycle() {
    let http_addr = free_addr();
    let diag_addr = free_addr();

    let global = CompositeComponent::new([
        with_named_component("log_config", LogConfigComponent::new()),
        with_named_component(
            "runtime_metrics",
            RuntimeMetricsComponent::new().with_interval(Duration::from_millis(10)),
        ),
        with_named_component("profile_server", DiagnosticServer::new()),
    ])
    .unwrap();
    let app = Router::new().route("/", get(|| async { "hello" }));

    let service = Service::new(
        "svc",
        "test",
        [
            with_global(global),
            with_command_handler("serve", "serve", HttpService::new(app)),
        ],
    )
    .unwrap();
    assert!(service.find_component("profile_server").is_some());
    assert!(service.find_component("missing").is_none());

    let handle = service.handle();
    let (http_url, diag_url) = (format!("http://{http_addr}/"), format!("http://{diag_addr}"));
    let client = tokio::spawn(async move {
        let body = get_text(&http_url).await;
        let status = get_text(&format!("{diag_url}/debug/status")).await;
        let metrics = get_text(&format!("{diag_url}/metrics")).await;
        handle.exit(EXIT_OK).await;
        (body, status, metrics)
    });

    let code = service
        .execute_from([
            "svc",
            "--profile-server-enable",
            "--profile-server-addr",
            diag_addr.as_str(),
            "serve",
            "--http-addr",
            http_addr.as_str(),
        ])
        .await
        .unwrap();
    assert_eq!(code, EXIT_OK);

    let (body, status, metrics) = client.await.unwrap();
    assert_eq!(body.as_deref(), Some("hello"));

    let status: serde_json::Value = serde_json::from_str(&status.unwrap()).unwrap();
    assert_eq!(status["service"], "svc");
    assert_eq!(status["status"], "operational");
    assert!(metrics.is_some());

    // Both listeners are closed once execution returns.
    assert!(reqwest::get(format!("http://{http_addr}/")).await.is_err());
    assert!(reqwest::get(format!("http://{diag_addr}/health")).await.is_err());
}
