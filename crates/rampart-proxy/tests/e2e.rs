//! End-to-end tests: a real server on an ephemeral port, driven over HTTP.

use rampart_contract::{SpecSource, Specification};
use rampart_proxy::aggregate::Aggregator;
use rampart_proxy::delay::DelaySampler;
use rampart_proxy::mock::MockResolver;
use rampart_proxy::proxy::client::create_http_client;
use rampart_proxy::proxy::{LifecycleHandle, ProxyServer, ProxyState, TargetMode};
use rampart_proxy::validator::ReloadableValidator;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const SPEC: &str = r#"
title: Mock Data API
resources:
  - path: /v1/data
    actions:
      - method: GET
        query_parameters: [q]
        responses:
          - status: 200
"#;

struct TestServer {
    addr: SocketAddr,
    state: Arc<ProxyState>,
    task: JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

async fn start_server(state: Arc<ProxyState>) -> TestServer {
    let server = ProxyServer::new(Arc::clone(&state));
    let listener = server.bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });
    TestServer { addr, state, task }
}

async fn start_mock_server(dir: &std::path::Path) -> TestServer {
    std::fs::write(dir.join("data.json"), "42").unwrap();
    let spec_path = dir.join("spec.yaml");
    std::fs::write(&spec_path, SPEC).unwrap();

    let aggregator = Arc::new(Aggregator::new());
    let state = Arc::new(ProxyState {
        mode: TargetMode::Mock {
            resolver: MockResolver::new(dir),
        },
        delay: DelaySampler::none(),
        aggregator: Arc::clone(&aggregator),
        validator: Arc::new(ReloadableValidator::with_spec(
            SpecSource::new(spec_path.to_string_lossy(), None, false),
            Specification::parse(SPEC).unwrap(),
        )),
        lifecycle: LifecycleHandle::new(aggregator),
    });
    start_server(state).await
}

async fn start_proxy_server(upstream: SocketAddr, spec_dir: &std::path::Path) -> TestServer {
    let spec_path = spec_dir.join("front-spec.yaml");
    std::fs::write(&spec_path, SPEC).unwrap();

    let aggregator = Arc::new(Aggregator::new());
    let state = Arc::new(ProxyState {
        mode: TargetMode::Proxy {
            upstream: format!("http://{upstream}"),
            client: create_http_client(),
        },
        delay: DelaySampler::none(),
        aggregator: Arc::clone(&aggregator),
        validator: Arc::new(ReloadableValidator::with_spec(
            SpecSource::new(spec_path.to_string_lossy(), None, false),
            Specification::parse(SPEC).unwrap(),
        )),
        lifecycle: LifecycleHandle::new(aggregator),
    });
    start_server(state).await
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn mock_exchange_round_trips_and_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_mock_server(dir.path()).await;
    let client = http_client();

    let response = client
        .get(server.url("/v1/data?q=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "42");

    let reports = client
        .get(server.url("/@@@proxy/reports"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let document: serde_json::Value = serde_json::from_str(&reports).unwrap();
    let entries = document["Mock Data API"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], 0);
    assert_eq!(entries[0]["request"], "GET /v1/data?q=1");
    assert_eq!(
        entries[0]["requestViolations"].as_array().unwrap().len(),
        0
    );
}

#[tokio::test]
async fn stop_acknowledges_then_tears_the_listener_down() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_mock_server(dir.path()).await;
    let client = http_client();

    let body = client
        .get(server.url("/@@@proxy/stop"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Stopping proxy");

    // the socket must become unreachable within a bounded grace window;
    // a fresh client per attempt defeats keep-alive connection reuse
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        match http_client().get(server.url("/v1/data")).send().await {
            Err(_) => break,
            Ok(_) => {
                assert!(
                    tokio::time::Instant::now() < deadline,
                    "listener still reachable after the grace window"
                );
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
    server.task.await.unwrap();
}

#[tokio::test]
async fn ping_with_clear_usage_acknowledges_and_clears() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_mock_server(dir.path()).await;
    let client = http_client();

    // populate usage first
    client
        .get(server.url("/v1/data?q=1"))
        .send()
        .await
        .unwrap();
    assert!(!server.state.aggregator.usage_document().is_empty());

    let body = client
        .get(server.url("/@@@proxy/ping?clear-usage=true"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Pong\nUsage cleared");

    let usage = client
        .get(server.url("/@@@proxy/usage"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let document: serde_json::Value = serde_json::from_str(&usage).unwrap();
    assert_eq!(document, serde_json::json!({}));
}

#[tokio::test]
async fn proxied_exchange_reaches_the_backend_and_is_reported() {
    let backend_dir = tempfile::tempdir().unwrap();
    let backend = start_mock_server(backend_dir.path()).await;
    let front_dir = tempfile::tempdir().unwrap();
    let front = start_proxy_server(backend.addr, front_dir.path()).await;
    let client = http_client();

    let response = client
        .get(front.url("/v1/data?q=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "42");

    // both hops validated the exchange independently
    assert_eq!(front.state.aggregator.report_count(), 1);
    assert_eq!(backend.state.aggregator.report_count(), 1);
}

#[tokio::test]
async fn ignore_marker_passes_commands_through_to_the_backend() {
    let backend_dir = tempfile::tempdir().unwrap();
    let backend = start_mock_server(backend_dir.path()).await;
    let front_dir = tempfile::tempdir().unwrap();
    let front = start_proxy_server(backend.addr, front_dir.path()).await;
    let client = http_client();

    // the marker suppresses the front proxy's dispatcher, and is stripped
    // before forwarding, so the backend's own dispatcher answers
    let body = client
        .get(front.url("/@@@proxy/ping"))
        .header("X-Ignore-Commands", "true")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Pong");

    // the front proxy treated it as data traffic: validated and recorded
    assert_eq!(front.state.aggregator.report_count(), 1);
    // the backend answered it as a command: nothing recorded there
    assert_eq!(backend.state.aggregator.report_count(), 0);

    // without the marker the front proxy answers directly
    let body = client
        .get(front.url("/@@@proxy/ping"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Pong");
    assert_eq!(front.state.aggregator.report_count(), 1);
}
