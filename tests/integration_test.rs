//! Integration tests for subgen
//!
//! Runs the real server over TCP against a mocked upstream list:
//! - Document generation on the trigger path
//! - Empty responses elsewhere
//! - Upstream failures mapped to 500
//! - Secondary list handling

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use serde_yaml::Value;
use subgen::{ConfigServer, GeneratorConfig, HttpListSource, RenderStyle, ServerConfig};
use tokio::time::sleep;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Counter for unique port allocation
static PORT_COUNTER: AtomicU16 = AtomicU16::new(19400);

fn get_unique_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Mount `body` at `route` on the mock upstream
async fn serve_list(upstream: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(upstream)
        .await;
}

/// Start the generator and return its base URL
async fn start_generator(config: GeneratorConfig) -> String {
    let port = get_unique_port();
    let source = HttpListSource::new().unwrap();
    let server = Arc::new(ConfigServer::new(
        ServerConfig { http_port: port },
        config,
        Arc::new(source),
    ));

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Wait for server to start
    sleep(Duration::from_millis(150)).await;

    format!("http://127.0.0.1:{}", port)
}

fn config_for(upstream: &MockServer) -> GeneratorConfig {
    GeneratorConfig {
        hostname: "h.example".to_string(),
        password: "s3cret".to_string(),
        list_url: format!("{}/ips.txt", upstream.uri()),
        ..Default::default()
    }
}

/// Fetch the trigger path and parse the body as YAML
async fn fetch_document(base: &str) -> Value {
    let response = reqwest::get(format!("{}/auto", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    serde_yaml::from_str(&response.text().await.unwrap()).unwrap()
}

fn proxy_names(doc: &Value) -> Vec<String> {
    doc["proxies"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

/// Members of the group called `name`
fn group_members(doc: &Value, name: &str) -> Vec<String> {
    doc["proxy-groups"]
        .as_sequence()
        .unwrap()
        .iter()
        .find(|g| g["name"].as_str() == Some(name))
        .unwrap()["proxies"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_trigger_path_serves_document() {
    let upstream = MockServer::start().await;
    serve_list(&upstream, "/ips.txt", 200, "1.2.3.4#NodeA\n\n5.6.7.8\n").await;

    let base = start_generator(config_for(&upstream)).await;
    let response = reqwest::get(format!("{}/auto", base)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.headers()["access-control-allow-origin"].to_str().unwrap(),
        "*"
    );

    let doc: Value = serde_yaml::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(doc["port"].as_u64(), Some(7890));

    let proxies = doc["proxies"].as_sequence().unwrap();
    assert_eq!(proxies.len(), 2);
    assert_eq!(proxies[0]["server"].as_str(), Some("1.2.3.4"));
    assert_eq!(proxies[1]["server"].as_str(), Some("5.6.7.8"));
    for proxy in proxies {
        assert_eq!(proxy["type"].as_str(), Some("trojan"));
        assert_eq!(proxy["sni"].as_str(), Some("h.example"));
        assert_eq!(proxy["password"].as_str(), Some("s3cret"));
        let port = proxy["port"].as_u64().unwrap();
        assert!([443, 2053, 2096, 8443].contains(&port));
    }

    let expected = vec!["NodeA".to_string(), "5.6.7.8".to_string()];
    assert_eq!(proxy_names(&doc), expected);
    assert_eq!(group_members(&doc, "负载均衡"), expected);
    assert_eq!(group_members(&doc, "自动选择"), expected);

    let select = group_members(&doc, "🌍选择代理");
    assert_eq!(&select[..3], &["负载均衡", "自动选择", "DIRECT"]);
    assert_eq!(&select[3..], &expected[..]);
}

#[tokio::test]
async fn test_duplicate_and_special_labels_over_http() {
    let upstream = MockServer::start().await;
    serve_list(
        &upstream,
        "/ips.txt",
        200,
        "1.2.3.4#X\n9.9.9.9#X #hk\n8.8.8.8#X\n7.7.7.7#HK: fast\n6.6.6.6#*anchor\n5.5.5.5#2096\n",
    )
    .await;

    let base = start_generator(config_for(&upstream)).await;
    let doc = fetch_document(&base).await;

    let expected = vec!["X", "X #hk", "X_2", "HK: fast", "*anchor", "2096"];
    assert_eq!(proxy_names(&doc), expected);
    assert_eq!(group_members(&doc, "负载均衡"), expected);
}

#[tokio::test]
async fn test_other_path_is_empty() {
    let upstream = MockServer::start().await;
    serve_list(&upstream, "/ips.txt", 200, "1.2.3.4#NodeA\n").await;

    let base = start_generator(config_for(&upstream)).await;
    let response = reqwest::get(format!("{}/", base)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("access-control-allow-origin").is_none());
    assert_eq!(response.text().await.unwrap(), "");

    // Unrelated paths must not reach upstream
    let requests = upstream.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_upstream_failure_is_500() {
    let upstream = MockServer::start().await;
    serve_list(&upstream, "/ips.txt", 503, "upstream down").await;

    let base = start_generator(config_for(&upstream)).await;
    let response = reqwest::get(format!("{}/auto", base)).await.unwrap();

    assert_eq!(response.status(), 500);
    let body = response.text().await.unwrap();
    assert!(!body.is_empty());
    assert!(!body.contains("proxies"));
    assert!(!body.contains("upstream down"));
}

#[tokio::test]
async fn test_secondary_list_is_appended() {
    let upstream = MockServer::start().await;
    serve_list(&upstream, "/ips.txt", 200, "1.2.3.4#Edge\n").await;
    serve_list(&upstream, "/domains.txt", 200, "cdn.example:2087#Edge\n").await;

    let config = GeneratorConfig {
        domain_list_url: Some(format!("{}/domains.txt", upstream.uri())),
        style: RenderStyle::Plural,
        ..config_for(&upstream)
    };
    let base = start_generator(config).await;
    let doc = fetch_document(&base).await;

    assert_eq!(proxy_names(&doc), vec!["Edge", "Edge_2"]);
    assert_eq!(doc["proxies"][1]["server"].as_str(), Some("cdn.example"));
    assert_eq!(doc["proxies"][1]["port"].as_u64(), Some(2087));
    assert!(doc["dns"].get("default-nameservers").is_some());
    assert_eq!(group_members(&doc, "负载均衡"), vec!["Edge", "Edge_2"]);
}

#[tokio::test]
async fn test_each_request_refetches() {
    let upstream = MockServer::start().await;
    serve_list(&upstream, "/ips.txt", 200, "1.2.3.4#NodeA\n").await;

    let base = start_generator(config_for(&upstream)).await;
    for _ in 0..2 {
        let doc = fetch_document(&base).await;
        assert_eq!(proxy_names(&doc), vec!["NodeA"]);
    }

    let requests = upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}
