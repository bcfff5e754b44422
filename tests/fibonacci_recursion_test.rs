use fibload::adapters::bind_shared;
use fibload::app::server;
use fibload::core::FibonacciResult;
use fibload::domain::model::{RouteStyle, SortResult};
use fibload::{AppState, Settings};
use httpmock::prelude::*;
use std::net::SocketAddr;
use std::sync::Arc;

/// Starts one in-process worker whose service URL points back at itself.
async fn start_self_recursive(route_style: RouteStyle) -> TestWorker {
    let listener = bind_shared("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();

    let settings = Settings {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
        service_url: format!("http://{}", addr),
        route_style,
        request_timeout_secs: 30,
        ..Settings::default()
    };

    let state = Arc::new(AppState::from_settings(&settings).unwrap());
    tokio::spawn(server::serve(listener, state));
    TestWorker(addr)
}

/// Starts a worker that delegates sub-calls to `peer_url`.
async fn start_with_peer(peer_url: String, route_style: RouteStyle) -> TestWorker {
    let listener = bind_shared("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();

    let settings = Settings {
        service_url: peer_url,
        route_style,
        ..Settings::default()
    };

    let state = Arc::new(AppState::from_settings(&settings).unwrap());
    tokio::spawn(server::serve(listener, state));
    TestWorker(addr)
}

struct TestWorker(SocketAddr);

impl TestWorker {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.0, path)
    }
}

#[tokio::test]
async fn test_self_recursion_over_http() {
    let worker = start_self_recursive(RouteStyle::Path).await;
    let client = reqwest::Client::new();

    for (n, expected) in [(1u64, 1u64), (2, 1), (5, 5), (10, 55)] {
        let response = client
            .get(worker.url(&format!("/fibonacci/{}", n)))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success(), "n = {}", n);

        let result: FibonacciResult = response.json().await.unwrap();
        assert_eq!(result.value, expected, "n = {}", n);
        assert!(result.start <= result.end);
    }
}

#[tokio::test]
async fn test_self_recursion_query_style() {
    let worker = start_self_recursive(RouteStyle::Query).await;

    let result: FibonacciResult = reqwest::get(worker.url("/fibonacci?n=12"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result.value, 144);
}

#[tokio::test]
async fn test_recursion_against_peer() {
    let peer = MockServer::start_async().await;
    let minus_one = peer
        .mock_async(|when, then| {
            when.method(GET).path("/fibonacci/19");
            then.status(200).json_body(serde_json::json!({ "fibonacci": 4181 }));
        })
        .await;
    let minus_two = peer
        .mock_async(|when, then| {
            when.method(GET).path("/fibonacci/18");
            then.status(200).json_body(serde_json::json!({ "fibonacci": 2584 }));
        })
        .await;

    let worker = start_with_peer(peer.base_url(), RouteStyle::Path).await;
    let result: FibonacciResult = reqwest::get(worker.url("/fibonacci/20"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result.value, 6765);
    minus_one.assert_async().await;
    minus_two.assert_async().await;
}

#[tokio::test]
async fn test_failing_peer_surfaces_as_server_error() {
    let peer = MockServer::start_async().await;
    peer.mock_async(|when, then| {
        when.method(GET).path("/fibonacci/7");
        then.status(200).json_body(serde_json::json!({ "fibonacci": 13 }));
    })
    .await;
    peer.mock_async(|when, then| {
        when.method(GET).path("/fibonacci/6");
        then.status(500);
    })
    .await;

    let worker = start_with_peer(peer.base_url(), RouteStyle::Path).await;
    let response = reqwest::get(worker.url("/fibonacci/8")).await.unwrap();

    assert!(response.status().is_server_error());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], 502);
    assert!(body.get("fibonacci").is_none());
}

#[tokio::test]
async fn test_malformed_peer_body_surfaces_as_server_error() {
    let peer = MockServer::start_async().await;
    peer.mock_async(|when, then| {
        when.method(GET).path("/fibonacci").query_param_exists("n");
        then.status(200).body("{\"fib\": 3}");
    })
    .await;

    let worker = start_with_peer(peer.base_url(), RouteStyle::Query).await;
    let response = reqwest::get(worker.url("/fibonacci?n=6")).await.unwrap();
    assert!(response.status().is_server_error());
}

#[tokio::test]
async fn test_unreachable_peer_surfaces_as_server_error() {
    // Nothing listens on the discard port.
    let worker = start_with_peer("http://127.0.0.1:9".to_string(), RouteStyle::Path).await;
    let response = reqwest::get(worker.url("/fibonacci/4")).await.unwrap();
    assert_eq!(response.status().as_u16(), 502);
}

#[tokio::test]
async fn test_bubble_sort_endpoint() {
    let worker = start_self_recursive(RouteStyle::Path).await;

    let result: SortResult = reqwest::get(worker.url("/bubble-sort?n=2000"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(result.start <= result.end);

    let response = reqwest::get(worker.url("/bubble-sort?n=-1")).await.unwrap();
    assert!(response.status().is_success());
}
