//! End-to-end coverage of the hand-rolled HTTP transport: a real TCP
//! connection against a server bound to an ephemeral port.

use shardcache::cache::{new_cache, CacheOptions};
use shardcache::http::Server;
use shardcache::metrics::prometheus::PrometheusMeter;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn start_server() -> std::net::SocketAddr {
    let meter = Arc::new(PrometheusMeter::new());
    let cache = Arc::new(new_cache(CacheOptions::new(meter.as_ref())).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(Server::new(cache, meter));
    tokio::spawn(server.serve(listener));
    addr
}

async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    stream.shutdown().await.ok();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn health_check_returns_ok() {
    let addr = start_server().await;
    let response = raw_request(addr, "GET /health HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#"{"status":"ok"}"#));
}

#[tokio::test]
async fn set_then_get_round_trips_through_http() {
    let addr = start_server().await;
    let body = "hello world";
    let set_request = format!(
        "POST /api/v1/cache/mykey HTTP/1.1\r\nHost: x\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let set_response = raw_request(addr, &set_request).await;
    assert!(set_response.starts_with("HTTP/1.1 200"));

    let get_response = raw_request(addr, "GET /api/v1/cache/mykey HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(get_response.starts_with("HTTP/1.1 200"));
    assert!(get_response.ends_with(body));
}

#[tokio::test]
async fn get_missing_key_is_404() {
    let addr = start_server().await;
    let response = raw_request(addr, "GET /api/v1/cache/absent HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404"));
}

#[tokio::test]
async fn post_empty_body_is_400() {
    let addr = start_server().await;
    let request = "POST /api/v1/cache/k HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n";
    let response = raw_request(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 400"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let addr = start_server().await;
    let response = raw_request(addr, "GET /nope HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404"));
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let addr = start_server().await;
    let response = raw_request(addr, "GET /metrics HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200"));
}
