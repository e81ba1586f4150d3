//! Throughput engine against a local mock server

use cdn_network_bench::{
    client::ClientFactory,
    output::MemorySink,
    CancelScope, Config, Direction, ThroughputEngine,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(max_bytes: i64, timeout_seconds: u64) -> Config {
    Config {
        max_bytes,
        timeout_seconds,
        ..Default::default()
    }
}

fn engine(config: &Config, sink: Arc<MemorySink>) -> ThroughputEngine {
    let client = ClientFactory::new().create_probe_client().unwrap();
    ThroughputEngine::new(client, config, sink)
}

#[tokio::test]
async fn download_caps_each_worker_independently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1_500_000]))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 10), sink)
        .run(&CancelScope::new(), Direction::Download, 4, &format!("{}/large", server.uri()))
        .await;

    assert_eq!(result.total_bytes, 4_000_000);
    assert_eq!(result.fault_count, 0);
    assert!(!result.had_fault);
    assert_eq!(result.threads, 4);
    assert!(result.mbps > 0.0);
}

#[tokio::test]
async fn download_sends_client_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .and(header("accept", "*/*"))
        .and(header("accept-encoding", "identity"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 4_096]))
        .expect(2)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 10), sink)
        .run(&CancelScope::new(), Direction::Download, 2, &format!("{}/large", server.uri()))
        .await;

    // Short body: end of stream is not a fault
    assert_eq!(result.total_bytes, 8_192);
    assert_eq!(result.fault_count, 0);

    let requests = server.received_requests().await.unwrap();
    let agent = requests[0].headers.get("user-agent").unwrap();
    assert_eq!(agent.to_str().unwrap(), cdn_network_bench::defaults::USER_AGENT);
    let language = requests[0].headers.get("accept-language").unwrap();
    assert_eq!(language.to_str().unwrap(), "zh-CN,zh-Hans;q=0.9");
}

#[tokio::test]
async fn download_error_status_is_a_fault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(500).set_body_bytes(vec![0u8; 10_000]))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 10), sink)
        .run(&CancelScope::new(), Direction::Download, 3, &format!("{}/large", server.uri()))
        .await;

    assert_eq!(result.total_bytes, 0);
    assert_eq!(result.fault_count, 3);
    assert!(result.had_fault);
}

#[tokio::test]
async fn download_timeout_is_a_fault_and_pass_stays_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 1), sink)
        .run(&CancelScope::new(), Direction::Download, 2, &format!("{}/large", server.uri()))
        .await;

    assert_eq!(result.fault_count, 2);
    assert!(result.duration < Duration::from_secs(4));
}

#[tokio::test]
async fn progress_is_reported_while_a_pass_runs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 64_000])
                .set_delay(Duration::from_millis(450)),
        )
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 10), sink.clone())
        .with_progress_interval(Duration::from_millis(100))
        .run(&CancelScope::new(), Direction::Download, 1, &format!("{}/large", server.uri()))
        .await;

    assert_eq!(result.total_bytes, 64_000);
    assert!(sink.progress_count("Download") >= 2);
}

#[tokio::test]
async fn upload_counts_every_byte_sent() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/slurp"))
        .and(header("upload-draft-interop-version", "6"))
        .and(header("upload-complete", "?1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 10), sink)
        .run(&CancelScope::new(), Direction::Upload, 2, &format!("{}/slurp", server.uri()))
        .await;

    assert_eq!(result.total_bytes, 2_000_000);
    assert_eq!(result.fault_count, 0);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.body.len() == 1_000_000));
    assert!(requests.iter().all(|r| r.headers.get("content-length").is_none()));
}

#[tokio::test]
async fn rejected_upload_is_rolled_back() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/slurp"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 10), sink)
        .run(&CancelScope::new(), Direction::Upload, 4, &format!("{}/slurp", server.uri()))
        .await;

    assert_eq!(result.total_bytes, 0);
    assert_eq!(result.fault_count, 4);
    assert!(result.had_fault);
}

#[tokio::test]
async fn rollback_only_removes_rejected_workers() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/slurp"))
        .respond_with(ResponseTemplate::new(413))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/slurp"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 10), sink)
        .run(&CancelScope::new(), Direction::Upload, 4, &format!("{}/slurp", server.uri()))
        .await;

    assert_eq!(result.total_bytes, 2_000_000);
    assert_eq!(result.fault_count, 2);
    assert!(result.had_fault);
}

/// Accepts one connection, reads `limit` request bytes, then drops it
async fn drop_after_reading(limit: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 64 * 1024];
        let mut read = 0;
        while read < limit {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => read += n,
            }
        }
    });
    addr
}

/// Accepts one connection and answers with a body shorter than its Content-Length
async fn truncated_body(declared: usize, sent: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", declared);
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&vec![0u8; sent]).await.unwrap();
        socket.flush().await.unwrap();
        let _ = socket.shutdown().await;
    });
    addr
}

#[tokio::test]
async fn upload_transport_error_keeps_sent_bytes() {
    let addr = drop_after_reading(400_000).await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(50_000_000, 10), sink)
        .run(&CancelScope::new(), Direction::Upload, 1, &format!("http://{}/slurp", addr))
        .await;

    assert_eq!(result.fault_count, 1);
    assert!(result.total_bytes > 0);
}

#[tokio::test]
async fn download_read_error_keeps_partial_bytes() {
    let addr = truncated_body(1_000_000, 300_000).await;

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 10), sink)
        .run(&CancelScope::new(), Direction::Download, 1, &format!("http://{}/large", addr))
        .await;

    assert_eq!(result.fault_count, 1);
    assert_eq!(result.total_bytes, 300_000);
}

#[tokio::test]
async fn external_cancellation_ends_pass_early() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let scope = CancelScope::new();
    let trigger = scope.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let sink = Arc::new(MemorySink::new());
    let result = engine(&config(1_000_000, 30), sink)
        .run(&scope, Direction::Download, 2, &format!("{}/large", server.uri()))
        .await;

    assert_eq!(result.fault_count, 2);
    assert!(result.duration < Duration::from_secs(5));
}
