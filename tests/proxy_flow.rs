//! End-to-end tests: client → relay → mock upstream.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;

mod common;

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_models_request_end_to_end() {
    let (backend, mut requests) = common::start_recording_backend(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"data\":[]}",
    )
    .await;
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", backend)).await;

    let res = common::client()
        .get(format!("http://{}/release/v1/models?limit=5", proxy))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body = res.text().await.unwrap();
    assert_eq!(body, "{\"data\":[]}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"], serde_json::json!([]));

    let seen = requests.recv().await.unwrap();
    assert!(
        seen.starts_with("GET /v1/models?limit=5 HTTP/1.1\r\n"),
        "unexpected request line: {seen}"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_path_and_query_bytes_reach_upstream_unchanged() {
    let (backend, mut requests) = common::start_recording_backend(
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
    )
    .await;
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", backend)).await;

    // Written by hand: HTTP client libraries normalize both parts.
    let response = timeout(
        TIMEOUT,
        common::send_raw(
            proxy,
            "GET /release/v1/a/../b?$filter=name%20eq%20'x'&q=a'b HTTP/1.1\r\nHost: relay\r\nConnection: close\r\n\r\n",
        ),
    )
    .await
    .unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "unexpected response: {response}");
    assert!(response.ends_with("ok"));

    let seen = requests.recv().await.unwrap();
    assert!(
        seen.starts_with("GET /v1/a/../b?$filter=name%20eq%20'x'&q=a'b HTTP/1.1\r\n"),
        "unexpected request line: {seen}"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_identity_headers_never_reach_upstream() {
    let (backend, mut requests) = common::start_recording_backend(
        "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n",
    )
    .await;
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", backend)).await;

    let res = common::client()
        .get(format!("http://{}/v1/chat", proxy))
        .header("X-Forwarded-For", "1.2.3.4")
        .header("X-Real-IP", "1.2.3.4")
        .header("Client-IP", "1.2.3.4")
        .header("Cookie", "a=1")
        .header("Cookie", "b=2")
        .header("Authorization", "Bearer sk-client")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let seen = requests.recv().await.unwrap().to_lowercase();
    assert!(!seen.contains("x-forwarded-for"));
    assert!(!seen.contains("x-real-ip"));
    assert!(!seen.contains("client-ip"));
    assert!(!seen.contains("1.2.3.4"));
    assert_eq!(seen.matches("\r\ncookie: ").count(), 2, "cookies: {seen}");
    assert!(seen.contains("\r\ncookie: a=1\r\n"));
    assert!(seen.contains("\r\ncookie: b=2\r\n"));
    // Untouched for non AI-platform hosts.
    assert!(seen.contains("\r\nauthorization: bearer sk-client\r\n"));
    // Host names the upstream, not the relay.
    assert!(seen.contains(&format!("\r\nhost: {}\r\n", backend)));

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_body_is_forwarded() {
    let (backend, mut requests) = common::start_recording_backend(
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
    )
    .await;
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", backend)).await;

    let payload = r#"{"model":"gpt-4o","stream":true}"#;
    let res = common::client()
        .post(format!("http://{}/test/v1/chat/completions", proxy))
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "ok");

    let seen = requests.recv().await.unwrap();
    assert!(seen.starts_with("POST /v1/chat/completions HTTP/1.1\r\n"));
    assert!(seen.ends_with(payload), "body not forwarded: {seen}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_status_passes_through() {
    let backend = common::start_mock_backend(
        "429 Too Many Requests",
        "application/json",
        r#"{"error":{"type":"rate_limit"}}"#,
    )
    .await;
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", backend)).await;

    let res = common::client()
        .get(format!("http://{}/v1/models", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(res.text().await.unwrap(), r#"{"error":{"type":"rate_limit"}}"#);

    shutdown.trigger();
}

#[tokio::test]
async fn test_stream_is_delivered_incrementally() {
    let (release, released) = oneshot::channel();
    let backend = common::start_staged_backend(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\nb\r\ndata: one\n\n\r\n",
        "b\r\ndata: two\n\n\r\n0\r\n\r\n",
        released,
    )
    .await;
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", backend)).await;

    // The upstream is holding the rest of its body, so both the head and
    // the first event must arrive without waiting for completion.
    let mut res = timeout(
        TIMEOUT,
        common::client()
            .post(format!("http://{}/v1/chat/completions", proxy))
            .send(),
    )
    .await
    .expect("headers were held back")
    .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/event-stream");

    let first = timeout(TIMEOUT, res.chunk())
        .await
        .expect("first event was held back")
        .unwrap()
        .unwrap();
    assert_eq!(&first[..], b"data: one\n\n");

    release.send(()).unwrap();
    let mut rest = Vec::new();
    while let Some(chunk) = timeout(TIMEOUT, res.chunk()).await.unwrap().unwrap() {
        rest.extend_from_slice(&chunk);
    }
    assert_eq!(rest, b"data: two\n\n");

    shutdown.trigger();
}

#[tokio::test]
async fn test_truncated_upstream_truncates_client() {
    let (backend, _requests) = common::start_recording_backend(
        "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nonly ten b",
    )
    .await;
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", backend)).await;

    let res = common::client()
        .get(format!("http://{}/v1/files/abc/content", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(timeout(TIMEOUT, res.bytes()).await.unwrap().is_err());

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_returns_500() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", dead)).await;

    let res = common::client()
        .get(format!("http://{}/v1/models", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert!(!res.text().await.unwrap().is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let backend = common::start_mock_backend("200 OK", "text/plain", "pong").await;
    let (proxy, shutdown, _) = common::start_proxy(format!("http://{}", backend)).await;

    let client = common::client();
    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let url = format!("http://{}/v1/ping/{}", proxy, i);
        tasks.push(tokio::spawn(async move {
            let res = client.get(&url).send().await.unwrap();
            (res.status(), res.text().await.unwrap())
        }));
    }

    for task in tasks {
        let (status, body) = task.await.unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, "pong");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let (_, shutdown, handle) = common::start_proxy("http://127.0.0.1:1".to_string()).await;

    shutdown.trigger();
    timeout(TIMEOUT, handle)
        .await
        .expect("server did not stop")
        .unwrap();
}
