use color_eyre::eyre::{Result, WrapErr, eyre};
use echosrv::common::{create_test_server, create_test_server_with_config};
use echosrv::{
    ClientConfigBuilder, EchoDataHandler, EchoHandler, EchoServerTrait, HttpClient, HttpConfig,
    HttpServer,
};
use serde_json::{Value, json};
use std::sync::Once;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "echosrv=warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Writes raw bytes and reads the response until the server closes
async fn raw_exchange(addr: std::net::SocketAddr, request: &[u8]) -> Result<String> {
    let mut stream = TcpStream::connect(addr)
        .await
        .wrap_err("Failed to connect to test server")?;
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .wrap_err("Failed to read response")?;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

#[tokio::test]
async fn test_text_echo_over_http() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoHandler::new()).await?;
    let client = HttpClient::new(addr);

    let request = http::Request::get("/status")
        .header("X-Test", "1")
        .body(bytes::Bytes::new())?;
    let response = client.send(request).await?;

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(response.headers()["server"], "EchoHandler");

    let body = String::from_utf8(response.body().to_vec())?;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "GET /status");
    assert!(lines.contains(&"* X-Test: \"1\""));
    assert!(lines.contains(&"* Content-Length: \"0\""));
    assert!(!lines.iter().any(|line| line.starts_with("* Host:")));
    assert!(body.ends_with('\n'));

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_text_echo_body_after_headers() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoHandler::new()).await?;
    let client = HttpClient::new(addr);

    let response = client.post("/upload", "first line\nsecond line").await?;
    let body = String::from_utf8(response.body().to_vec())?;

    assert!(body.starts_with("POST /upload\n"));
    assert!(body.ends_with("\nfirst line\nsecond line"));
    assert!(body.contains("* Content-Length: \"22\"\n"));

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_json_echo_over_http() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoDataHandler::new()).await?;
    let client = HttpClient::new(addr);

    let response = client.post("/data", r#"{"x":5}"#).await?;
    assert_eq!(response.headers()["server"], "EchoDataHandler");
    assert_eq!(response.headers()["content-type"], "application/json");

    let doc: Value = serde_json::from_slice(response.body())?;
    assert_eq!(doc["method"], "POST");
    assert_eq!(doc["path"], "/data");
    assert_eq!(doc["bodystr"], r#"{"x":5}"#);
    assert_eq!(doc["body"], json!({"x": 5}));
    assert_eq!(doc["Content-Length"], "7");
    assert_eq!(doc["Connection"], "close");
    assert!(doc.get("Host").is_none());
    assert!(doc.get("bodyerr").is_none());

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_json_echo_reports_parse_error() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoDataHandler::new()).await?;
    let client = HttpClient::new(addr);

    let response = client.post("/data", "not-json").await?;
    let doc: Value = serde_json::from_slice(response.body())?;

    assert_eq!(doc["bodystr"], "not-json");
    assert_eq!(doc["body"], Value::Null);
    let err = doc["bodyerr"]
        .as_str()
        .ok_or_else(|| eyre!("bodyerr missing from {doc}"))?;
    assert!(!err.is_empty());

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_head_request_has_no_body() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoHandler::new()).await?;

    let response = raw_exchange(addr, b"HEAD /peek HTTP/1.1\r\nHost: test\r\n\r\n").await?;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Server: EchoHandler\r\n"));
    assert!(response.ends_with("\r\n\r\n"));

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_malformed_request_rejected() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoHandler::new()).await?;

    let response = raw_exchange(addr, b"THIS IS NOT HTTP\r\n\r\n").await?;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_chunked_request_is_decoded() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoHandler::new()).await?;

    let response = raw_exchange(
        addr,
        b"POST /stream HTTP/1.1\r\nHost: test\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n",
    )
    .await?;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));

    let (_, body) = response
        .split_once("\r\n\r\n")
        .ok_or_else(|| eyre!("no header terminator in {response:?}"))?;
    assert_eq!(
        body,
        "POST /stream\n* Content-Length: \"11\"\nhello world"
    );

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_chunked_json_request_is_decoded() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoDataHandler::new()).await?;

    let response = raw_exchange(
        addr,
        b"PUT /data HTTP/1.1\r\nHost: test\r\nTransfer-Encoding: chunked\r\n\r\n4\r\n{\"x\"\r\n3\r\n:5}\r\n0\r\n\r\n",
    )
    .await?;
    let (_, body) = response
        .split_once("\r\n\r\n")
        .ok_or_else(|| eyre!("no header terminator in {response:?}"))?;
    let doc: Value = serde_json::from_str(body)?;

    assert_eq!(doc["body"], json!({"x": 5}));
    assert_eq!(doc["Content-Length"], "7");
    assert!(doc.get("Transfer-Encoding").is_none());

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_unknown_transfer_coding_not_implemented() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoHandler::new()).await?;

    let response = raw_exchange(
        addr,
        b"POST / HTTP/1.1\r\nHost: test\r\nTransfer-Encoding: gzip\r\n\r\n",
    )
    .await?;
    assert!(response.starts_with("HTTP/1.1 501 Not Implemented\r\n"));

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_percent_encoded_path_is_decoded() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoHandler::new()).await?;
    let client = HttpClient::new(addr);

    let response = client.get("/a%20b/c%2Fd").await?;
    let body = String::from_utf8(response.body().to_vec())?;
    assert!(body.starts_with("GET /a b/c/d\n"));

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_body_over_limit_rejected() -> Result<()> {
    init_tracing();
    let config = HttpConfig {
        max_body_size: 16,
        ..Default::default()
    };
    let (server_handle, addr) = create_test_server_with_config(config, EchoHandler::new()).await?;
    let client = HttpClient::new(addr);

    let response = client.post("/big", vec![b'x'; 64]).await?;
    assert_eq!(response.status(), http::StatusCode::PAYLOAD_TOO_LARGE);

    let response = client.post("/small", vec![b'x'; 16]).await?;
    assert_eq!(response.status(), http::StatusCode::OK);

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_each_get_own_echo() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoDataHandler::new()).await?;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = HttpClient::new(addr);
        tasks.push(tokio::spawn(async move {
            let path = format!("/item/{i}");
            let body = format!(r#"{{"id":{i}}}"#);
            let response = client.post(&path, body).await?;
            let doc: Value = serde_json::from_slice(response.body())?;
            Ok::<_, color_eyre::eyre::Report>((i, doc))
        }));
    }

    for task in tasks {
        let (i, doc) = task.await??;
        assert_eq!(doc["path"], format!("/item/{i}"));
        assert_eq!(doc["body"]["id"], i);
    }

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_server_shutdown_signal() -> Result<()> {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = HttpServer::new(
        HttpConfig {
            bind_addr: addr,
            ..Default::default()
        },
        EchoHandler::new(),
    );
    let shutdown = server.shutdown_signal();
    let server_handle = tokio::spawn(async move { server.serve(listener).await });

    let client = HttpClient::new(addr);
    let response = client.get("/before-shutdown").await?;
    assert_eq!(response.status(), http::StatusCode::OK);

    shutdown.send(()).map_err(|e| eyre!("shutdown send failed: {e}"))?;
    let result = tokio::time::timeout(Duration::from_secs(5), server_handle)
        .await
        .wrap_err("Server did not stop after shutdown signal")??;
    assert!(result.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_client_response_size_limit() -> Result<()> {
    init_tracing();
    let (server_handle, addr) = create_test_server(EchoHandler::new()).await?;
    let config = ClientConfigBuilder::new().max_response_size(64).build();
    let client = HttpClient::with_config(addr, config);

    let result = client.post("/", vec![b'y'; 1024]).await;
    assert!(matches!(result, Err(echosrv::EchoError::Config(_))));

    server_handle.abort();
    Ok(())
}
