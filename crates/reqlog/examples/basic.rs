//! Drives a few requests through a recorded tower service and prints the
//! resulting records.
//!
//! ```sh
//! RUST_LOG=reqlog=info,reqlog_core=debug cargo run -p reqlog --example basic
//! ```

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use reqlog::prelude::*;
use std::convert::Infallible;
use std::time::Duration;
use tower::{service_fn, Layer, ServiceExt};
use tracing_subscriber::EnvFilter;

async fn app(req: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
    let (status, body) = match req.uri().path() {
        "/users" => (StatusCode::OK, r#"[{"id":1,"name":"Ana","cpf":"123.456.789-00"}]"#),
        "/login" => (StatusCode::UNAUTHORIZED, r#"{"error":"invalid credentials"}"#),
        "/health" => (StatusCode::OK, r#"{"status":"ok"}"#),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"boom"}"#),
    };
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .expect("static response"))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reqlog=info")),
        )
        .init();

    let runtime = Runtime::builder()
        .config(
            RuntimeConfig::new()
                .batch_size(10)
                .flush_interval(Duration::from_millis(200)),
        )
        .sink(ConsoleSink::stdout(ConsoleFormat::Pretty))
        .sink(TracingSink::new())
        .build()?;
    runtime.start().await?;

    let capture = CaptureConfig::new()
        .capture_request_body(true)
        .capture_response_body(true)
        .deny_path("/health")
        .severity(SeverityOverrides::new().path("/internal", Severity::Warning));
    let layer = RecordLayer::new(runtime.handle(), capture);

    let requests = [
        ("GET", "/users", ""),
        ("POST", "/login", r#"{"user":"ana","password":"hunter2"}"#),
        ("GET", "/health", ""),
        ("GET", "/internal/jobs", ""),
    ];
    for (method, path, body) in requests {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .header("authorization", "Bearer demo-token")
            .body(Full::new(Bytes::from_static(body.as_bytes())))?;
        let response = layer.layer(service_fn(app)).oneshot(request).await?;
        tracing::info!(%method, path, status = %response.status(), "request served");
    }

    runtime.shutdown().await;
    Ok(())
}
