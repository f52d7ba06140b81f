use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use reqlog::prelude::*;
use reqlog::MemorySink;
use std::convert::Infallible;
use std::time::Duration;
use tower::{service_fn, Layer, ServiceExt};

#[derive(Debug, thiserror::Error)]
#[error("upstream unavailable")]
struct UpstreamError;

async fn echo(req: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
    let status = if req.uri().path().starts_with("/missing") {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    let body = req.into_body().collect().await.unwrap().to_bytes();
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("set-cookie", "session=abc")
        .body(Full::new(body))
        .unwrap())
}

fn runtime(sink: &MemorySink) -> Runtime {
    Runtime::builder()
        .config(RuntimeConfig::new().flush_interval(Duration::from_secs(3600)))
        .sink(sink.clone())
        .build()
        .unwrap()
}

fn json_request(path: &str, body: &'static str) -> Request<Full<Bytes>> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("authorization", "Bearer s3cr3t")
        .header("x-request-id", "req-42")
        .header("x-forwarded-for", "198.51.100.4")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

#[tokio::test]
async fn test_records_request_and_response() {
    let sink = MemorySink::new();
    let runtime = runtime(&sink);
    runtime.start().await.unwrap();

    let config = CaptureConfig::new()
        .capture_request_body(true)
        .capture_response_body(true);
    let service = RecordLayer::new(runtime.handle(), config).layer(service_fn(echo));

    let response = service
        .oneshot(json_request("/login", r#"{"user":"ana","password":"pw"}"#))
        .await
        .unwrap();

    // The handler still sees the original body.
    let echoed = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&echoed[..], br#"{"user":"ana","password":"pw"}"#);

    runtime.shutdown().await;
    let records = sink.records();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.method, "POST");
    assert_eq!(record.path, "/login");
    assert_eq!(record.status, 200);
    assert_eq!(record.severity, Severity::Info);
    assert_eq!(record.correlation_id, "req-42");
    assert_eq!(record.client_addr.as_deref(), Some("198.51.100.4"));
    assert_eq!(record.content_type.as_deref(), Some("application/json"));

    let request_headers = record.request_headers.as_ref().unwrap();
    assert_eq!(request_headers["authorization"], "Bearer ***");
    let response_headers = record.response_headers.as_ref().unwrap();
    assert_eq!(response_headers["set-cookie"], "***");

    let request_body = record.request_body.as_ref().unwrap();
    assert_eq!(
        request_body.raw.as_deref(),
        Some(r#"{"user":"ana","password":"***"}"#)
    );
    assert!(record.response_body.is_some());
}

#[tokio::test]
async fn test_denied_paths_are_not_recorded() {
    let sink = MemorySink::new();
    let runtime = runtime(&sink);
    runtime.start().await.unwrap();

    let config = CaptureConfig::new().deny_path("/health");
    let layer = RecordLayer::new(runtime.handle(), config);

    for path in ["/health", "/health/ready", "/missing/7"] {
        let request = Request::get(path).body(Full::new(Bytes::new())).unwrap();
        layer
            .layer(service_fn(echo))
            .oneshot(request)
            .await
            .unwrap();
    }

    runtime.shutdown().await;
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 404);
    assert_eq!(records[0].severity, Severity::Error);
    assert!(records[0].request_body.is_none());
}

#[tokio::test]
async fn test_inner_error_is_recorded_and_propagated() {
    let sink = MemorySink::new();
    let runtime = runtime(&sink);
    runtime.start().await.unwrap();

    let failing = service_fn(|_req: Request<Full<Bytes>>| async {
        Err::<Response<Full<Bytes>>, _>(UpstreamError)
    });
    let service = RecordLayer::new(runtime.handle(), CaptureConfig::new()).layer(failing);

    let request = Request::get("/orders").body(Full::new(Bytes::new())).unwrap();
    let err = service.oneshot(request).await.unwrap_err();
    assert_eq!(err.to_string(), "upstream unavailable");

    runtime.shutdown().await;
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 500);
    assert_eq!(records[0].severity, Severity::Critical);

    let exception = records[0].exception.as_ref().unwrap();
    assert!(exception.type_name.ends_with("UpstreamError"));
    assert_eq!(exception.message.as_deref(), Some("upstream unavailable"));
    assert!(!records[0].correlation_id.is_empty());
}

#[tokio::test]
async fn test_disabled_runtime_skips_capture() {
    let sink = MemorySink::new();
    let runtime = Runtime::builder()
        .config(RuntimeConfig::new().enabled(false))
        .sink(sink.clone())
        .build()
        .unwrap();

    let service = RecordLayer::new(runtime.handle(), CaptureConfig::new()).layer(service_fn(echo));
    let request = Request::get("/users").body(Full::new(Bytes::new())).unwrap();
    let response = service.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(runtime.buffered(), 0);
}
