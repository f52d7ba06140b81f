//! Tower middleware recording every request/response cycle.
//!
//! [`RecordLayer`] wraps a service over `http::Request<Full<Bytes>>`. For
//! each request it consults the endpoint filter, times the call, optionally
//! buffers bodies, builds a [`Record`](reqlog_core::Record) and submits it
//! through a [`RuntimeHandle`]. Responses and errors pass through unchanged.
//!
//! # Example
//!
//! ```ignore
//! use reqlog::prelude::*;
//! use tower::ServiceBuilder;
//!
//! let runtime = Runtime::builder().sink(ConsoleSink::stdout(ConsoleFormat::Pretty)).build()?;
//! runtime.start().await?;
//!
//! let service = ServiceBuilder::new()
//!     .layer(RecordLayer::new(runtime.handle(), CaptureConfig::new().deny_path("/health")))
//!     .service(app);
//! ```

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request, Response};
use http_body_util::{BodyExt, Full};
use reqlog_core::{ActivityTimer, CaptureConfig, RecordBuilder, RuntimeHandle};
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Headers consulted, in order, for the correlation id.
pub const CORRELATION_HEADERS: [&str; 2] = ["x-request-id", "x-correlation-id"];

/// Layer producing [`RecordService`].
#[derive(Clone)]
pub struct RecordLayer {
    handle: RuntimeHandle,
    config: Arc<CaptureConfig>,
}

impl RecordLayer {
    /// Record requests through `handle`, governed by `config`.
    pub fn new(handle: RuntimeHandle, config: CaptureConfig) -> Self {
        Self {
            handle,
            config: Arc::new(config),
        }
    }

    /// The capture configuration in use.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl<S> Layer<S> for RecordLayer {
    type Service = RecordService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecordService {
            inner,
            handle: self.handle.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

/// Service recording each call to the wrapped service.
#[derive(Clone)]
pub struct RecordService<S> {
    inner: S,
    handle: RuntimeHandle,
    config: Arc<CaptureConfig>,
}

impl<S> Service<Request<Full<Bytes>>> for RecordService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<Full<Bytes>>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if !self.handle.is_enabled() || !self.config.should_capture(req.uri().path()) {
            return Box::pin(inner.call(req));
        }

        let handle = self.handle.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let timer = ActivityTimer::start();

            let method = req.method().to_string();
            let path = req.uri().path().to_string();
            let request_headers = req.headers().clone();
            let content_type = header_str(&request_headers, CONTENT_TYPE.as_str());
            let correlation_id = correlation_id(&request_headers);
            let client_addr = client_addr(&request_headers);

            let capture_request_body = config.captures_request_body()
                && config.is_capturable_content_type(content_type.as_deref());
            let (req, request_body) = if capture_request_body {
                let (req, bytes) = buffer_request(req).await;
                (req, Some(bytes))
            } else {
                (req, None)
            };

            let result = inner.call(req).await;

            let mut builder = RecordBuilder::with_config(&config, method, path)
                .timer(timer)
                .request_headers(&request_headers);
            if let Some(ct) = &content_type {
                builder = builder.content_type(ct.clone());
            }
            if let Some(id) = correlation_id {
                builder = builder.correlation_id(id);
            }
            if let Some(addr) = client_addr {
                builder = builder.client_addr(addr);
            }
            if let Some(bytes) = &request_body {
                builder = builder.request_body(
                    content_type.as_deref(),
                    String::from_utf8_lossy(bytes).into_owned(),
                );
            }

            match result {
                Ok(response) => {
                    let response_type = header_str(response.headers(), CONTENT_TYPE.as_str());
                    let capture_response_body = config.captures_response_body()
                        && config.is_capturable_content_type(response_type.as_deref());

                    let (response, response_body) = if capture_response_body {
                        let (response, bytes) = buffer_response(response).await;
                        (response, Some(bytes))
                    } else {
                        (response, None)
                    };

                    builder = builder
                        .status(response.status().as_u16())
                        .response_headers(response.headers());
                    if let Some(bytes) = &response_body {
                        builder = builder.response_body(
                            response_type.as_deref(),
                            String::from_utf8_lossy(bytes).into_owned(),
                        );
                    }
                    handle.submit(builder.build());
                    Ok(response)
                }
                Err(err) => {
                    handle.submit(builder.status(500).error(&err).build());
                    Err(err)
                }
            }
        })
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn correlation_id(headers: &HeaderMap) -> Option<String> {
    CORRELATION_HEADERS
        .iter()
        .find_map(|name| header_str(headers, name))
}

/// First valid address from `x-forwarded-for`, else `x-real-ip`.
fn client_addr(headers: &HeaderMap) -> Option<String> {
    let forwarded = header_str(headers, "x-forwarded-for").and_then(|value| {
        value
            .split(',')
            .next()
            .map(str::trim)
            .filter(|ip| ip.parse::<IpAddr>().is_ok())
            .map(str::to_string)
    });

    forwarded.or_else(|| {
        header_str(headers, "x-real-ip").filter(|ip| ip.parse::<IpAddr>().is_ok())
    })
}

async fn buffer_request(req: Request<Full<Bytes>>) -> (Request<Full<Bytes>>, Bytes) {
    let (parts, body) = req.into_parts();
    let bytes = collect(body).await;
    (Request::from_parts(parts, Full::new(bytes.clone())), bytes)
}

async fn buffer_response(response: Response<Full<Bytes>>) -> (Response<Full<Bytes>>, Bytes) {
    let (parts, body) = response.into_parts();
    let bytes = collect(body).await;
    (Response::from_parts(parts, Full::new(bytes.clone())), bytes)
}

async fn collect(body: Full<Bytes>) -> Bytes {
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    }
}
