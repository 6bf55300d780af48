use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_DIR: &str = "storage/logs";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logs every request with its matched route, status and latency, and
/// echoes the generated request id in an `x-request-id` header.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let request_id = uuid::Uuid::new_v4().to_string();

    info!(request_id = %request_id, method = %method, path = %path, "Incoming request");

    let mut response = next.run(req).await;
    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;

    if status >= 500 {
        error!(request_id = %request_id, method = %method, path = %path, status, latency_ms, "Server error");
    } else if status >= 400 {
        warn!(request_id = %request_id, method = %method, path = %path, status, latency_ms, "Client error");
    } else {
        info!(request_id = %request_id, method = %method, path = %path, status, latency_ms, "Request completed");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Installs the global subscriber: a console layer filtered by `RUST_LOG`,
/// a daily error log and a daily JSON log, both under `LOG_DIR`.
pub fn init_tracing() -> anyhow::Result<()> {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    std::fs::create_dir_all(&log_dir)?;

    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}=info,gradebook_core=info,tower_http=warn,sqlx=warn",
            env!("CARGO_CRATE_NAME")
        ))
    });

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .with_filter(console_filter);

    let error_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("gradebook")
        .filename_suffix("log")
        .build(&log_dir)?;

    let error_layer = fmt::layer()
        .with_writer(error_appender)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_filter(EnvFilter::new("error"));

    // Structured logs, one JSON object per line; audit events land here too.
    let json_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("gradebook")
        .filename_suffix("json")
        .build(&log_dir)?;

    let json_layer = fmt::layer()
        .json()
        .with_writer(json_appender)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(error_layer)
        .with(json_layer)
        .try_init()?;

    info!(log_dir = %log_dir, "Tracing initialized");
    Ok(())
}
