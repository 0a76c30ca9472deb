//! Prometheus metrics for the purge CLI.
//!
//! All series live in a crate-local registry under the `discord_purge_`
//! prefix:
//! - `command_duration_seconds{command,status}` (histogram; its count is the
//!   number of runs)
//! - `http_requests_total{endpoint,status}`
//! - `throttled_total{endpoint}`
//! - `messages_total{outcome}`
//! - process metrics

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::core::Collector;
use prometheus::process_collector::ProcessCollector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new_custom(Some("discord_purge".to_string()), None)
        .unwrap_or_else(|err| {
            warn!("Falling back to unprefixed metrics registry: {}", err);
            Registry::new()
        });
    if let Err(err) = registry.register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
    registry
});

fn register<C: Collector + Clone + 'static>(collector: C) -> C {
    if let Err(err) = REGISTRY.register(Box::new(collector.clone())) {
        warn!("Failed to register collector: {}", err);
    }
    collector
}

fn counter(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let vec = IntCounterVec::new(Opts::new(name, help), labels)
        .expect("failed to create counter");
    register(vec)
}

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // 0.5s doubling up to ~4.5h; wiping a large log runs for hours under throttling.
    let opts = HistogramOpts::new("command_duration_seconds", "CLI command duration in seconds")
        .buckets(prometheus::exponential_buckets(0.5, 2.0, 16).unwrap_or_default());
    let vec = HistogramVec::new(opts, &["command", "status"])
        .expect("failed to create command histogram");
    register(vec)
});

static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    counter(
        "http_requests_total",
        "Discord API requests by endpoint and response status",
        &["endpoint", "status"],
    )
});

static THROTTLED: Lazy<IntCounterVec> = Lazy::new(|| {
    counter(
        "throttled_total",
        "Rate-limited responses by endpoint",
        &["endpoint"],
    )
});

static MESSAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    counter(
        "messages_total",
        "Messages processed by outcome",
        &["outcome"],
    )
});

/// Count one API response.
pub fn record_http_response(endpoint: &'static str, status: u16) {
    HTTP_REQUESTS
        .with_label_values(&[endpoint, &status.to_string()])
        .inc();
}

/// Count one throttled response.
pub fn record_throttle(endpoint: &'static str) {
    THROTTLED.with_label_values(&[endpoint]).inc();
}

/// Count messages by outcome (gathered, deleted, already_gone, skipped).
pub fn record_messages(outcome: &'static str, count: u64) {
    MESSAGES.with_label_values(&[outcome]).inc_by(count);
}

/// Record one finished command run.
pub fn record_command(command: &'static str, duration: Duration, success: bool) {
    let status = if success { "ok" } else { "error" };
    COMMAND_DURATION
        .with_label_values(&[command, status])
        .observe(duration.as_secs_f64());
}

/// Text exposition of every registered series.
fn render() -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    let mut response = match encoder.encode(&REGISTRY.gather(), &mut buffer) {
        Ok(()) => Response::new(Full::from(buffer)),
        Err(err) => {
            error!("Failed to encode metrics: {}", err);
            let mut response = Response::new(Full::from("encode error"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            return response;
        }
    };
    if let Ok(content_type) = HeaderValue::from_str(encoder.format_type()) {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}

fn route(path: &str) -> Response<Full<Bytes>> {
    if path == "/metrics" {
        return render();
    }
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

async fn serve(listener: TcpListener) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        tokio::spawn(async move {
            let service =
                service_fn(|req| async move { Ok::<_, Infallible>(route(req.uri().path())) });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Serve `/metrics` on `addr` in the background for the rest of the run.
pub fn spawn_metrics_server(addr: SocketAddr) {
    Lazy::force(&REGISTRY);
    tokio::spawn(async move {
        let result = match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(%addr, "Prometheus metrics endpoint started");
                serve(listener).await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
