//! Collector daemon for the telem in-memory telemetry store.
//!
//! Loads configuration from (in precedence order): defaults, config file,
//! environment variables (`TELEM_*`), and CLI flags. Starts the collector
//! core with both expiry sweepers, serves the ingest/query HTTP endpoints,
//! and runs until graceful shutdown (SIGINT/SIGTERM).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use config::{Config, Environment, File};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::graceful::GracefulShutdown;
use telem::telemetry::op_metrics;
use telem::{Collector, CollectorConfig, ExecEvent, MetricPoint, StoreError};

// ---------- CLI ----------

/// telem collector daemon.
#[derive(Parser, Debug)]
#[command(name = "telemd", version, about)]
pub struct Cli {
    /// Path to config file (TOML). If omitted, no file is loaded unless the default path exists.
    #[arg(long, env = "TELEM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not load any config file; use defaults + env + CLI only.
    #[arg(long, default_value_t = false)]
    pub no_config: bool,

    /// Load and validate config (file + env + CLI), print effective settings, then exit.
    #[arg(long, default_value_t = false)]
    pub validate_config: bool,

    /// HTTP listen address (e.g. 127.0.0.1:8080 or 0.0.0.0:8080).
    #[arg(long, env = "TELEM_HTTP_BIND")]
    pub http_bind: Option<String>,

    /// Override metric retention TTL in seconds.
    #[arg(long, env = "TELEM_METRIC_TTL_SECS")]
    pub metric_ttl_secs: Option<u64>,
}

// ---------- File/env config (all optional for partial config) ----------

/// Top-level daemon config as read from file + env. Every field optional for layering.
#[derive(Debug, Default, serde::Deserialize)]
pub struct DaemonFileConfig {
    /// HTTP listen address (e.g. "127.0.0.1:8080").
    pub http_bind: Option<String>,
    pub metric_ttl_secs: Option<u64>,
    pub metric_sweep_interval_secs: Option<u64>,
    pub event_ttl_secs: Option<u64>,
    pub event_sweep_interval_secs: Option<u64>,
}

/// Runtime options for the daemon derived from config + env + CLI.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Address to bind the HTTP server.
    pub http_bind: SocketAddr,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            http_bind: "127.0.0.1:8080".parse().expect("default http_bind"),
        }
    }
}

/// Parse `http_bind` string to `SocketAddr`. Returns error message on failure.
fn parse_http_bind(s: &str) -> Result<SocketAddr, String> {
    s.parse::<SocketAddr>()
        .map_err(|e| format!("invalid http_bind {:?}: {}", s, e))
}

/// Load merged config and daemon options. CLI overrides file/env for both.
fn load_daemon_config(cli: &Cli) -> Result<(CollectorConfig, DaemonOptions), String> {
    let mut builder = Config::builder();

    if !cli.no_config {
        if let Some(ref path) = cli.config {
            if !path.exists() {
                return Err(format!("config file not found: {}", path.display()));
            }
            builder = builder.add_source(File::from(path.as_path()).required(false));
        } else {
            let default_path = PathBuf::from("telemd.toml");
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path.as_path()).required(false));
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("TELEM")
            .separator("__")
            .try_parsing(true)
            .ignore_empty(true),
    );

    let merged = builder.build().map_err(|e| e.to_string())?;
    let partial: DaemonFileConfig = merged.try_deserialize().map_err(|e| e.to_string())?;

    let mut collector_config = CollectorConfig::default();
    merge_into_collector_config(&mut collector_config, &partial)?;

    if let Some(secs) = cli.metric_ttl_secs {
        collector_config.metric_ttl = Duration::from_secs(secs);
    }

    if collector_config.metric_ttl.is_zero() || collector_config.event_ttl.is_zero() {
        return Err("retention TTL must be a positive number of seconds".to_string());
    }
    if collector_config.metric_sweep_interval.is_zero()
        || collector_config.event_sweep_interval.is_zero()
    {
        return Err("sweep interval must be a positive number of seconds".to_string());
    }

    let http_bind_str = cli
        .http_bind
        .as_deref()
        .or(partial.http_bind.as_deref())
        .unwrap_or("127.0.0.1:8080");
    let http_bind = parse_http_bind(http_bind_str)?;

    let options = DaemonOptions { http_bind };
    Ok((collector_config, options))
}

/// Merge file/env partial config onto `CollectorConfig`. Only overwrites fields that are `Some`.
fn merge_into_collector_config(
    base: &mut CollectorConfig,
    partial: &DaemonFileConfig,
) -> Result<(), String> {
    if let Some(secs) = partial.metric_ttl_secs {
        base.metric_ttl = Duration::from_secs(secs);
    }
    if let Some(secs) = partial.metric_sweep_interval_secs {
        base.metric_sweep_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = partial.event_ttl_secs {
        base.event_ttl = Duration::from_secs(secs);
    }
    if let Some(secs) = partial.event_sweep_interval_secs {
        base.event_sweep_interval = Duration::from_secs(secs);
    }
    Ok(())
}

// ---------- HTTP service ----------

/// Shared state for the HTTP service.
struct AppState {
    collector: Collector,
    ready: Arc<AtomicBool>,
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("response build")
}

fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .expect("response build"),
        Err(e) => text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("encoding error: {}", e),
        ),
    }
}

async fn read_body(req: Request<Incoming>) -> Result<Bytes, hyper::Error> {
    Ok(req.into_body().collect().await?.to_bytes())
}

/// POST /metrics: decode one sample, stamp unset timestamps, append.
async fn ingest_metric(state: &AppState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let body = match read_body(req).await {
        Ok(b) => b,
        Err(e) => return text_response(StatusCode::BAD_REQUEST, &format!("read error: {}", e)),
    };
    let mut point: MetricPoint = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(_) => return text_response(StatusCode::BAD_REQUEST, "invalid json"),
    };
    if point.name.is_empty() {
        return text_response(StatusCode::BAD_REQUEST, "name must not be empty");
    }
    if point.timestamp == 0 {
        point.timestamp = state.collector.now();
    }
    match state.collector.add_metric(point) {
        Ok(()) => text_response(StatusCode::ACCEPTED, ""),
        Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// GET /metrics/stats: aggregate snapshot for all known series.
fn metric_stats(state: &AppState) -> Response<Full<Bytes>> {
    match state.collector.stats() {
        Ok(stats) => json_response(StatusCode::OK, &stats),
        Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Window parameter in seconds; defaults to 10 when missing or unparseable.
fn window_from_query(query: Option<&str>) -> i64 {
    query
        .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("window=")))
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(10)
}

/// GET /metrics/rate?window=N: per-series rate over the trailing window.
fn metric_rate(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    let window = window_from_query(query);
    match state.collector.rate(window) {
        Ok(rates) => json_response(StatusCode::OK, &rates),
        Err(e @ StoreError::InvalidWindow { .. }) => {
            text_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// POST /events: decode one exec event, stamp unset timestamps, append.
async fn ingest_event(state: &AppState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let body = match read_body(req).await {
        Ok(b) => b,
        Err(e) => return text_response(StatusCode::BAD_REQUEST, &format!("read error: {}", e)),
    };
    let mut event: ExecEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(_) => return text_response(StatusCode::BAD_REQUEST, "invalid json"),
    };
    if event.name.is_empty() {
        return text_response(StatusCode::BAD_REQUEST, "name must not be empty");
    }
    if event.timestamp == 0 {
        event.timestamp = state.collector.now();
    }
    match state.collector.add_exec(event) {
        Ok(()) => text_response(StatusCode::ACCEPTED, ""),
        Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// GET /events: snapshot of the retained event log.
fn list_events(state: &AppState) -> Response<Full<Bytes>> {
    match state.collector.exec_events() {
        Ok(events) => json_response(StatusCode::OK, &events),
        Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn collector_service(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    let known_path = matches!(
        path.as_str(),
        "/metrics" | "/metrics/stats" | "/metrics/rate" | "/events" | "/healthz" | "/readyz"
    );

    let response = if method == Method::POST && path == "/metrics" {
        ingest_metric(&state, req).await
    } else if method == Method::GET && path == "/metrics/stats" {
        metric_stats(&state)
    } else if method == Method::GET && path == "/metrics/rate" {
        metric_rate(&state, query.as_deref())
    } else if method == Method::POST && path == "/events" {
        ingest_event(&state, req).await
    } else if method == Method::GET && path == "/events" {
        list_events(&state)
    } else if method == Method::GET && path == "/healthz" {
        // Liveness: process is alive and responding.
        text_response(StatusCode::OK, "ok")
    } else if method == Method::GET && path == "/readyz" {
        // Readiness: collector constructed and sweepers running.
        if state.ready.load(Ordering::Acquire) {
            text_response(StatusCode::OK, "ok")
        } else {
            text_response(StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
    } else if known_path {
        text_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else {
        text_response(StatusCode::NOT_FOUND, "not found")
    };
    Ok(response)
}

/// Returns a future that completes when SIGINT (Ctrl+C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("ctrl_c handler");
    };
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

/// Runs the daemon: serves the collector endpoints, waits for the shutdown
/// signal, drains connections, then drops the collector (stopping both
/// sweepers).
async fn run_server(
    collector: Collector,
    options: DaemonOptions,
    ready: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(options.http_bind)
        .await
        .map_err(|e| format!("failed to bind {}: {}", options.http_bind, e))?;
    eprintln!(
        "telemd running (metric_ttl={}s, event_ttl={}s, http={}). Press Ctrl+C or send SIGTERM to stop.",
        collector.get_config().metric_ttl.as_secs(),
        collector.get_config().event_ttl.as_secs(),
        options.http_bind
    );

    let state = Arc::new(AppState { collector, ready });
    let server = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut shutdown = std::pin::pin!(shutdown_signal());

    loop {
        tokio::select! {
            Ok((stream, _addr)) = listener.accept() => {
                let io = TokioIo::new(Box::pin(stream));
                let state = Arc::clone(&state);
                let conn = server.serve_connection_with_upgrades(io, service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { collector_service(state, req).await }
                }));
                let fut = graceful.watch(conn.into_owned());
                tokio::spawn(async move {
                    if let Err(e) = fut.await {
                        eprintln!("connection error: {:?}", e);
                    }
                });
            }
            _ = &mut shutdown => {
                eprintln!("shutdown signal received");
                break;
            }
        }
    }

    drop(listener);
    const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
    tokio::select! {
        _ = graceful.shutdown() => {
            eprintln!("all connections closed");
        }
        _ = tokio::time::sleep(SHUTDOWN_TIMEOUT) => {
            eprintln!("shutdown timeout waiting for connections");
        }
    }

    eprintln!("stopping sweepers...");
    drop(state);
    eprintln!("shutdown complete");
    Ok(())
}

// ---------- Main ----------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let (collector_config, options) = load_daemon_config(&cli).map_err(|e| {
        eprintln!("config error: {}", e);
        e
    })?;

    if cli.validate_config {
        println!("http_bind={}", options.http_bind);
        println!("metric_ttl_secs={}", collector_config.metric_ttl.as_secs());
        println!(
            "metric_sweep_interval_secs={}",
            collector_config.metric_sweep_interval.as_secs()
        );
        println!("event_ttl_secs={}", collector_config.event_ttl.as_secs());
        println!(
            "event_sweep_interval_secs={}",
            collector_config.event_sweep_interval.as_secs()
        );
        return Ok(());
    }

    // Register metric descriptions up front; recording stays a no-op until
    // an exporter installs a recorder.
    op_metrics::describe_all();

    let collector = Collector::with_config(collector_config).map_err(|e| {
        eprintln!("failed to start collector: {}", e);
        e
    })?;

    let ready = Arc::new(AtomicBool::new(true));
    run_server(collector, options, ready).await
}
