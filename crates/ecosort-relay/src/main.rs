//! EcoSort Relay
//!
//! Receives camera uploads, asks Gemini to classify the pictured item, and
//! returns a normalized biodegradable / non-biodegradable / hazardous verdict.

use anyhow::{Context, Result};
use clap::Parser;
use ecosort_relay::cli::LogFormat;
use ecosort_relay::{create_router, AppState, Cli, RelayConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.log_format);

    info!("Starting EcoSort relay");

    let api_key = cli
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .context("Missing GEMINI_API_KEY (set it in the environment, .env, or pass --api-key)")?;

    // Load configuration
    let config = RelayConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!("Model: {}", config.model);
    info!("Endpoint: {}", config.api_base_url);
    info!("Upload mode: {:?}, limit {} bytes", config.upload.mode, config.upload.max_upload_bytes);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    let state = AppState::new(config, &api_key, metrics_handle)?;

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Relay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("ecosort=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecosort=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        // Span fields carry the per-request id into every line
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .init(),
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("ecosort_requests_total", "Total number of /analyze requests");
    metrics::describe_counter!("ecosort_results_total", "Classification results by label");
    metrics::describe_counter!(
        "ecosort_remote_attempts_total",
        "Remote model attempts by outcome"
    );
    metrics::describe_histogram!(
        "ecosort_remote_latency_ms",
        metrics::Unit::Milliseconds,
        "Remote model call latency in milliseconds"
    );
    metrics::describe_counter!("ecosort_errors_total", "Total number of errors by kind");

    info!("Metrics exporter initialized");
    Ok(handle)
}
