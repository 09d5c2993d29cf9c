use anyhow::Context;
use axum::http::HeaderName;
use clap::Parser;
use tether_gateway::bootstrap::build_shortener;
use tether_gateway::cli::{Cli, LogFormatArg};
use tether_gateway::{App, AppState};
use tether_telemetry::{LogFormat, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormatArg::Text => LogFormat::Text,
        LogFormatArg::Json => LogFormat::Json,
    };
    tether_telemetry::init(&TelemetryConfig::default().with_format(format))?;

    let principal_header = HeaderName::try_from(cli.principal_header.as_str())
        .context("invalid principal header name")?;
    let shortener = build_shortener(&cli).await?;
    let state = AppState::new(shortener, &cli.public_base_url, principal_header);

    let listener = tokio::net::TcpListener::bind(cli.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen_addr))?;
    info!(
        listen_addr = %listener.local_addr()?,
        public_base_url = %cli.public_base_url,
        "starting gateway server"
    );

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
