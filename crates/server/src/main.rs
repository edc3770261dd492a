mod bootstrap;
mod cleanup;
mod dashboards;
mod health;
mod renderer;
mod routes;

use std::time::Duration;

use anyhow::Result;
use dashshare_core::config::{AppConfig, LoadOptions};
use tokio_util::sync::CancellationToken;

use crate::cleanup::ImageSweeper;

fn init_logging(config: &AppConfig) {
    use dashshare_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap emits anything.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let sweeper_cancel = CancellationToken::new();
    let sweeper = ImageSweeper::from_config(&app.config.rendering).spawn(sweeper_cancel.clone());

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        images_dir = %app.config.rendering.images_dir.display(),
        "dashshare-server listening"
    );
    axum::serve(listener, app.router()).with_graceful_shutdown(wait_for_shutdown()).await?;

    sweeper_cancel.cancel();
    if let Err(error) = sweeper.await {
        tracing::warn!(
            event_name = "system.sweeper.aborted",
            correlation_id = "shutdown",
            error = %error,
            "image sweeper ended abnormally"
        );
    }

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        in_flight = app.tasks.in_flight(),
        grace_secs = grace.as_secs(),
        "draining background unfurls"
    );
    if !app.tasks.shutdown(grace).await {
        tracing::warn!(
            event_name = "system.server.drain_timeout",
            correlation_id = "shutdown",
            abandoned = app.tasks.in_flight(),
            "background unfurls still running at shutdown"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
