use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use source_check::api::{self, AppState};
use source_check::config::Config;
use source_check::probe::Prober;
use source_check::telegram::TelegramNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "source_check=info".parse().unwrap()),
        )
        .init();

    let config = Config::load().context("Failed to load config")?;

    let notifier = TelegramNotifier::new(config.telegram.clone())?;
    if !notifier.is_configured() {
        warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set, alerts will not be delivered");
    }
    let prober = Prober::new(Duration::from_secs(config.probe.timeout_secs))?;

    let app = api::router(AppState::new(prober, notifier));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    info!(
        bind_addr = %config.server.bind_addr,
        probe_timeout_secs = config.probe.timeout_secs,
        "Starting source checker"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Shutdown signal received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
