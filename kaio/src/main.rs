// Kaio - weekly wellness plan tracker
// Entry point: logging, configuration, and the regeneration loop

use kaio::config::AppConfig;
use kaio::services::CredentialManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kaio=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Kaio v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env();
    tracing::debug!("Resolved configuration: {:?}", config);

    if !CredentialManager::has_api_key() {
        tracing::warn!("No generation API key found; regeneration will fail until one is configured");
    }

    let state = kaio::app::setup(&config).await?;

    {
        let store = state.store.lock().await;
        let summary = store.history_summary();
        tracing::info!(
            "Viewing {}, {} tracked days, {:.0}% of tasks completed",
            store.current_day(),
            summary.days,
            summary.completion_rate
        );
    }

    let scheduler = state.regenerator.clone().start(config.poll_interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    scheduler.abort();

    Ok(())
}
