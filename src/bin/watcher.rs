use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wallet_watcher::config::Config;
use wallet_watcher::enricher::Enricher;
use wallet_watcher::notifier::{Notifier, TelegramNotifier};
use wallet_watcher::repository::{CursorStore, TokenCache};
use wallet_watcher::rpc::HeliusClient;
use wallet_watcher::scanner::{Scanner, ScannerSettings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting wallet watcher");

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("Watched wallet: {}", config.watch_wallet);
    info!(
        "Polling every {}s, up to {} transactions per fetch",
        config.poll_interval.as_secs(),
        config.fetch_limit
    );

    let client = HeliusClient::new(&config.helius_api_url, &config.helius_api_key)?;
    let notifier = TelegramNotifier::new(&config.telegram_api_url, &config.bot_token, &config.chat_id)?;
    let store = CursorStore::new(&config.state_file);
    info!("Cursor file: {}", store.path().display());

    if let Err(e) = notifier.notify("Watcher starting…").await {
        warn!("Startup notice not delivered: {}", e);
    }

    let enricher = Enricher::new(
        config.watch_wallet.clone(),
        TokenCache::new(Box::new(client.clone())),
    );
    let mut scanner = Scanner::new(
        Box::new(client),
        enricher,
        Box::new(notifier),
        store,
        ScannerSettings::from_config(&config),
    );

    scanner.run().await;

    Ok(())
}
