use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use polywatch_core::{DeltaEvaluator, PolymarketClient, PriceSnapshotStore, TelegramClient};
use price_monitor_rust::{health, MonitorConfig, PriceMonitor};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const STARTUP_MESSAGE: &str = "✅ Polymarket Monitor started successfully 🚀";

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logging();

    info!("price_monitor v{} starting", env!("CARGO_PKG_VERSION"));

    // Missing credentials end the process here, before any loop starts
    let config = MonitorConfig::from_env().context("invalid configuration")?;
    info!("Loaded configuration: {:?}", config);

    let source = PolymarketClient::with_proxy(
        config.markets_url.clone(),
        config.request_timeout,
        config.polymarket_proxy_url.as_deref(),
    )?;
    let sink = TelegramClient::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
        config.request_timeout,
    )?
    .with_api_base(config.telegram_api_base.clone())
    .with_link_base(config.market_link_base.clone());

    source.check_connectivity().await;

    if config.startup_notification {
        if let Err(e) = sink.send_message(STARTUP_MESSAGE).await {
            warn!("Failed to send startup message: {:#}", e);
        }
    }

    let monitor = PriceMonitor::initialize(
        source,
        sink,
        PriceSnapshotStore::new(config.snapshot_path.clone()),
        DeltaEvaluator::new(config.change_threshold),
        config.check_interval,
    );
    let mut handle = monitor.start();
    info!("Background monitoring task started");

    if config.health_enabled {
        let bind = config.health_bind;
        tokio::spawn(async move {
            if let Err(e) = health::serve(bind).await {
                error!("Liveness endpoint stopped: {:#}", e);
            }
        });
    }

    let shutdown = tokio::select! {
        result = handle.wait() => {
            if let Err(e) = result {
                return Err(anyhow!("monitor task exited: {e}"));
            }
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if shutdown {
        info!("Shutdown signal received, stopping monitor");
        handle.stop();
    }

    Ok(())
}
