use dotenv::dotenv;
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use governance_watchdog::alerts::WebhookHandler;
use governance_watchdog::config::AppConfig;
use governance_watchdog::handlers::{EventHandler, LogHandler};
use governance_watchdog::state::{IngestState, StateHandler};
use governance_watchdog::storage::ChainBlockDater;
use governance_watchdog::subscribe::{
    create_api, reconnect_range_fn, subscribe_events, SubscribeOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // 1. Load Config
    let config = AppConfig::new().wrap_err("Failed to load config")?;

    let file_appender = tracing_appender::rolling::daily("logs", "watchdog.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    info!("Starting Governance Watchdog for {} ({})", config.chain.name, config.chain.id);
    info!("  RPC URL: [HIDDEN]");
    info!("  Token: {}", config.contracts.token);
    info!("  Governor: {}", config.contracts.governor);
    info!("  Timelock: {}", config.contracts.timelock);
    info!(
        "  Webhook: {}",
        if config.alerts.webhook_url.is_empty() { "Disabled" } else { "Enabled" }
    );

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Shutdown requested");
        ctrl_c.cancel();
    });

    // 2. Connect
    let Some(api) = create_api(
        &config.chain.ws_url,
        config.contracts,
        config.chain.retry_interval(),
        &shutdown,
    )
    .await
    else {
        return Ok(());
    };
    let api = Arc::new(api);

    // 3. Handlers
    let state_file = config.ingest.state_file.clone();
    let state = Arc::new(IngestState::load(&state_file)?);
    if let Some(block) = state.last_block() {
        info!("Resuming after block {}", block);
    }
    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(StateHandler::new(state.clone()).persist_to(state_file)),
        Arc::new(LogHandler::new(config.chain.id.clone())),
        Arc::new(WebhookHandler::new(config.alerts.clone(), config.chain.id.clone())),
    ];

    let initial_range = config.ingest.initial_range();
    let discover_state = state.clone();
    let discover = reconnect_range_fn(move || {
        let range = discover_state.reconnect_range(initial_range);
        async move { Ok(Some(range)) }
    });

    // 4. Catch up and go live
    let mut subscriber = subscribe_events(SubscribeOptions {
        chain: config.chain.id.clone(),
        api: api.clone(),
        handlers,
        skip_catchup: config.ingest.skip_catchup,
        discover_reconnect_range: Some(discover),
        dater: Arc::new(ChainBlockDater::new(api)),
        fetch_all_completed: config.ingest.fetch_all_completed,
        verbose: config.ingest.verbose,
    })
    .await
    .wrap_err("Failed to subscribe to contract events")?;

    info!("Watchdog Active. Waiting for events...");
    shutdown.cancelled().await;

    subscriber.unsubscribe();
    for (kind, count) in state.counts() {
        info!("  {}: {} events", kind, count);
    }
    info!("Governance Watchdog stopped");
    Ok(())
}
