//! Order ledger entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_ledger::api::{create_router, AppState};
use order_ledger::config::Config;
use order_ledger::exchange::{ExchangeClient, ExchangeWebSocket, FeedEvent, ReconnectConfig};
use order_ledger::instrument::TickTable;
use order_ledger::ledger::Ledger;
use order_ledger::metrics;
use order_ledger::stats::{self, TradeFlow};
use order_ledger::utils::{short_id, shutdown_signal};

/// Live order/position reconciliation ledger.
#[derive(Parser, Debug)]
#[command(name = "order-ledger")]
#[command(about = "Tracks live orders and positions against an exchange execution report stream")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port for health/state/metrics.
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the live reconciliation loop (default).
    Run {
        /// HTTP server port for health/state/metrics.
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Instrument symbol for the trade/liquidation topics.
        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Fetch and print the venue's instrument tick sizes.
    Instruments,

    /// Replay a JSON file of execution reports through a fresh ledger.
    Replay {
        /// Path to a JSON array of execution reports.
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("order_ledger=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Instruments) => cmd_instruments().await,
        Some(Command::Replay { file }) => cmd_replay(&file).await,
        Some(Command::Run { port, symbol }) => cmd_run(port, symbol).await,
        None => cmd_run(args.port, None).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("ORDER LEDGER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Symbol: {}", config.symbol);
    println!("  WebSocket URL: {}", config.exchange_ws_url);
    println!("  REST URL: {}", config.exchange_rest_url);
    println!("  Evict Percent: {}%", config.evict_percent);
    println!("  Port: {}", config.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Fetch and print the venue's instrument tick sizes.
async fn cmd_instruments() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let client = ExchangeClient::new(&config);

    println!("Fetching open instruments from {} ...", config.exchange_rest_url);
    let instruments = client.get_instruments().await?;
    let table = TickTable::new(instruments.clone());

    println!("Found {} open instruments", table.len());
    for instrument in instruments.iter().take(20) {
        println!("  {:<12} tick {}", instrument.symbol, instrument.tick_size);
    }
    if instruments.len() > 20 {
        println!("  ... and {} more", instruments.len() - 20);
    }

    Ok(())
}

/// Replay a JSON file of execution reports through a fresh ledger.
async fn cmd_replay(file: &str) -> anyhow::Result<()> {
    use order_ledger::exchange::ExecutionReport;

    let raw = std::fs::read_to_string(file)?;
    let reports: Vec<ExecutionReport> = serde_json::from_str(&raw)?;

    println!("Replaying {} execution reports from {}", reports.len(), file);

    let ledger = Ledger::new();
    let outcomes = ledger.apply_reports(&reports);

    let (orders_count, orders_net) = ledger.orders().sum();
    let (positions_count, positions_net) = ledger.positions().sum();
    let (cancels_count, _) = ledger.cancels().sum();

    println!("----------------------------------------------------------------------");
    println!("Applied {} of {} reports", outcomes.len(), reports.len());
    println!("  Orders:    {} resting, net {}", orders_count, orders_net);
    println!("  Positions: {} identities, net {}", positions_count, positions_net);
    println!("  Cancels:   {} tombstones", cancels_count);

    for record in ledger.positions().snapshot().iter().take(5) {
        println!(
            "    {}  {:>6}  {}",
            short_id(record.order_id.as_str()),
            record.signed_qty,
            record.status
        );
    }

    Ok(())
}

/// Run the live reconciliation loop.
async fn cmd_run(port: u16, symbol_override: Option<String>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(symbol) = symbol_override {
        config.symbol = symbol;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Symbol: {}", config.symbol);
    info!("Feed: {}", config.exchange_ws_url);

    // Install the Prometheus recorder before anything records a metric
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::init_metrics();

    // Shared state
    let ledger = Arc::new(Ledger::new());
    let flow = Arc::new(TradeFlow::new());
    let app_state =
        AppState::new(ledger.clone(), flow.clone()).with_prometheus(prometheus);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Liquidation alert fan-out
    let (alert_tx, mut alert_rx) = tokio::sync::mpsc::channel::<stats::LiquidationAlert>(64);
    tokio::spawn(async move {
        while let Some(alert) = alert_rx.recv().await {
            warn!(
                volume = alert.volume,
                side = ?alert.dominant_side(),
                "Liquidation sweep"
            );
        }
    });

    // Connect the feed with auto-reconnect
    let reconnect_config = ReconnectConfig::from_config(
        config.ws_reconnect_max_delay_s,
        config.ws_heartbeat_interval_s,
    );
    let ws = Arc::new(ExchangeWebSocket::with_reconnect_config(
        config.exchange_ws_url.clone(),
        reconnect_config,
    ));

    let topics = ExchangeWebSocket::topics(&config.symbol);
    let mut events = ws.clone().run_with_reconnect(topics).await;

    info!("========================================");
    info!("ORDER LEDGER STARTED");
    info!("========================================");

    let mut stale_check = tokio::time::interval(Duration::from_secs(5));
    let mut evict_tick = tokio::time::interval(Duration::from_secs(600));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                app_state.set_ready(true);

                match event {
                    FeedEvent::Executions(reports) => {
                        let timer = metrics::timer_batch_apply();
                        let outcomes = ledger.apply_reports(&reports);
                        drop(timer);

                        info!(
                            reports = reports.len(),
                            applied = outcomes.len(),
                            "Reconciled execution batch"
                        );
                    }
                    FeedEvent::Trades(trades) => {
                        flow.apply(&trades);
                    }
                    FeedEvent::Liquidations(liqs) => {
                        if let Some(alert) = stats::aggregate(&liqs) {
                            metrics::inc_liquidation_alerts();
                            let _ = alert_tx.send(alert).await;
                        }
                    }
                }
            }
            _ = stale_check.tick() => {
                if ws.is_stale() {
                    warn!("Feed is stale, marking not ready");
                    app_state.set_ready(false);
                }
            }
            _ = evict_tick.tick() => {
                // The tombstone cache only grows; sweep its oldest entries
                // so a long-running process stays bounded.
                let evicted = ledger.cancels().evict_oldest(config.evict_percent);
                if evicted > 0 {
                    info!(evicted, "Swept cancel tombstones");
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    // Final summary
    let (orders_count, orders_net) = ledger.orders().sum();
    let (positions_count, positions_net) = ledger.positions().sum();

    info!("========================================");
    info!("SHUTTING DOWN - FINAL SUMMARY");
    info!("========================================");
    info!("Orders resting: {} (net {})", orders_count, orders_net);
    info!("Positions: {} (net {})", positions_count, positions_net);
    info!("Cancel tombstones: {}", ledger.cancels().len());
    info!("========================================");

    Ok(())
}
