//! The trading client binary: market-data consumer with snapshot
//! recovery, replica books, a strategy seam, and the order gateway.

use clap::Parser;
use exchange_rs::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "trader", about = "Trading client for the exchange")]
struct Args {
    /// This participant's client id, unique per exchange.
    #[arg(long)]
    client_id: ClientId,

    /// Optional JSON config file; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), ExchangeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    info!(client_id = args.client_id, ?config, "starting trading client");

    let (update_tx, update_rx) = spsc_channel::<MarketUpdate>(config.market_queue_capacity);
    let (request_tx, request_rx) = spsc_channel::<ClientRequest>(config.client_queue_capacity);
    let (response_tx, response_rx) = spsc_channel::<ClientResponse>(config.client_queue_capacity);

    let consumer =
        MarketDataConsumer::new(config.incremental_group, config.snapshot_group, update_tx)?;
    let gateway = OrderGateway::new(args.client_id, config.gateway_addr, request_rx, response_tx)?;
    let engine = TradeEngine::new(
        args.client_id,
        update_rx,
        response_rx,
        request_tx,
        Box::new(LoggingStrategy),
    );

    let _consumer = consumer.start();
    let _gateway = gateway.start();
    let _engine = engine.start();

    info!("trading client running");
    loop {
        std::thread::sleep(Duration::from_secs(60));
        info!("trading client alive");
    }
}
