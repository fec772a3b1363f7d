//! The exchange binary: order gateway, matching engine, market-data
//! publisher, and snapshot synthesizer wired together over SPSC queues.

use clap::Parser;
use exchange_rs::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "exchange", about = "Matching exchange with multicast market data")]
struct Args {
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
    info!(?config, "starting exchange");

    let (request_tx, request_rx) = spsc_channel::<ClientRequest>(config.client_queue_capacity);
    let (response_tx, response_rx) = spsc_channel::<ClientResponse>(config.client_queue_capacity);
    let (update_tx, update_rx) = spsc_channel::<MarketUpdate>(config.market_queue_capacity);
    let (feed_tx, feed_rx) = spsc_channel::<SequencedUpdate>(config.market_queue_capacity);

    let engine = MatchingEngine::new(request_rx, response_tx, update_tx);
    let publisher = MarketDataPublisher::new(config.incremental_group, update_rx, feed_tx)?;
    let synthesizer =
        SnapshotSynthesizer::new(config.snapshot_group, feed_rx, config.snapshot_interval())?;
    let server = OrderServer::new(config.gateway_addr, request_tx, response_rx)?;

    let _engine = engine.start();
    let _publisher = publisher.start();
    let _synthesizer = synthesizer.start();
    let _server = server.start();

    info!("exchange running");
    loop {
        std::thread::sleep(Duration::from_secs(60));
        info!("exchange alive");
    }
}
