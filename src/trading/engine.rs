//! Client-side trade engine: owns the per-instrument market books and
//! drives the strategy from the consumer and gateway queues.

use super::market_book::MarketBook;
use super::strategy::{OrderEntry, Strategy};
use crate::fabric::{Consumer, Producer};
use crate::messages::{ClientRequest, ClientResponse, MarketUpdate, UpdateKind};
use crate::types::{ClientId, ME_MAX_TICKERS, TickerId};
use crate::utils::Worker;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Trade engine thread state.
///
/// Consumes the market-update queue filled by the market-data consumer
/// and the response queue filled by the order gateway; produces requests
/// for the gateway on behalf of the strategy.
pub struct TradeEngine {
    client_id: ClientId,
    books: Vec<MarketBook>,
    updates: Consumer<MarketUpdate>,
    responses: Consumer<ClientResponse>,
    requests: Producer<ClientRequest>,
    strategy: Box<dyn Strategy>,
    running: Arc<AtomicBool>,
}

impl TradeEngine {
    pub fn new(
        client_id: ClientId,
        updates: Consumer<MarketUpdate>,
        responses: Consumer<ClientResponse>,
        requests: Producer<ClientRequest>,
        strategy: Box<dyn Strategy>,
    ) -> Self {
        let books = (0..ME_MAX_TICKERS as TickerId).map(MarketBook::new).collect();
        TradeEngine {
            client_id,
            books,
            updates,
            responses,
            requests,
            strategy,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Moves the engine onto its worker thread.
    pub fn start(self) -> Worker {
        let running = Arc::clone(&self.running);
        let mut engine = self;
        info!(client_id = engine.client_id, "trade engine starting");
        Worker::spawn("trade-engine", running, move || {
            while engine.running.load(Ordering::Acquire) {
                engine.poll();
            }
        })
    }

    /// Drains both inbound queues once.
    pub fn poll(&mut self) {
        while let Some(update) = self.updates.pop() {
            self.on_market_update(&update);
        }
        while let Some(response) = self.responses.pop() {
            let TradeEngine { strategy, requests, client_id, .. } = self;
            let mut orders = OrderEntry::new(requests, *client_id);
            strategy.on_response(&response, &mut orders);
        }
    }

    /// Routes one market update: trades go to the strategy untouched,
    /// everything else mutates the replica book first.
    pub fn on_market_update(&mut self, update: &MarketUpdate) {
        let ticker = update.ticker_id as usize;
        assert!(ticker < self.books.len(), "update for unknown ticker {ticker}");

        let TradeEngine { strategy, books, requests, client_id, .. } = self;
        let book = &mut books[ticker];
        let mut orders = OrderEntry::new(requests, *client_id);

        if update.kind == UpdateKind::Trade {
            strategy.on_trade(update, book, &mut orders);
        } else {
            book.on_market_update(update);
            strategy.on_book_update(book, update, &mut orders);
        }
    }

    /// Read access to one instrument's replica, for inspection and tests.
    pub fn book(&self, ticker_id: TickerId) -> &MarketBook {
        &self.books[ticker_id as usize]
    }
}
