//! The matching engine: sole consumer of the request queue, dispatching
//! to per-instrument books and fanning results out to the response and
//! market-update queues.

use crate::fabric::{Consumer, Producer};
use crate::messages::{ClientRequest, ClientResponse, MarketUpdate, RequestKind};
use crate::orderbook::{EventSink, OrderBook};
use crate::types::{ME_MAX_TICKERS, TickerId};
use crate::utils::Worker;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, trace};

/// Sink that forwards book outputs straight onto the engine's two
/// outbound queues.
struct QueueSink {
    responses: Producer<ClientResponse>,
    updates: Producer<MarketUpdate>,
}

impl EventSink for QueueSink {
    fn client_response(&mut self, response: &ClientResponse) {
        trace!(%response, "sending");
        self.responses.push(*response);
    }

    fn market_update(&mut self, update: &MarketUpdate) {
        trace!(%update, "sending");
        self.updates.push(*update);
    }
}

/// Single-threaded matching core.
///
/// Ordering guarantee: every response and market update emitted for one
/// request is enqueued before the engine dequeues the next request, so
/// downstream consumers observe request boundaries intact.
pub struct MatchingEngine {
    books: Vec<OrderBook>,
    requests: Consumer<ClientRequest>,
    sink: QueueSink,
    running: Arc<AtomicBool>,
}

impl MatchingEngine {
    /// Builds the engine with one book per instrument and takes ownership
    /// of its three queue endpoints.
    pub fn new(
        requests: Consumer<ClientRequest>,
        responses: Producer<ClientResponse>,
        updates: Producer<MarketUpdate>,
    ) -> Self {
        let books = (0..ME_MAX_TICKERS as TickerId).map(OrderBook::new).collect();
        MatchingEngine {
            books,
            requests,
            sink: QueueSink { responses, updates },
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Moves the engine onto its worker thread.
    pub fn start(self) -> Worker {
        let running = Arc::clone(&self.running);
        let mut engine = self;
        Worker::spawn("matching-engine", running, move || engine.run())
    }

    /// Busy-wait loop: drain one request at a time, fully processing it
    /// before looking at the next.
    fn run(&mut self) {
        info!("matching engine running");
        while self.running.load(Ordering::Acquire) {
            if let Some(request) = self.requests.peek_read() {
                let request = *request;
                self.requests.release_read();
                self.process(&request);
            }
        }
    }

    /// Dispatches one request to its instrument's book.
    pub fn process(&mut self, request: &ClientRequest) {
        trace!(%request, "processing");
        let ticker = request.ticker_id as usize;
        assert!(ticker < self.books.len(), "request for unknown ticker {ticker}");
        let book = &mut self.books[ticker];

        match request.kind {
            RequestKind::New => book.add(
                &mut self.sink,
                request.client_id,
                request.client_order_id,
                request.side,
                request.price,
                request.qty,
            ),
            RequestKind::Cancel => {
                book.cancel(&mut self.sink, request.client_id, request.client_order_id)
            }
            RequestKind::Invalid => {
                panic!("received invalid client request kind: {request}")
            }
        }
    }

    /// Read access to one instrument's book, for inspection and tests.
    pub fn book(&self, ticker_id: TickerId) -> &OrderBook {
        &self.books[ticker_id as usize]
    }
}
