//! Shared helpers for the unit-test harness.

use exchange_rs::prelude::*;

/// Event sink that records everything a book emits, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub responses: Vec<ClientResponse>,
    pub updates: Vec<MarketUpdate>,
}

impl EventSink for RecordingSink {
    fn client_response(&mut self, response: &ClientResponse) {
        self.responses.push(*response);
    }

    fn market_update(&mut self, update: &MarketUpdate) {
        self.updates.push(*update);
    }
}

impl RecordingSink {
    /// Clears both recordings.
    #[allow(dead_code)]
    pub fn reset(&mut self) {
        self.responses.clear();
        self.updates.clear();
    }

    /// Kinds of all recorded responses, in order.
    #[allow(dead_code)]
    pub fn response_kinds(&self) -> Vec<ResponseKind> {
        self.responses.iter().map(|r| r.kind).collect()
    }

    /// Kinds of all recorded market updates, in order.
    #[allow(dead_code)]
    pub fn update_kinds(&self) -> Vec<UpdateKind> {
        self.updates.iter().map(|u| u.kind).collect()
    }
}

/// A New request in engine form.
#[allow(dead_code)]
pub fn new_request(
    client_id: ClientId,
    client_order_id: OrderId,
    side: Side,
    price: Price,
    qty: Qty,
) -> ClientRequest {
    ClientRequest {
        kind: RequestKind::New,
        client_id,
        ticker_id: 0,
        client_order_id,
        side,
        price,
        qty,
    }
}

/// A Cancel request in engine form.
#[allow(dead_code)]
pub fn cancel_request(client_id: ClientId, client_order_id: OrderId) -> ClientRequest {
    ClientRequest {
        kind: RequestKind::Cancel,
        client_id,
        ticker_id: 0,
        client_order_id,
        ..ClientRequest::default()
    }
}

/// Asserts the ladder invariant: strictly descending bid prices and
/// strictly ascending ask prices, with strictly increasing priorities
/// head-to-tail inside every level.
#[allow(dead_code)]
pub fn assert_book_invariants(book: &OrderBook) {
    let bids = book.side_levels(Side::Buy);
    for pair in bids.windows(2) {
        assert!(pair[0].0 > pair[1].0, "bid ladder not strictly descending: {bids:?}");
    }
    let asks = book.side_levels(Side::Sell);
    for pair in asks.windows(2) {
        assert!(pair[0].0 < pair[1].0, "ask ladder not strictly ascending: {asks:?}");
    }
    for (_, orders) in bids.iter().chain(asks.iter()) {
        for pair in orders.windows(2) {
            assert!(
                pair[0].2 < pair[1].2,
                "level priorities not strictly increasing: {orders:?}"
            );
        }
    }
    if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
        assert!(bid < ask, "book is crossed: best bid {bid} >= best ask {ask}");
    }
}
