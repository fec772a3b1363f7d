//! The strategy seam.
//!
//! Trading logic itself lives outside this crate; the trade engine drives
//! any [`Strategy`] implementation with book updates, trades, and order
//! responses, and hands it an [`OrderEntry`] for submitting requests back
//! through the client's order gateway.

use super::market_book::MarketBook;
use crate::fabric::Producer;
use crate::messages::{ClientRequest, ClientResponse, MarketUpdate, RequestKind};
use crate::types::{ClientId, OrderId, Price, Qty, Side, TickerId};
use tracing::info;

/// Order-submission handle passed to every strategy hook.
pub struct OrderEntry<'a> {
    requests: &'a mut Producer<ClientRequest>,
    client_id: ClientId,
}

impl<'a> OrderEntry<'a> {
    pub(super) fn new(requests: &'a mut Producer<ClientRequest>, client_id: ClientId) -> Self {
        OrderEntry { requests, client_id }
    }

    /// Submits a new limit order.
    pub fn send_new(
        &mut self,
        client_order_id: OrderId,
        ticker_id: TickerId,
        side: Side,
        price: Price,
        qty: Qty,
    ) {
        self.requests.push(ClientRequest {
            kind: RequestKind::New,
            client_id: self.client_id,
            ticker_id,
            client_order_id,
            side,
            price,
            qty,
        });
    }

    /// Requests cancellation of a previously submitted order.
    pub fn send_cancel(&mut self, client_order_id: OrderId, ticker_id: TickerId) {
        self.requests.push(ClientRequest {
            kind: RequestKind::Cancel,
            client_id: self.client_id,
            ticker_id,
            client_order_id,
            ..ClientRequest::default()
        });
    }
}

/// Hooks the trade engine drives on its thread. All default to no-ops so
/// a strategy only implements what it reacts to.
pub trait Strategy: Send {
    /// The book for `update.ticker_id` changed; its BBO is current.
    fn on_book_update(
        &mut self,
        _book: &MarketBook,
        _update: &MarketUpdate,
        _orders: &mut OrderEntry<'_>,
    ) {
    }

    /// An anonymous trade printed on `update.ticker_id`.
    fn on_trade(&mut self, _update: &MarketUpdate, _book: &MarketBook, _orders: &mut OrderEntry<'_>) {
    }

    /// The exchange responded to one of this client's orders.
    fn on_response(&mut self, _response: &ClientResponse, _orders: &mut OrderEntry<'_>) {}
}

/// A passive strategy that only writes the tape and its own order flow to
/// the log. Useful as a default and for soak-testing the stack.
#[derive(Debug, Default)]
pub struct LoggingStrategy;

impl Strategy for LoggingStrategy {
    fn on_trade(&mut self, update: &MarketUpdate, book: &MarketBook, _orders: &mut OrderEntry<'_>) {
        info!(ticker = update.ticker_id, trade = %update, bbo = %book.bbo(), "trade");
    }

    fn on_response(&mut self, response: &ClientResponse, _orders: &mut OrderEntry<'_>) {
        info!(%response, "order update");
    }
}
