//! Convenience re-exports for downstream users and tests.
//!
//! ```
//! use exchange_rs::prelude::*;
//!
//! let book = OrderBook::new(0);
//! assert_eq!(book.best_bid(), None);
//! ```

pub use crate::config::Config;
pub use crate::engine::MatchingEngine;
pub use crate::error::ExchangeError;
pub use crate::fabric::{Consumer, Handle, ObjectPool, Producer, spsc_channel};
pub use crate::gateway::{FifoSequencer, OrderServer};
pub use crate::marketdata::{MarketDataPublisher, SnapshotSynthesizer};
pub use crate::messages::{
    ClientRequest, ClientResponse, MarketUpdate, RequestKind, ResponseKind, SequencedUpdate,
    UpdateKind,
};
pub use crate::orderbook::{EventSink, Order, OrderBook, PriceLevel};
pub use crate::trading::{
    Bbo, LoggingStrategy, MarketBook, MarketDataConsumer, MarketOrder, OrderEntry, OrderGateway,
    Strategy, TradeEngine,
};
pub use crate::types::{
    CLIENT_ID_INVALID, ClientId, ME_MAX_CLIENT_UPDATES, ME_MAX_MARKET_UPDATES,
    ME_MAX_NUM_CLIENTS, ME_MAX_ORDER_IDS, ME_MAX_PENDING_REQUESTS, ME_MAX_PRICE_LEVELS,
    ME_MAX_TICKERS, ORDER_ID_INVALID, OrderId, PRICE_INVALID, PRIORITY_INVALID, Price, Priority,
    QTY_INVALID, Qty, SeqNum, Side, TICKER_ID_INVALID, TickerId,
};
pub use crate::wire::{
    CLIENT_REQUEST_SIZE, CLIENT_RESPONSE_SIZE, MARKET_UPDATE_SIZE, WireClientRequest,
    WireClientResponse, WireMarketUpdate,
};
