//! Engine-form messages exchanged between the pipeline components.
//!
//! These are the in-process records carried on the SPSC queues. Their
//! packed on-wire counterparts live in [`crate::wire`]; the only
//! difference is the prepended stream sequence number and the fixed
//! little-endian layout.

use crate::types::{
    CLIENT_ID_INVALID, ClientId, ORDER_ID_INVALID, OrderId, PRICE_INVALID, PRIORITY_INVALID,
    Price, Priority, QTY_INVALID, Qty, SeqNum, Side, TICKER_ID_INVALID, TickerId,
    display_or_invalid,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a client asks the engine to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestKind {
    #[default]
    Invalid = 0,
    New = 1,
    Cancel = 2,
}

impl RequestKind {
    /// Decode from the on-wire byte. Unknown values map to `Invalid`,
    /// which the engine treats as a fatal protocol violation.
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => RequestKind::New,
            2 => RequestKind::Cancel,
            _ => RequestKind::Invalid,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Invalid => write!(f, "INVALID"),
            RequestKind::New => write!(f, "NEW"),
            RequestKind::Cancel => write!(f, "CANCEL"),
        }
    }
}

/// The engine's verdict on a client request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResponseKind {
    #[default]
    Invalid = 0,
    Accepted = 1,
    Canceled = 2,
    Filled = 3,
    CancelRejected = 4,
}

impl ResponseKind {
    /// Decode from the on-wire byte. Unknown values map to `Invalid`.
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => ResponseKind::Accepted,
            2 => ResponseKind::Canceled,
            3 => ResponseKind::Filled,
            4 => ResponseKind::CancelRejected,
            _ => ResponseKind::Invalid,
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseKind::Invalid => write!(f, "INVALID"),
            ResponseKind::Accepted => write!(f, "ACCEPTED"),
            ResponseKind::Canceled => write!(f, "CANCELED"),
            ResponseKind::Filled => write!(f, "FILLED"),
            ResponseKind::CancelRejected => write!(f, "CANCEL_REJECTED"),
        }
    }
}

/// Market-data event kind, shared by the incremental and snapshot streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum UpdateKind {
    #[default]
    Invalid = 0,
    Clear = 1,
    Add = 2,
    Modify = 3,
    Cancel = 4,
    Trade = 5,
    SnapshotStart = 6,
    SnapshotEnd = 7,
}

impl UpdateKind {
    /// Decode from the on-wire byte. Unknown values map to `Invalid`.
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => UpdateKind::Clear,
            2 => UpdateKind::Add,
            3 => UpdateKind::Modify,
            4 => UpdateKind::Cancel,
            5 => UpdateKind::Trade,
            6 => UpdateKind::SnapshotStart,
            7 => UpdateKind::SnapshotEnd,
            _ => UpdateKind::Invalid,
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateKind::Invalid => "INVALID",
            UpdateKind::Clear => "CLEAR",
            UpdateKind::Add => "ADD",
            UpdateKind::Modify => "MODIFY",
            UpdateKind::Cancel => "CANCEL",
            UpdateKind::Trade => "TRADE",
            UpdateKind::SnapshotStart => "SNAPSHOT_START",
            UpdateKind::SnapshotEnd => "SNAPSHOT_END",
        };
        write!(f, "{name}")
    }
}

/// A client order-entry request, immutable once enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub kind: RequestKind,
    pub client_id: ClientId,
    pub ticker_id: TickerId,
    /// Client-assigned order id, unique per client but not market-wide.
    pub client_order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
}

impl Default for ClientRequest {
    fn default() -> Self {
        ClientRequest {
            kind: RequestKind::Invalid,
            client_id: CLIENT_ID_INVALID,
            ticker_id: TICKER_ID_INVALID,
            client_order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
        }
    }
}

impl fmt::Display for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClientRequest [type: {} client: {} ticker: {} oid: {} side: {} qty: {} price: {}]",
            self.kind,
            display_or_invalid(self.client_id, CLIENT_ID_INVALID),
            display_or_invalid(self.ticker_id, TICKER_ID_INVALID),
            display_or_invalid(self.client_order_id, ORDER_ID_INVALID),
            self.side,
            display_or_invalid(self.qty, QTY_INVALID),
            display_or_invalid(self.price, PRICE_INVALID),
        )
    }
}

/// A status report for one client order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientResponse {
    pub kind: ResponseKind,
    pub client_id: ClientId,
    pub ticker_id: TickerId,
    /// The id the owning client assigned to the order.
    pub client_order_id: OrderId,
    /// The id the engine assigned to the order, market-wide unique.
    pub market_order_id: OrderId,
    pub side: Side,
    pub price: Price,
    /// Original order quantity, set on Accepted.
    pub qty: Qty,
    /// Quantity executed by the fill this response reports.
    pub exec_qty: Qty,
    /// Quantity still live in the book after this event.
    pub leaves_qty: Qty,
}

impl Default for ClientResponse {
    fn default() -> Self {
        ClientResponse {
            kind: ResponseKind::Invalid,
            client_id: CLIENT_ID_INVALID,
            ticker_id: TICKER_ID_INVALID,
            client_order_id: ORDER_ID_INVALID,
            market_order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
            exec_qty: QTY_INVALID,
            leaves_qty: QTY_INVALID,
        }
    }
}

impl fmt::Display for ClientResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClientResponse [type: {} client: {} ticker: {} coid: {} moid: {} side: {} exec: {} leaves: {} price: {}]",
            self.kind,
            display_or_invalid(self.client_id, CLIENT_ID_INVALID),
            display_or_invalid(self.ticker_id, TICKER_ID_INVALID),
            display_or_invalid(self.client_order_id, ORDER_ID_INVALID),
            display_or_invalid(self.market_order_id, ORDER_ID_INVALID),
            self.side,
            display_or_invalid(self.exec_qty, QTY_INVALID),
            display_or_invalid(self.leaves_qty, QTY_INVALID),
            display_or_invalid(self.price, PRICE_INVALID),
        )
    }
}

/// A book delta published to the market. Carries no client identity.
///
/// For `SnapshotStart` and `SnapshotEnd` the `order_id` field carries the
/// incremental-stream anchor sequence number instead of an order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub kind: UpdateKind,
    pub order_id: OrderId,
    pub ticker_id: TickerId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub priority: Priority,
}

impl Default for MarketUpdate {
    fn default() -> Self {
        MarketUpdate {
            kind: UpdateKind::Invalid,
            order_id: ORDER_ID_INVALID,
            ticker_id: TICKER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
            priority: PRIORITY_INVALID,
        }
    }
}

impl fmt::Display for MarketUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MarketUpdate [type: {} moid: {} ticker: {} side: {} price: {} qty: {} priority: {}]",
            self.kind,
            display_or_invalid(self.order_id, ORDER_ID_INVALID),
            display_or_invalid(self.ticker_id, TICKER_ID_INVALID),
            self.side,
            display_or_invalid(self.price, PRICE_INVALID),
            display_or_invalid(self.qty, QTY_INVALID),
            display_or_invalid(self.priority, PRIORITY_INVALID),
        )
    }
}

/// A market update paired with its stream sequence number. This is the
/// record the publisher tees into the snapshot synthesizer's feed queue,
/// and the in-process form of every market-data datagram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedUpdate {
    pub seq_number: SeqNum,
    pub update: MarketUpdate,
}

impl fmt::Display for SequencedUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SequencedUpdate [seq: {} {}]", self.seq_number, self.update)
    }
}
