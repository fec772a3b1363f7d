//! Scalar identifier types, invalid-value sentinels, and sizing limits.
//!
//! Every scalar reserves its maximum representable value as an "invalid"
//! sentinel so that default-constructed messages are visibly unset in log
//! output and on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-assigned or client-assigned order identifier.
pub type OrderId = u64;
/// Sentinel for an unset [`OrderId`].
pub const ORDER_ID_INVALID: OrderId = OrderId::MAX;

/// Instrument identifier.
pub type TickerId = u32;
/// Sentinel for an unset [`TickerId`].
pub const TICKER_ID_INVALID: TickerId = TickerId::MAX;

/// Trading participant identifier.
pub type ClientId = u32;
/// Sentinel for an unset [`ClientId`].
pub const CLIENT_ID_INVALID: ClientId = ClientId::MAX;

/// Integer limit price in ticks. Never a float.
pub type Price = i64;
/// Sentinel for an unset [`Price`].
pub const PRICE_INVALID: Price = Price::MAX;

/// Order quantity.
pub type Qty = u32;
/// Sentinel for an unset [`Qty`].
pub const QTY_INVALID: Qty = Qty::MAX;

/// Intra-level FIFO tie-breaker. Lower priority rests earlier in the queue.
pub type Priority = u64;
/// Sentinel for an unset [`Priority`].
pub const PRIORITY_INVALID: Priority = Priority::MAX;

/// Stream sequence number. Every sequenced stream starts at 1 except the
/// per-cycle snapshot stream, which restarts at 0 on each cycle.
pub type SeqNum = u64;

/// Nanosecond timestamp relative to a component-local monotonic epoch.
pub type Nanos = u64;

/// Side of the book an order rests on or sweeps against.
///
/// The wire encoding is a signed byte: `1` for buy, `-1` for sell, `0`
/// for unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Side {
    Buy = 1,
    #[default]
    Invalid = 0,
    Sell = -1,
}

impl Side {
    /// Decode from the on-wire signed byte. Unknown values map to `Invalid`.
    pub fn from_wire(value: i8) -> Self {
        match value {
            1 => Side::Buy,
            -1 => Side::Sell,
            _ => Side::Invalid,
        }
    }

    /// The on-wire signed byte for this side.
    #[inline]
    pub fn to_wire(self) -> i8 {
        self as i8
    }

    /// The side a matching counterparty rests on.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
            Side::Invalid => Side::Invalid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
            Side::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Maximum number of instruments the engine hosts.
pub const ME_MAX_TICKERS: usize = 8;

/// Maximum number of trading participants. Sizes the per-client sequence
/// tables in the gateway and the reverse index in each book.
pub const ME_MAX_NUM_CLIENTS: usize = 64;

/// Maximum client-order-id value plus one, and the per-instrument order
/// pool size. Client order ids must stay below this bound.
pub const ME_MAX_ORDER_IDS: usize = 16 * 1024;

/// Maximum live price levels per instrument and side-index width. Prices
/// map to ladder slots by `price % ME_MAX_PRICE_LEVELS`, so the active
/// price span of one instrument must stay below this many ticks.
pub const ME_MAX_PRICE_LEVELS: usize = 256;

/// Capacity of the request and response queues between the gateway and
/// the matching engine.
pub const ME_MAX_CLIENT_UPDATES: usize = 256 * 1024;

/// Capacity of the market-update queues feeding the publisher and the
/// snapshot synthesizer.
pub const ME_MAX_MARKET_UPDATES: usize = 256 * 1024;

/// Maximum requests the FIFO sequencer stages within one poll cycle.
pub const ME_MAX_PENDING_REQUESTS: usize = 1024;

/// Formats a scalar as itself or `INVALID` when it equals `sentinel`.
pub(crate) fn display_or_invalid<T: PartialEq + fmt::Display>(value: T, sentinel: T) -> String {
    if value == sentinel {
        "INVALID".to_string()
    } else {
        value.to_string()
    }
}
