//! Arena-backed ladder primitives: resting orders and price levels.
//!
//! Both structs live in [`ObjectPool`](crate::fabric::ObjectPool)s and
//! link to their siblings through pool handles. The lists are cyclic:
//! an order's `prev_order` chain from a level's `first_order` reaches the
//! tail in one hop, and a side's level list wraps from the worst price
//! back to the best.

use crate::fabric::Handle;
use crate::types::{
    CLIENT_ID_INVALID, ClientId, ORDER_ID_INVALID, OrderId, PRICE_INVALID, PRIORITY_INVALID,
    Price, Priority, QTY_INVALID, Qty, Side, TICKER_ID_INVALID, TickerId,
};

/// A resting order, owned by its book's order pool.
///
/// Created when an incoming order has residual quantity after matching,
/// shrunk by partial fills, and destroyed on full fill or cancel. The
/// `prev_order`/`next_order` handles are its position in the level's
/// cyclic FIFO list.
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub ticker_id: TickerId,
    pub client_id: ClientId,
    pub client_order_id: OrderId,
    pub market_order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub priority: Priority,
    pub prev_order: Handle,
    pub next_order: Handle,
}

impl Default for Order {
    fn default() -> Self {
        Order {
            ticker_id: TICKER_ID_INVALID,
            client_id: CLIENT_ID_INVALID,
            client_order_id: ORDER_ID_INVALID,
            market_order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
            priority: PRIORITY_INVALID,
            prev_order: Handle::NONE,
            next_order: Handle::NONE,
        }
    }
}

/// One price level on one side of the book.
///
/// `first_order` heads the cyclic order list; a level exists exactly while
/// at least one order rests at its price. The `prev_level`/`next_level`
/// handles chain the side's levels in price order: descending for bids,
/// ascending for asks, best first.
#[derive(Debug, Clone, Copy)]
pub struct PriceLevel {
    pub side: Side,
    pub price: Price,
    pub first_order: Handle,
    pub prev_level: Handle,
    pub next_level: Handle,
}

impl Default for PriceLevel {
    fn default() -> Self {
        PriceLevel {
            side: Side::Invalid,
            price: PRICE_INVALID,
            first_order: Handle::NONE,
            prev_level: Handle::NONE,
            next_level: Handle::NONE,
        }
    }
}
