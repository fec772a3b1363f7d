//! Strategy-facing replica of the exchange book.
//!
//! Built purely from market updates keyed by market order id — it never
//! matches, so the only work is ladder maintenance and keeping the BBO
//! current. Kept deliberately separate from the matching book so replay
//! concerns stay out of the exchange's hot path.

use crate::fabric::{Handle, ObjectPool};
use crate::messages::{MarketUpdate, UpdateKind};
use crate::orderbook::PriceLevel;
use crate::types::{
    ME_MAX_ORDER_IDS, ME_MAX_PRICE_LEVELS, ORDER_ID_INVALID, OrderId, PRICE_INVALID,
    PRIORITY_INVALID, Price, Priority, QTY_INVALID, Qty, Side, TickerId, display_or_invalid,
};
use std::fmt;
use tracing::{debug, trace};

/// A resting order as the market sees it: no client identity.
#[derive(Debug, Clone, Copy)]
pub struct MarketOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub priority: Priority,
    pub prev_order: Handle,
    pub next_order: Handle,
}

impl Default for MarketOrder {
    fn default() -> Self {
        MarketOrder {
            order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
            priority: PRIORITY_INVALID,
            prev_order: Handle::NONE,
            next_order: Handle::NONE,
        }
    }
}

/// Best bid and offer: price and aggregate resting quantity per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bbo {
    pub bid_price: Price,
    pub bid_qty: Qty,
    pub ask_price: Price,
    pub ask_qty: Qty,
}

impl Default for Bbo {
    fn default() -> Self {
        Bbo {
            bid_price: PRICE_INVALID,
            bid_qty: QTY_INVALID,
            ask_price: PRICE_INVALID,
            ask_qty: QTY_INVALID,
        }
    }
}

impl fmt::Display for Bbo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BBO{{ {}@{} X {}@{} }}",
            display_or_invalid(self.bid_qty, QTY_INVALID),
            display_or_invalid(self.bid_price, PRICE_INVALID),
            display_or_invalid(self.ask_price, PRICE_INVALID),
            display_or_invalid(self.ask_qty, QTY_INVALID),
        )
    }
}

/// Per-instrument client-side book.
pub struct MarketBook {
    ticker_id: TickerId,

    order_pool: ObjectPool<MarketOrder>,
    level_pool: ObjectPool<PriceLevel>,

    /// Direct index from market order id to the resting order.
    oid_to_order: Box<[Handle]>,
    /// Direct index from `price % ME_MAX_PRICE_LEVELS` to the live level.
    price_to_level: Box<[Handle]>,

    bids_head: Handle,
    asks_head: Handle,

    bbo: Bbo,
}

impl MarketBook {
    /// Creates an empty replica for `ticker_id`.
    pub fn new(ticker_id: TickerId) -> Self {
        MarketBook {
            ticker_id,
            order_pool: ObjectPool::new(ME_MAX_ORDER_IDS),
            level_pool: ObjectPool::new(ME_MAX_PRICE_LEVELS),
            oid_to_order: vec![Handle::NONE; ME_MAX_ORDER_IDS].into_boxed_slice(),
            price_to_level: vec![Handle::NONE; ME_MAX_PRICE_LEVELS].into_boxed_slice(),
            bids_head: Handle::NONE,
            asks_head: Handle::NONE,
            bbo: Bbo::default(),
        }
    }

    /// The instrument this replica tracks.
    pub fn ticker_id(&self) -> TickerId {
        self.ticker_id
    }

    /// Applies one market update. Trades and snapshot sentinels change no
    /// resting state; the trade engine routes trades to the strategy
    /// before calling this.
    pub fn on_market_update(&mut self, update: &MarketUpdate) {
        match update.kind {
            UpdateKind::Add => self.apply_add(update),
            UpdateKind::Modify => self.apply_modify(update),
            UpdateKind::Cancel => self.apply_cancel(update),
            UpdateKind::Clear => {
                self.apply_clear();
                self.update_bbo(true, true);
                trace!(ticker = self.ticker_id, "book cleared");
                return;
            }
            UpdateKind::Trade
            | UpdateKind::SnapshotStart
            | UpdateKind::SnapshotEnd
            | UpdateKind::Invalid => return,
        }

        // Recompute the side the update landed on; the other side cannot
        // have moved.
        self.update_bbo(update.side == Side::Buy, update.side == Side::Sell);
        trace!(ticker = self.ticker_id, %update, bbo = %self.bbo, "market update applied");
    }

    /// The current best bid and offer.
    pub fn bbo(&self) -> &Bbo {
        &self.bbo
    }

    /// Best bid price, if any bids rest.
    pub fn best_bid(&self) -> Option<Price> {
        if self.bids_head.is_none() {
            None
        } else {
            Some(self.level_pool.get(self.bids_head).price)
        }
    }

    /// Best ask price, if any asks rest.
    pub fn best_ask(&self) -> Option<Price> {
        if self.asks_head.is_none() {
            None
        } else {
            Some(self.level_pool.get(self.asks_head).price)
        }
    }

    /// Number of resting orders across both sides.
    pub fn live_orders(&self) -> usize {
        self.order_pool.live()
    }

    /// Walks one side best-first: `(price, [(order id, qty)])` per level.
    pub fn side_levels(&self, side: Side) -> Vec<(Price, Vec<(OrderId, Qty)>)> {
        let head = match side {
            Side::Buy => self.bids_head,
            Side::Sell => self.asks_head,
            Side::Invalid => Handle::NONE,
        };
        let mut levels = Vec::new();
        if head.is_none() {
            return levels;
        }
        let mut level = head;
        loop {
            let entry = *self.level_pool.get(level);
            let mut orders = Vec::new();
            let mut order = entry.first_order;
            loop {
                let resting = self.order_pool.get(order);
                orders.push((resting.order_id, resting.qty));
                order = resting.next_order;
                if order == entry.first_order {
                    break;
                }
            }
            levels.push((entry.price, orders));
            level = entry.next_level;
            if level == head {
                break;
            }
        }
        levels
    }

    fn apply_add(&mut self, update: &MarketUpdate) {
        assert!(
            (update.order_id as usize) < ME_MAX_ORDER_IDS,
            "market order id {} exceeds the ME_MAX_ORDER_IDS index bound",
            update.order_id
        );
        // During recovery the stitched tail may overlap the snapshot by
        // one event; replacing keeps the replay idempotent.
        if self.lookup(update.order_id).is_some() {
            debug!(oid = update.order_id, "replacing known order on add");
            self.apply_cancel(update);
        }

        let handle = self.order_pool.allocate(MarketOrder {
            order_id: update.order_id,
            side: update.side,
            price: update.price,
            qty: update.qty,
            priority: update.priority,
            prev_order: Handle::NONE,
            next_order: Handle::NONE,
        });
        self.attach_order(handle);
        self.oid_to_order[update.order_id as usize] = handle;
    }

    fn apply_modify(&mut self, update: &MarketUpdate) {
        let Some(handle) = self.lookup(update.order_id) else {
            debug!(oid = update.order_id, "modify for unknown order, ignoring");
            return;
        };
        self.order_pool.get_mut(handle).qty = update.qty;
    }

    fn apply_cancel(&mut self, update: &MarketUpdate) {
        let Some(handle) = self.lookup(update.order_id) else {
            debug!(oid = update.order_id, "cancel for unknown order, ignoring");
            return;
        };
        self.remove_order(handle);
    }

    /// Wipes every order and level; the book is rebuilt from whatever
    /// follows (snapshot replay).
    fn apply_clear(&mut self) {
        for slot in self.oid_to_order.iter_mut() {
            if slot.is_some() {
                self.order_pool.deallocate(*slot);
                *slot = Handle::NONE;
            }
        }
        for slot in self.price_to_level.iter_mut() {
            if slot.is_some() {
                self.level_pool.deallocate(*slot);
                *slot = Handle::NONE;
            }
        }
        self.bids_head = Handle::NONE;
        self.asks_head = Handle::NONE;
    }

    #[inline]
    fn lookup(&self, order_id: OrderId) -> Option<Handle> {
        if (order_id as usize) >= ME_MAX_ORDER_IDS {
            return None;
        }
        let handle = self.oid_to_order[order_id as usize];
        if handle.is_none() { None } else { Some(handle) }
    }

    #[inline]
    fn price_index(price: Price) -> usize {
        price.rem_euclid(ME_MAX_PRICE_LEVELS as Price) as usize
    }

    #[inline]
    fn level_at(&self, price: Price) -> Handle {
        self.price_to_level[Self::price_index(price)]
    }

    #[inline]
    fn side_head(&self, side: Side) -> Handle {
        match side {
            Side::Buy => self.bids_head,
            _ => self.asks_head,
        }
    }

    #[inline]
    fn set_side_head(&mut self, side: Side, handle: Handle) {
        match side {
            Side::Buy => self.bids_head = handle,
            _ => self.asks_head = handle,
        }
    }

    fn attach_order(&mut self, handle: Handle) {
        let (side, price) = {
            let order = self.order_pool.get(handle);
            (order.side, order.price)
        };

        let level = self.level_at(price);
        if level.is_none() {
            {
                let order = self.order_pool.get_mut(handle);
                order.prev_order = handle;
                order.next_order = handle;
            }
            let new_level = self.level_pool.allocate(PriceLevel {
                side,
                price,
                first_order: handle,
                prev_level: Handle::NONE,
                next_level: Handle::NONE,
            });
            self.attach_level(new_level);
        } else {
            let first = self.level_pool.get(level).first_order;
            let tail = self.order_pool.get(first).prev_order;
            self.order_pool.get_mut(tail).next_order = handle;
            {
                let order = self.order_pool.get_mut(handle);
                order.prev_order = tail;
                order.next_order = first;
            }
            self.order_pool.get_mut(first).prev_order = handle;
        }
    }

    fn attach_level(&mut self, handle: Handle) {
        let (side, price) = {
            let level = self.level_pool.get(handle);
            (level.side, level.price)
        };

        let index = Self::price_index(price);
        assert!(
            self.price_to_level[index].is_none(),
            "price ladder collision at {price}: active span exceeds {ME_MAX_PRICE_LEVELS} levels"
        );
        self.price_to_level[index] = handle;

        let head = self.side_head(side);
        if head.is_none() {
            self.set_side_head(side, handle);
            let level = self.level_pool.get_mut(handle);
            level.prev_level = handle;
            level.next_level = handle;
            return;
        }

        let mut target = head;
        loop {
            let target_price = self.level_pool.get(target).price;
            let beats = match side {
                Side::Buy => price > target_price,
                _ => price < target_price,
            };
            if beats {
                self.insert_level_before(handle, target);
                if target == head {
                    self.set_side_head(side, handle);
                }
                return;
            }
            target = self.level_pool.get(target).next_level;
            if target == head {
                break;
            }
        }
        self.insert_level_before(handle, head);
    }

    fn insert_level_before(&mut self, handle: Handle, target: Handle) {
        let prev = self.level_pool.get(target).prev_level;
        {
            let level = self.level_pool.get_mut(handle);
            level.prev_level = prev;
            level.next_level = target;
        }
        self.level_pool.get_mut(prev).next_level = handle;
        self.level_pool.get_mut(target).prev_level = handle;
    }

    fn remove_order(&mut self, handle: Handle) {
        let order = *self.order_pool.get(handle);

        if order.prev_order == handle {
            self.remove_level(order.side, order.price);
        } else {
            self.order_pool.get_mut(order.prev_order).next_order = order.next_order;
            self.order_pool.get_mut(order.next_order).prev_order = order.prev_order;

            let level = self.level_at(order.price);
            assert!(level.is_some(), "resting order at {} has no level", order.price);
            if self.level_pool.get(level).first_order == handle {
                self.level_pool.get_mut(level).first_order = order.next_order;
            }
        }

        self.oid_to_order[order.order_id as usize] = Handle::NONE;
        self.order_pool.deallocate(handle);
    }

    fn remove_level(&mut self, side: Side, price: Price) {
        let handle = self.level_at(price);
        assert!(handle.is_some(), "removing unknown level at {price}");
        let level = *self.level_pool.get(handle);

        if level.next_level == handle {
            self.set_side_head(side, Handle::NONE);
        } else {
            self.level_pool.get_mut(level.prev_level).next_level = level.next_level;
            self.level_pool.get_mut(level.next_level).prev_level = level.prev_level;
            if self.side_head(side) == handle {
                self.set_side_head(side, level.next_level);
            }
        }

        self.price_to_level[Self::price_index(price)] = Handle::NONE;
        self.level_pool.deallocate(handle);
    }

    /// Recomputes the requested BBO sides by aggregating the best level's
    /// cyclic order list.
    fn update_bbo(&mut self, update_bid: bool, update_ask: bool) {
        if update_bid {
            if self.bids_head.is_some() {
                let level = *self.level_pool.get(self.bids_head);
                self.bbo.bid_price = level.price;
                self.bbo.bid_qty = self.aggregate_level_qty(level.first_order);
            } else {
                self.bbo.bid_price = PRICE_INVALID;
                self.bbo.bid_qty = QTY_INVALID;
            }
        }
        if update_ask {
            if self.asks_head.is_some() {
                let level = *self.level_pool.get(self.asks_head);
                self.bbo.ask_price = level.price;
                self.bbo.ask_qty = self.aggregate_level_qty(level.first_order);
            } else {
                self.bbo.ask_price = PRICE_INVALID;
                self.bbo.ask_qty = QTY_INVALID;
            }
        }
    }

    fn aggregate_level_qty(&self, first: Handle) -> Qty {
        let mut qty = self.order_pool.get(first).qty;
        let mut order = self.order_pool.get(first).next_order;
        while order != first {
            let resting = self.order_pool.get(order);
            qty += resting.qty;
            order = resting.next_order;
        }
        qty
    }
}
