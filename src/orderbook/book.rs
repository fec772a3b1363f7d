//! Core OrderBook implementation: price-time-priority matching over
//! arena-backed intrusive lists.

use super::EventSink;
use super::ladder::{Order, PriceLevel};
use crate::fabric::{Handle, ObjectPool};
use crate::messages::{ClientResponse, MarketUpdate, ResponseKind, UpdateKind};
use crate::types::{
    ClientId, ME_MAX_NUM_CLIENTS, ME_MAX_ORDER_IDS, ME_MAX_PRICE_LEVELS, ORDER_ID_INVALID,
    OrderId, PRICE_INVALID, PRIORITY_INVALID, Price, Priority, QTY_INVALID, Qty, Side, TickerId,
};
use tracing::trace;

/// Price-time-priority order book for a single instrument.
///
/// The book owns all order and level storage through two bounded pools;
/// the ladder, the price index, and the per-client reverse index hold
/// non-owning handles into them. All operations run on the matching-engine
/// thread; there is no interior synchronization.
///
/// Outputs are pushed through the [`EventSink`] passed to each operation,
/// in emission order: the engine forwards them to the response and
/// market-data queues before dequeuing the next request.
pub struct OrderBook {
    ticker_id: TickerId,

    order_pool: ObjectPool<Order>,
    level_pool: ObjectPool<PriceLevel>,

    /// Best bid level, head of the descending cyclic bid ladder.
    bids_head: Handle,
    /// Best ask level, head of the ascending cyclic ask ladder.
    asks_head: Handle,

    /// Direct index from `price % ME_MAX_PRICE_LEVELS` to the live level
    /// at that price. The active price span of the instrument must stay
    /// below `ME_MAX_PRICE_LEVELS` ticks.
    price_to_level: Box<[Handle]>,

    /// Direct index from (client id, client order id) to the resting
    /// order, flattened row-major.
    client_orders: Box<[Handle]>,

    next_market_order_id: OrderId,
}

impl OrderBook {
    /// Creates an empty book for `ticker_id` with fully pre-allocated
    /// storage.
    pub fn new(ticker_id: TickerId) -> Self {
        OrderBook {
            ticker_id,
            order_pool: ObjectPool::new(ME_MAX_ORDER_IDS),
            level_pool: ObjectPool::new(ME_MAX_PRICE_LEVELS),
            bids_head: Handle::NONE,
            asks_head: Handle::NONE,
            price_to_level: vec![Handle::NONE; ME_MAX_PRICE_LEVELS].into_boxed_slice(),
            client_orders: vec![Handle::NONE; ME_MAX_NUM_CLIENTS * ME_MAX_ORDER_IDS]
                .into_boxed_slice(),
            next_market_order_id: 1,
        }
    }

    /// The instrument this book trades.
    pub fn ticker_id(&self) -> TickerId {
        self.ticker_id
    }

    /// Handles a New request: acknowledges, matches against the opposite
    /// side, and rests any residual quantity.
    ///
    /// Emission order per the protocol: `Accepted` first, then one
    /// `Filled` pair plus one `Trade` (and a passive `Cancel` or `Modify`)
    /// per match step, then an `Add` if quantity rests.
    pub fn add(
        &mut self,
        sink: &mut dyn EventSink,
        client_id: ClientId,
        client_order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
    ) {
        assert!(side != Side::Invalid, "add with invalid side");
        assert!(
            (client_id as usize) < ME_MAX_NUM_CLIENTS
                && (client_order_id as usize) < ME_MAX_ORDER_IDS,
            "order identifiers out of range: client {client_id} oid {client_order_id}"
        );

        let market_order_id = self.next_market_order_id;
        self.next_market_order_id = self.next_market_order_id.wrapping_add(1);

        sink.client_response(&ClientResponse {
            kind: ResponseKind::Accepted,
            client_id,
            ticker_id: self.ticker_id,
            client_order_id,
            market_order_id,
            side,
            price,
            qty,
            exec_qty: 0,
            leaves_qty: qty,
        });

        let leaves_qty =
            self.match_incoming(sink, client_id, client_order_id, side, price, qty, market_order_id);

        if leaves_qty > 0 {
            let priority = self.next_priority(price);
            let handle = self.order_pool.allocate(Order {
                ticker_id: self.ticker_id,
                client_id,
                client_order_id,
                market_order_id,
                side,
                price,
                qty: leaves_qty,
                priority,
                prev_order: Handle::NONE,
                next_order: Handle::NONE,
            });
            self.attach_order(handle);

            sink.market_update(&MarketUpdate {
                kind: UpdateKind::Add,
                order_id: market_order_id,
                ticker_id: self.ticker_id,
                side,
                price,
                qty: leaves_qty,
                priority,
            });
        }

        trace!(
            ticker = self.ticker_id,
            client = client_id,
            oid = client_order_id,
            moid = market_order_id,
            leaves = leaves_qty,
            "add processed"
        );
    }

    /// Handles a Cancel request. An unknown (client, client-order-id)
    /// pair yields `CancelRejected` with no market impact.
    pub fn cancel(
        &mut self,
        sink: &mut dyn EventSink,
        client_id: ClientId,
        client_order_id: OrderId,
    ) {
        let in_range = (client_id as usize) < ME_MAX_NUM_CLIENTS
            && (client_order_id as usize) < ME_MAX_ORDER_IDS;
        let handle = if in_range {
            self.client_orders[Self::client_slot(client_id, client_order_id)]
        } else {
            Handle::NONE
        };

        let response = if handle.is_none() {
            ClientResponse {
                kind: ResponseKind::CancelRejected,
                client_id,
                ticker_id: self.ticker_id,
                client_order_id,
                market_order_id: ORDER_ID_INVALID,
                side: Side::Invalid,
                price: PRICE_INVALID,
                qty: QTY_INVALID,
                exec_qty: QTY_INVALID,
                leaves_qty: QTY_INVALID,
            }
        } else {
            let order = *self.order_pool.get(handle);
            self.remove_order(handle);

            sink.market_update(&MarketUpdate {
                kind: UpdateKind::Cancel,
                order_id: order.market_order_id,
                ticker_id: self.ticker_id,
                side: order.side,
                price: order.price,
                qty: 0,
                priority: order.priority,
            });

            ClientResponse {
                kind: ResponseKind::Canceled,
                client_id,
                ticker_id: self.ticker_id,
                client_order_id,
                market_order_id: order.market_order_id,
                side: order.side,
                price: order.price,
                qty: QTY_INVALID,
                exec_qty: QTY_INVALID,
                leaves_qty: order.qty,
            }
        };

        let rejected = response.kind == ResponseKind::CancelRejected;
        trace!(
            ticker = self.ticker_id,
            client = client_id,
            oid = client_order_id,
            rejected,
            "cancel processed"
        );
        sink.client_response(&response);
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

    /// The resting order for (client, client-order-id), if any.
    pub fn find_order(&self, client_id: ClientId, client_order_id: OrderId) -> Option<&Order> {
        if (client_id as usize) >= ME_MAX_NUM_CLIENTS
            || (client_order_id as usize) >= ME_MAX_ORDER_IDS
        {
            return None;
        }
        let handle = self.client_orders[Self::client_slot(client_id, client_order_id)];
        if handle.is_none() {
            None
        } else {
            Some(self.order_pool.get(handle))
        }
    }

    /// Walks one side best-first and materializes its ladder, each level
    /// as `(price, [(market order id, qty, priority)])` head-to-tail.
    pub fn side_levels(&self, side: Side) -> Vec<(Price, Vec<(OrderId, Qty, Priority)>)> {
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
            let first = entry.first_order;
            let mut order = first;
            loop {
                let resting = self.order_pool.get(order);
                orders.push((resting.market_order_id, resting.qty, resting.priority));
                order = resting.next_order;
                if order == first {
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

    #[inline]
    fn price_index(price: Price) -> usize {
        price.rem_euclid(ME_MAX_PRICE_LEVELS as Price) as usize
    }

    #[inline]
    fn client_slot(client_id: ClientId, client_order_id: OrderId) -> usize {
        client_id as usize * ME_MAX_ORDER_IDS + client_order_id as usize
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

    /// Priority for a new order at `price`: tail priority plus one when
    /// the level exists, else 1. The tail is one `prev` hop from the
    /// level head in the cyclic list.
    fn next_priority(&self, price: Price) -> Priority {
        let level = self.level_at(price);
        if level.is_none() {
            return 1;
        }
        let first = self.level_pool.get(level).first_order;
        let tail = self.order_pool.get(first).prev_order;
        self.order_pool.get(tail).priority + 1
    }

    /// Splices a freshly allocated order into its level, creating the
    /// level when it is the first order at that price, and registers the
    /// reverse-index entry.
    fn attach_order(&mut self, handle: Handle) {
        let (side, price, client_id, client_order_id) = {
            let order = self.order_pool.get(handle);
            (order.side, order.price, order.client_id, order.client_order_id)
        };

        let level = self.level_at(price);
        if level.is_none() {
            // First order at this price: self-link and grow the ladder.
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
            // Append at the tail of the cyclic FIFO list.
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

        self.client_orders[Self::client_slot(client_id, client_order_id)] = handle;
    }

    /// Splices a new level into its side's sorted cyclic ladder: before
    /// the first level it strictly beats, else at the tail; the side head
    /// moves when the new level is the new best.
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

        // Beats nothing: append at the tail, which in a cyclic list is
        // inserting before the head without moving it.
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

    /// Unlinks and frees a resting order, dropping its level when it was
    /// the sole member.
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

        self.client_orders[Self::client_slot(order.client_id, order.client_order_id)] =
            Handle::NONE;
        self.order_pool.deallocate(handle);
    }

    /// Unlinks and frees an empty level, updating the side head.
    fn remove_level(&mut self, side: Side, price: Price) {
        let handle = self.level_at(price);
        assert!(handle.is_some(), "removing unknown level at {price}");
        let level = *self.level_pool.get(handle);

        if level.next_level == handle {
            // Last level on this side.
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

    /// Sweeps the opposite side while the incoming order still crosses,
    /// returning the unmatched residual.
    #[allow(clippy::too_many_arguments)]
    fn match_incoming(
        &mut self,
        sink: &mut dyn EventSink,
        client_id: ClientId,
        client_order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
        market_order_id: OrderId,
    ) -> Qty {
        let mut leaves_qty = qty;

        while leaves_qty > 0 {
            let best = self.side_head(side.opposite());
            if best.is_none() {
                break;
            }
            let passive = self.level_pool.get(best).first_order;
            let passive_price = self.order_pool.get(passive).price;

            let crosses = match side {
                Side::Buy => price >= passive_price,
                _ => price <= passive_price,
            };
            if !crosses {
                break;
            }

            self.execute_match(
                sink,
                client_id,
                client_order_id,
                side,
                market_order_id,
                passive,
                &mut leaves_qty,
            );
        }

        leaves_qty
    }

    /// One match step against the passive order at the head of the best
    /// opposite level. Fills at the passive price, notifies both owners,
    /// publishes the anonymous trade, and either removes or modifies the
    /// passive order.
    #[allow(clippy::too_many_arguments)]
    fn execute_match(
        &mut self,
        sink: &mut dyn EventSink,
        client_id: ClientId,
        client_order_id: OrderId,
        side: Side,
        market_order_id: OrderId,
        passive: Handle,
        leaves_qty: &mut Qty,
    ) {
        let resting = *self.order_pool.get(passive);

        let fill_qty = (*leaves_qty).min(resting.qty);
        *leaves_qty -= fill_qty;
        let passive_leaves = resting.qty - fill_qty;
        self.order_pool.get_mut(passive).qty = passive_leaves;

        // Both owners learn of the fill at the passive price.
        sink.client_response(&ClientResponse {
            kind: ResponseKind::Filled,
            client_id,
            ticker_id: self.ticker_id,
            client_order_id,
            market_order_id,
            side,
            price: resting.price,
            qty: QTY_INVALID,
            exec_qty: fill_qty,
            leaves_qty: *leaves_qty,
        });
        sink.client_response(&ClientResponse {
            kind: ResponseKind::Filled,
            client_id: resting.client_id,
            ticker_id: self.ticker_id,
            client_order_id: resting.client_order_id,
            market_order_id: resting.market_order_id,
            side: resting.side,
            price: resting.price,
            qty: QTY_INVALID,
            exec_qty: fill_qty,
            leaves_qty: passive_leaves,
        });

        // The trade itself carries no participant identity.
        sink.market_update(&MarketUpdate {
            kind: UpdateKind::Trade,
            order_id: ORDER_ID_INVALID,
            ticker_id: self.ticker_id,
            side,
            price: resting.price,
            qty: fill_qty,
            priority: PRIORITY_INVALID,
        });

        if passive_leaves == 0 {
            sink.market_update(&MarketUpdate {
                kind: UpdateKind::Cancel,
                order_id: resting.market_order_id,
                ticker_id: self.ticker_id,
                side: resting.side,
                price: resting.price,
                qty: 0,
                priority: PRIORITY_INVALID,
            });
            self.remove_order(passive);
        } else {
            // The passive order keeps its original priority.
            sink.market_update(&MarketUpdate {
                kind: UpdateKind::Modify,
                order_id: resting.market_order_id,
                ticker_id: self.ticker_id,
                side: resting.side,
                price: resting.price,
                qty: passive_leaves,
                priority: resting.priority,
            });
        }
    }
}
