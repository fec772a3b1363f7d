//! Client-side replica book and BBO maintenance.

use exchange_rs::prelude::*;

fn add(order_id: OrderId, side: Side, price: Price, qty: Qty, priority: Priority) -> MarketUpdate {
    MarketUpdate {
        kind: UpdateKind::Add,
        order_id,
        ticker_id: 0,
        side,
        price,
        qty,
        priority,
    }
}

fn update_of(kind: UpdateKind, order_id: OrderId, side: Side, price: Price, qty: Qty) -> MarketUpdate {
    MarketUpdate { kind, order_id, ticker_id: 0, side, price, qty, priority: PRIORITY_INVALID }
}

#[test]
fn add_updates_ladder_and_bbo() {
    let mut book = MarketBook::new(0);

    book.on_market_update(&add(1, Side::Buy, 100, 10, 1));
    assert_eq!(book.best_bid(), Some(100));
    assert_eq!(book.bbo().bid_price, 100);
    assert_eq!(book.bbo().bid_qty, 10);
    assert_eq!(book.bbo().ask_price, PRICE_INVALID);

    // A second order at the same price aggregates into the BBO quantity.
    book.on_market_update(&add(2, Side::Buy, 100, 5, 2));
    assert_eq!(book.bbo().bid_qty, 15);

    // A better bid takes over the top.
    book.on_market_update(&add(3, Side::Buy, 101, 3, 1));
    assert_eq!(book.bbo().bid_price, 101);
    assert_eq!(book.bbo().bid_qty, 3);

    assert_eq!(
        book.side_levels(Side::Buy),
        vec![(101, vec![(3, 3)]), (100, vec![(1, 10), (2, 5)])]
    );
}

#[test]
fn modify_changes_quantity_in_place() {
    let mut book = MarketBook::new(0);
    book.on_market_update(&add(1, Side::Sell, 105, 10, 1));
    book.on_market_update(&add(2, Side::Sell, 105, 10, 2));

    book.on_market_update(&update_of(UpdateKind::Modify, 1, Side::Sell, 105, 4));

    assert_eq!(book.side_levels(Side::Sell), vec![(105, vec![(1, 4), (2, 10)])]);
    assert_eq!(book.bbo().ask_qty, 14);
}

#[test]
fn cancel_removes_order_and_empties_level() {
    let mut book = MarketBook::new(0);
    book.on_market_update(&add(1, Side::Sell, 105, 10, 1));
    book.on_market_update(&add(2, Side::Sell, 106, 5, 1));

    book.on_market_update(&update_of(UpdateKind::Cancel, 1, Side::Sell, 105, 0));

    assert_eq!(book.best_ask(), Some(106));
    assert_eq!(book.bbo().ask_price, 106);
    assert_eq!(book.bbo().ask_qty, 5);
    assert_eq!(book.live_orders(), 1);

    book.on_market_update(&update_of(UpdateKind::Cancel, 2, Side::Sell, 106, 0));
    assert_eq!(book.best_ask(), None);
    assert_eq!(book.bbo().ask_price, PRICE_INVALID);
    assert_eq!(book.bbo().ask_qty, QTY_INVALID);
}

#[test]
fn clear_wipes_both_sides() {
    let mut book = MarketBook::new(0);
    book.on_market_update(&add(1, Side::Buy, 100, 10, 1));
    book.on_market_update(&add(2, Side::Sell, 105, 10, 1));

    book.on_market_update(&update_of(UpdateKind::Clear, ORDER_ID_INVALID, Side::Invalid, PRICE_INVALID, QTY_INVALID));

    assert_eq!(book.live_orders(), 0);
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), None);
    assert_eq!(book.bbo().bid_price, PRICE_INVALID);

    // The book keeps working after a clear (snapshot replay follows it).
    book.on_market_update(&add(7, Side::Sell, 101, 2, 1));
    assert_eq!(book.best_ask(), Some(101));
}

#[test]
fn trade_updates_do_not_touch_resting_state() {
    let mut book = MarketBook::new(0);
    book.on_market_update(&add(1, Side::Buy, 100, 10, 1));

    book.on_market_update(&update_of(UpdateKind::Trade, ORDER_ID_INVALID, Side::Sell, 100, 4));

    assert_eq!(book.side_levels(Side::Buy), vec![(100, vec![(1, 10)])]);
    assert_eq!(book.bbo().bid_qty, 10);
}

#[test]
fn duplicate_add_replaces_the_known_order() {
    let mut book = MarketBook::new(0);
    book.on_market_update(&add(1, Side::Buy, 100, 10, 1));
    // Replay overlap: the same order arrives again with fresher state.
    book.on_market_update(&add(1, Side::Buy, 100, 6, 1));

    assert_eq!(book.side_levels(Side::Buy), vec![(100, vec![(1, 6)])]);
    assert_eq!(book.live_orders(), 1);
    assert_eq!(book.bbo().bid_qty, 6);
}

#[test]
fn unknown_modify_and_cancel_are_ignored() {
    let mut book = MarketBook::new(0);
    book.on_market_update(&update_of(UpdateKind::Modify, 42, Side::Buy, 100, 5));
    book.on_market_update(&update_of(UpdateKind::Cancel, 42, Side::Buy, 100, 0));
    assert_eq!(book.live_orders(), 0);
}

#[test]
fn trade_engine_routes_updates_and_responses() {
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recording {
        trades: usize,
        book_updates: usize,
        responses: usize,
    }

    struct RecordingStrategy(Arc<Mutex<Recording>>);
    impl Strategy for RecordingStrategy {
        fn on_book_update(
            &mut self,
            _book: &MarketBook,
            _update: &MarketUpdate,
            _orders: &mut OrderEntry<'_>,
        ) {
            self.0.lock().unwrap().book_updates += 1;
        }
        fn on_trade(
            &mut self,
            _update: &MarketUpdate,
            _book: &MarketBook,
            _orders: &mut OrderEntry<'_>,
        ) {
            self.0.lock().unwrap().trades += 1;
        }
        fn on_response(&mut self, _response: &ClientResponse, _orders: &mut OrderEntry<'_>) {
            self.0.lock().unwrap().responses += 1;
        }
    }

    let recording = Arc::new(Mutex::new(Recording::default()));
    let (mut update_tx, update_rx) = spsc_channel::<MarketUpdate>(64);
    let (mut response_tx, response_rx) = spsc_channel::<ClientResponse>(64);
    let (request_tx, _request_rx) = spsc_channel::<ClientRequest>(64);

    let mut engine = TradeEngine::new(
        7,
        update_rx,
        response_rx,
        request_tx,
        Box::new(RecordingStrategy(recording.clone())),
    );

    update_tx.push(add(1, Side::Buy, 100, 10, 1));
    update_tx.push(update_of(UpdateKind::Trade, ORDER_ID_INVALID, Side::Sell, 100, 4));
    response_tx.push(ClientResponse { kind: ResponseKind::Accepted, ..ClientResponse::default() });
    engine.poll();

    assert_eq!(engine.book(0).best_bid(), Some(100));
    let recorded = recording.lock().unwrap();
    assert_eq!(recorded.book_updates, 1);
    assert_eq!(recorded.trades, 1);
    assert_eq!(recorded.responses, 1);
}
