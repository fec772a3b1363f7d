//! Matching engine dispatch and cross-queue ordering.

use crate::common::{cancel_request, new_request};
use exchange_rs::prelude::*;

fn engine_with_queues() -> (
    MatchingEngine,
    Producer<ClientRequest>,
    Consumer<ClientResponse>,
    Consumer<MarketUpdate>,
) {
    let (request_tx, request_rx) = spsc_channel::<ClientRequest>(1024);
    let (response_tx, response_rx) = spsc_channel::<ClientResponse>(1024);
    let (update_tx, update_rx) = spsc_channel::<MarketUpdate>(1024);
    let engine = MatchingEngine::new(request_rx, response_tx, update_tx);
    (engine, request_tx, response_rx, update_rx)
}

#[test]
fn dispatches_by_instrument() {
    let (mut engine, _tx, mut responses, mut updates) = engine_with_queues();

    let mut req = new_request(1, 1, Side::Buy, 100, 10);
    req.ticker_id = 2;
    engine.process(&req);

    assert_eq!(engine.book(2).best_bid(), Some(100));
    assert_eq!(engine.book(0).best_bid(), None);

    let response = responses.pop().unwrap();
    assert_eq!(response.kind, ResponseKind::Accepted);
    assert_eq!(response.ticker_id, 2);

    let update = updates.pop().unwrap();
    assert_eq!(update.kind, UpdateKind::Add);
    assert_eq!(update.ticker_id, 2);
}

#[test]
fn per_instrument_market_order_ids_are_independent() {
    let (mut engine, _tx, mut responses, _updates) = engine_with_queues();

    let mut req = new_request(1, 1, Side::Buy, 100, 10);
    engine.process(&req);
    req.ticker_id = 1;
    req.client_order_id = 2;
    engine.process(&req);

    // Each book assigns from its own counter starting at 1.
    assert_eq!(responses.pop().unwrap().market_order_id, 1);
    assert_eq!(responses.pop().unwrap().market_order_id, 1);
}

#[test]
fn outputs_of_one_request_precede_the_next_request() {
    let (mut engine, _tx, mut responses, mut updates) = engine_with_queues();

    engine.process(&new_request(1, 1, Side::Buy, 100, 10));
    engine.process(&new_request(2, 1, Side::Sell, 100, 4));
    engine.process(&cancel_request(1, 1));

    // Responses: request 1, then all of request 2, then request 3.
    let kinds: Vec<ResponseKind> =
        std::iter::from_fn(|| responses.pop()).map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ResponseKind::Accepted,
            ResponseKind::Accepted,
            ResponseKind::Filled,
            ResponseKind::Filled,
            ResponseKind::Canceled,
        ]
    );

    let update_kinds: Vec<UpdateKind> =
        std::iter::from_fn(|| updates.pop()).map(|u| u.kind).collect();
    assert_eq!(
        update_kinds,
        vec![
            UpdateKind::Add,
            UpdateKind::Trade,
            UpdateKind::Modify,
            UpdateKind::Cancel,
        ]
    );
}

#[test]
fn worker_thread_drains_the_request_queue() {
    let (engine, mut requests, mut responses, _updates) = engine_with_queues();
    let worker = engine.start();

    requests.push(new_request(1, 1, Side::Buy, 100, 10));
    requests.push(new_request(2, 1, Side::Sell, 100, 10));

    let mut received = Vec::new();
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while received.len() < 4 && std::time::Instant::now() < deadline {
        if let Some(response) = responses.pop() {
            received.push(response.kind);
        }
    }
    worker.stop();

    assert_eq!(
        received,
        vec![
            ResponseKind::Accepted,
            ResponseKind::Accepted,
            ResponseKind::Filled,
            ResponseKind::Filled,
        ]
    );
}

#[test]
#[should_panic(expected = "invalid client request kind")]
fn invalid_request_kind_is_fatal() {
    let (mut engine, _tx, _responses, _updates) = engine_with_queues();
    let mut req = ClientRequest::default();
    req.ticker_id = 0;
    engine.process(&req);
}
