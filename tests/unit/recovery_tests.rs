//! Consumer gap-detection and snapshot stitching.

use exchange_rs::prelude::*;

fn seq(seq_number: SeqNum, update: MarketUpdate) -> SequencedUpdate {
    SequencedUpdate { seq_number, update }
}

fn add(order_id: OrderId, side: Side, price: Price, qty: Qty) -> MarketUpdate {
    MarketUpdate {
        kind: UpdateKind::Add,
        order_id,
        ticker_id: 0,
        side,
        price,
        qty,
        priority: 1,
    }
}

fn modify(order_id: OrderId, side: Side, price: Price, qty: Qty) -> MarketUpdate {
    MarketUpdate {
        kind: UpdateKind::Modify,
        order_id,
        ticker_id: 0,
        side,
        price,
        qty,
        priority: 1,
    }
}

fn clear(ticker_id: TickerId) -> MarketUpdate {
    MarketUpdate {
        kind: UpdateKind::Clear,
        order_id: ORDER_ID_INVALID,
        ticker_id,
        side: Side::Invalid,
        price: PRICE_INVALID,
        qty: QTY_INVALID,
        priority: PRIORITY_INVALID,
    }
}

fn sentinel(kind: UpdateKind, anchor: SeqNum) -> MarketUpdate {
    MarketUpdate {
        kind,
        order_id: anchor,
        ticker_id: TICKER_ID_INVALID,
        side: Side::Invalid,
        price: PRICE_INVALID,
        qty: QTY_INVALID,
        priority: PRIORITY_INVALID,
    }
}

fn drain(rx: &mut Consumer<MarketUpdate>) -> Vec<MarketUpdate> {
    std::iter::from_fn(|| rx.pop()).collect()
}

#[test]
fn live_updates_flow_straight_through() {
    let (tx, mut rx) = spsc_channel(64);
    let mut consumer = MarketDataConsumer::detached(tx);

    consumer.on_incremental(&seq(1, add(1, Side::Buy, 100, 10)));
    consumer.on_incremental(&seq(2, add(2, Side::Sell, 105, 5)));

    assert!(!consumer.in_recovery());
    assert_eq!(consumer.next_expected_inc_seq(), 3);
    assert_eq!(drain(&mut rx).len(), 2);
}

#[test]
fn snapshot_datagrams_are_ignored_while_live() {
    let (tx, mut rx) = spsc_channel(64);
    let mut consumer = MarketDataConsumer::detached(tx);

    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 9)));
    assert!(!consumer.in_recovery());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn gap_enters_recovery_and_stitches_the_literal_scenario() {
    // Incrementals 1, 2, 3 arrive, 4 is lost, 5 triggers recovery. The
    // snapshot cycle anchored at 6 plus staged incrementals 6 and 7
    // bring the consumer back to Live expecting 8.
    let (tx, mut rx) = spsc_channel(64);
    let mut consumer = MarketDataConsumer::detached(tx);

    consumer.on_incremental(&seq(1, add(1, Side::Buy, 100, 10)));
    consumer.on_incremental(&seq(2, add(2, Side::Sell, 105, 5)));
    consumer.on_incremental(&seq(3, modify(1, Side::Buy, 100, 8)));
    assert_eq!(drain(&mut rx).len(), 3);

    consumer.on_incremental(&seq(5, modify(2, Side::Sell, 105, 4)));
    assert!(consumer.in_recovery());
    assert!(drain(&mut rx).is_empty());

    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 6)));
    consumer.on_snapshot(&seq(1, clear(0)));
    consumer.on_snapshot(&seq(2, add(7, Side::Sell, 101, 2)));
    assert!(consumer.in_recovery());

    // Incremental 6 is buffered mid-recovery, then the snapshot ends:
    // the cycle is complete and 6 bridges from the anchor, so the
    // consumer stitches and returns to Live.
    consumer.on_incremental(&seq(6, modify(7, Side::Sell, 101, 1)));
    consumer.on_snapshot(&seq(3, sentinel(UpdateKind::SnapshotEnd, 6)));
    assert!(!consumer.in_recovery());
    assert_eq!(consumer.next_expected_inc_seq(), 7);

    // 7 then arrives on the live path.
    consumer.on_incremental(&seq(7, add(8, Side::Buy, 99, 3)));
    assert!(!consumer.in_recovery());
    assert_eq!(consumer.next_expected_inc_seq(), 8);

    let emitted = drain(&mut rx);
    let kinds: Vec<UpdateKind> = emitted.iter().map(|u| u.kind).collect();
    assert_eq!(
        kinds,
        vec![UpdateKind::Clear, UpdateKind::Add, UpdateKind::Modify, UpdateKind::Add]
    );
    // Snapshot body first, then the stitched tail, then live updates.
    assert_eq!(emitted[1].order_id, 7);
    assert_eq!(emitted[2].qty, 1);
    assert_eq!(emitted[3].order_id, 8);
}

#[test]
fn live_resumes_after_recovery() {
    let (tx, mut rx) = spsc_channel(64);
    let mut consumer = MarketDataConsumer::detached(tx);

    consumer.on_incremental(&seq(2, add(2, Side::Buy, 100, 1)));
    assert!(consumer.in_recovery());

    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 2)));
    consumer.on_snapshot(&seq(1, clear(0)));
    consumer.on_snapshot(&seq(2, sentinel(UpdateKind::SnapshotEnd, 2)));

    assert!(!consumer.in_recovery());
    assert_eq!(consumer.next_expected_inc_seq(), 3);
    drain(&mut rx);

    consumer.on_incremental(&seq(3, add(3, Side::Sell, 105, 1)));
    assert_eq!(consumer.next_expected_inc_seq(), 4);
    assert_eq!(drain(&mut rx).len(), 1);
}

#[test]
fn mid_cycle_join_discards_the_partial_snapshot() {
    let (tx, mut rx) = spsc_channel(64);
    let mut consumer = MarketDataConsumer::detached(tx);

    consumer.on_incremental(&seq(4, add(4, Side::Buy, 100, 1)));
    assert!(consumer.in_recovery());

    // We joined after the cycle started: first staged record is not
    // SnapshotStart, so the stage is discarded and we wait.
    consumer.on_snapshot(&seq(2, add(9, Side::Sell, 101, 2)));
    consumer.on_snapshot(&seq(3, sentinel(UpdateKind::SnapshotEnd, 3)));
    assert!(consumer.in_recovery());
    assert!(drain(&mut rx).is_empty());

    // The next full cycle recovers; its anchor reaches the staged 4.
    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 4)));
    consumer.on_snapshot(&seq(1, clear(0)));
    consumer.on_snapshot(&seq(2, sentinel(UpdateKind::SnapshotEnd, 4)));

    assert!(!consumer.in_recovery());
    assert_eq!(consumer.next_expected_inc_seq(), 5);
}

#[test]
fn snapshot_gap_waits_for_the_next_cycle() {
    let (tx, _rx) = spsc_channel(64);
    let mut consumer = MarketDataConsumer::detached(tx);

    consumer.on_incremental(&seq(9, add(9, Side::Buy, 100, 1)));
    assert!(consumer.in_recovery());

    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 9)));
    // Record 1 lost; 2 exposes the hole and discards the stage.
    consumer.on_snapshot(&seq(2, sentinel(UpdateKind::SnapshotEnd, 9)));
    assert!(consumer.in_recovery());

    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 9)));
    consumer.on_snapshot(&seq(1, clear(0)));
    consumer.on_snapshot(&seq(2, sentinel(UpdateKind::SnapshotEnd, 9)));
    assert!(!consumer.in_recovery());
    assert_eq!(consumer.next_expected_inc_seq(), 10);
}

#[test]
fn duplicate_snapshot_sequence_restarts_the_stage() {
    let (tx, _rx) = spsc_channel(64);
    let mut consumer = MarketDataConsumer::detached(tx);

    consumer.on_incremental(&seq(5, add(5, Side::Buy, 100, 1)));
    assert!(consumer.in_recovery());

    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 4)));
    consumer.on_snapshot(&seq(1, clear(0)));
    // The synthesizer restarted its cycle: a fresh seq 0 arrives.
    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 5)));
    consumer.on_snapshot(&seq(1, clear(0)));
    consumer.on_snapshot(&seq(2, sentinel(UpdateKind::SnapshotEnd, 5)));

    assert!(!consumer.in_recovery());
    assert_eq!(consumer.next_expected_inc_seq(), 6);
}

#[test]
fn incremental_gap_behind_the_snapshot_discards_it() {
    let (tx, _rx) = spsc_channel(64);
    let mut consumer = MarketDataConsumer::detached(tx);

    // Gap at 5; only incremental 7 is staged, so a snapshot anchored at
    // 5 cannot bridge 5→7 and must be discarded.
    consumer.on_incremental(&seq(7, add(7, Side::Buy, 100, 1)));
    assert!(consumer.in_recovery());

    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 5)));
    consumer.on_snapshot(&seq(1, clear(0)));
    consumer.on_snapshot(&seq(2, sentinel(UpdateKind::SnapshotEnd, 5)));
    assert!(consumer.in_recovery());

    // A later cycle anchored at 7 bridges to the staged tail.
    consumer.on_snapshot(&seq(0, sentinel(UpdateKind::SnapshotStart, 7)));
    consumer.on_snapshot(&seq(1, clear(0)));
    consumer.on_snapshot(&seq(2, sentinel(UpdateKind::SnapshotEnd, 7)));

    assert!(!consumer.in_recovery());
    assert_eq!(consumer.next_expected_inc_seq(), 8);
}
