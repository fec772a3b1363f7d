//! Periodic snapshot synthesizer.
//!
//! Replays the publisher's teed stream into a flat shadow table — one
//! ordered map of market-order-id → last update per instrument — and
//! every snapshot interval multicasts the full resting state on the
//! snapshot group. The shadow table is deliberately not a book: its
//! output is a replay, not matching, so it never needs the sorted ladder
//! and stays out of the hot path.
//!
//! A snapshot cycle is framed by `SnapshotStart` and `SnapshotEnd`
//! records whose order-id field carries the *anchor*: the last
//! incremental sequence number the snapshot reflects. Snapshot datagrams
//! carry their own sequence space starting at 0 each cycle; consumers
//! key on the Start/End sentinels, never on absolute snapshot sequence
//! numbers.

use crate::error::ExchangeError;
use crate::fabric::Consumer;
use crate::messages::{MarketUpdate, SequencedUpdate, UpdateKind};
use crate::net;
use crate::types::{
    ME_MAX_TICKERS, ORDER_ID_INVALID, OrderId, PRICE_INVALID, PRIORITY_INVALID, QTY_INVALID,
    SeqNum, Side, TICKER_ID_INVALID, TickerId,
};
use crate::utils::Worker;
use std::collections::BTreeMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zerocopy::IntoBytes;

/// Snapshot synthesizer thread state. Owns the snapshot multicast socket
/// and the shadow tables.
pub struct SnapshotSynthesizer {
    feed: Consumer<SequencedUpdate>,
    socket: UdpSocket,
    group: SocketAddr,

    /// Per-instrument resting orders as last seen on the incremental
    /// stream. Ordered so snapshot replay is deterministic.
    ticker_orders: Vec<BTreeMap<OrderId, MarketUpdate>>,
    /// Last incremental sequence number applied to the shadow tables.
    last_inc_seq: SeqNum,

    interval: Duration,
    last_snapshot: Instant,
    running: Arc<AtomicBool>,
}

impl SnapshotSynthesizer {
    /// Creates the multicast sender for `group`; `interval` is the
    /// snapshot cadence (60 s nominal).
    pub fn new(
        group: SocketAddr,
        feed: Consumer<SequencedUpdate>,
        interval: Duration,
    ) -> Result<Self, ExchangeError> {
        let socket = net::multicast_sender(group)?;
        Ok(SnapshotSynthesizer {
            feed,
            socket,
            group,
            ticker_orders: (0..ME_MAX_TICKERS).map(|_| BTreeMap::new()).collect(),
            last_inc_seq: 0,
            interval,
            last_snapshot: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Moves the synthesizer onto its worker thread.
    pub fn start(self) -> Worker {
        let running = Arc::clone(&self.running);
        let mut synthesizer = self;
        Worker::spawn("snapshot-synthesizer", running, move || {
            while synthesizer.running.load(Ordering::Acquire) {
                synthesizer.poll();
            }
        })
    }

    /// Drains the feed and publishes a snapshot when the interval has
    /// elapsed.
    pub fn poll(&mut self) {
        while let Some(sequenced) = self.feed.pop() {
            self.apply(&sequenced);
        }
        if self.last_snapshot.elapsed() >= self.interval {
            self.publish_snapshot();
            self.last_snapshot = Instant::now();
        }
    }

    /// Applies one published incremental to the shadow tables.
    pub fn apply(&mut self, sequenced: &SequencedUpdate) {
        let update = &sequenced.update;
        match update.kind {
            UpdateKind::Add | UpdateKind::Modify => {
                let ticker = update.ticker_id as usize;
                assert!(ticker < ME_MAX_TICKERS, "update for unknown ticker {ticker}");
                self.ticker_orders[ticker].insert(update.order_id, *update);
            }
            UpdateKind::Cancel => {
                let ticker = update.ticker_id as usize;
                assert!(ticker < ME_MAX_TICKERS, "update for unknown ticker {ticker}");
                self.ticker_orders[ticker].remove(&update.order_id);
            }
            UpdateKind::Clear => {
                let ticker = update.ticker_id as usize;
                assert!(ticker < ME_MAX_TICKERS, "update for unknown ticker {ticker}");
                self.ticker_orders[ticker].clear();
            }
            // Trades change no resting state, and the engine never emits
            // snapshot sentinels on the incremental stream.
            UpdateKind::Trade | UpdateKind::SnapshotStart | UpdateKind::SnapshotEnd => {}
            UpdateKind::Invalid => panic!("invalid update on snapshot feed: {update}"),
        }
        self.last_inc_seq = sequenced.seq_number;
    }

    /// Builds one full snapshot cycle: Start, per-instrument Clear and
    /// Adds, End. Sequence numbers restart at 0; the Start/End order-id
    /// field carries the incremental anchor.
    pub fn build_snapshot(&self) -> Vec<SequencedUpdate> {
        let mut cycle = Vec::new();
        let mut next_seq: SeqNum = 0;
        let mut push = |records: &mut Vec<SequencedUpdate>, update: MarketUpdate| {
            records.push(SequencedUpdate { seq_number: next_seq, update });
            next_seq += 1;
        };

        push(&mut cycle, sentinel(UpdateKind::SnapshotStart, self.last_inc_seq));

        for (ticker, orders) in self.ticker_orders.iter().enumerate() {
            push(&mut cycle, clear_record(ticker as TickerId));
            for order in orders.values() {
                let mut add = *order;
                add.kind = UpdateKind::Add;
                push(&mut cycle, add);
            }
        }

        push(&mut cycle, sentinel(UpdateKind::SnapshotEnd, self.last_inc_seq));
        cycle
    }

    fn publish_snapshot(&mut self) {
        let cycle = self.build_snapshot();
        let records = cycle.len();
        for sequenced in cycle {
            let wire =
                crate::wire::WireMarketUpdate::new(sequenced.seq_number, &sequenced.update);
            if let Err(e) = self.socket.send_to(wire.as_bytes(), self.group) {
                warn!(error = %e, seq = sequenced.seq_number, "snapshot send failed");
            }
            debug!(%sequenced, "snapshot record");
        }
        info!(records, anchor = self.last_inc_seq, "snapshot published");
    }

    /// Live shadow orders for one instrument, in order-id order.
    pub fn shadow_orders(&self, ticker_id: TickerId) -> Vec<MarketUpdate> {
        self.ticker_orders[ticker_id as usize].values().copied().collect()
    }

    /// The last incremental sequence number applied.
    pub fn anchor(&self) -> SeqNum {
        self.last_inc_seq
    }
}

fn sentinel(kind: UpdateKind, anchor: SeqNum) -> MarketUpdate {
    MarketUpdate {
        kind,
        // The order-id field carries the incremental anchor.
        order_id: anchor,
        ticker_id: TICKER_ID_INVALID,
        side: Side::Invalid,
        price: PRICE_INVALID,
        qty: QTY_INVALID,
        priority: PRIORITY_INVALID,
    }
}

fn clear_record(ticker_id: TickerId) -> MarketUpdate {
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
