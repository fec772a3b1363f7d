//! Market-data consumer with snapshot-based gap recovery.
//!
//! While **Live**, incrementals flow straight to the strategy's update
//! queue and snapshot datagrams are ignored. The first incremental whose
//! sequence number is not the expected one flips the consumer to
//! **Recovering**: it joins the snapshot group and stages every received
//! datagram — snapshots and incrementals alike — in ordered maps keyed by
//! sequence number. Each insert re-runs [`try_sync`](MarketDataConsumer::try_sync),
//! which waits for a complete, gap-free snapshot cycle and a consecutive
//! run of incrementals from the snapshot's anchor, then replays snapshot
//! state plus the stitched tail and drops back to Live.
//!
//! Loss during a snapshot just means waiting for the next cycle; the
//! synthesizer re-publishes on a fixed cadence, which bounds recovery
//! latency.

use crate::error::ExchangeError;
use crate::fabric::Producer;
use crate::messages::{MarketUpdate, SequencedUpdate, UpdateKind};
use crate::net;
use crate::types::SeqNum;
use crate::utils::Worker;
use crate::wire::{MARKET_UPDATE_SIZE, WireMarketUpdate};
use std::collections::BTreeMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Client-side market-data consumer thread state.
pub struct MarketDataConsumer {
    updates: Producer<MarketUpdate>,

    incremental_socket: Option<UdpSocket>,
    snapshot_socket: Option<UdpSocket>,
    snapshot_group: SocketAddr,

    /// Next incremental sequence number the Live path will accept.
    next_expected_inc_seq: SeqNum,
    in_recovery: bool,

    /// Staged snapshot datagrams, keyed by per-cycle sequence number.
    snapshot_staging: BTreeMap<SeqNum, MarketUpdate>,
    /// Staged incremental datagrams, keyed by stream sequence number.
    inc_staging: BTreeMap<SeqNum, MarketUpdate>,

    running: Arc<AtomicBool>,
}

impl MarketDataConsumer {
    /// Joins the incremental group and remembers the snapshot group for
    /// recovery subscriptions.
    pub fn new(
        incremental_group: SocketAddr,
        snapshot_group: SocketAddr,
        updates: Producer<MarketUpdate>,
    ) -> Result<Self, ExchangeError> {
        let incremental_socket = net::multicast_receiver(incremental_group)?;
        net::multicast_group(snapshot_group)?;
        info!(%incremental_group, %snapshot_group, "market data consumer joined incremental feed");
        Ok(MarketDataConsumer {
            updates,
            incremental_socket: Some(incremental_socket),
            snapshot_socket: None,
            snapshot_group,
            next_expected_inc_seq: 1,
            in_recovery: false,
            snapshot_staging: BTreeMap::new(),
            inc_staging: BTreeMap::new(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A consumer with no sockets, for driving the recovery state machine
    /// directly from captured or synthesized datagrams.
    pub fn detached(updates: Producer<MarketUpdate>) -> Self {
        MarketDataConsumer {
            updates,
            incremental_socket: None,
            snapshot_socket: None,
            snapshot_group: SocketAddr::from(([233, 252, 14, 1], 20000)),
            next_expected_inc_seq: 1,
            in_recovery: false,
            snapshot_staging: BTreeMap::new(),
            inc_staging: BTreeMap::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Moves the consumer onto its worker thread.
    pub fn start(self) -> Worker {
        let running = Arc::clone(&self.running);
        let mut consumer = self;
        Worker::spawn("md-consumer", running, move || {
            while consumer.running.load(Ordering::Acquire) {
                consumer.poll();
            }
        })
    }

    /// True while the consumer is stitching a snapshot.
    pub fn in_recovery(&self) -> bool {
        self.in_recovery
    }

    /// The next incremental sequence number the Live path will accept.
    pub fn next_expected_inc_seq(&self) -> SeqNum {
        self.next_expected_inc_seq
    }

    /// One busy-wait cycle: drain both sockets.
    pub fn poll(&mut self) {
        // A failed join is retried here rather than aborting the worker.
        if self.in_recovery && self.snapshot_socket.is_none() {
            self.subscribe_snapshots();
        }

        for sequenced in drain_socket(self.incremental_socket.as_ref()) {
            self.on_incremental(&sequenced);
        }
        for sequenced in drain_socket(self.snapshot_socket.as_ref()) {
            self.on_snapshot(&sequenced);
        }
    }

    /// Handles one incremental datagram.
    pub fn on_incremental(&mut self, sequenced: &SequencedUpdate) {
        if self.in_recovery {
            self.inc_staging.insert(sequenced.seq_number, sequenced.update);
            self.try_sync();
            return;
        }

        if sequenced.seq_number == self.next_expected_inc_seq {
            self.next_expected_inc_seq += 1;
            debug!(%sequenced, "live update");
            self.updates.push(sequenced.update);
        } else {
            warn!(
                expected = self.next_expected_inc_seq,
                got = sequenced.seq_number,
                "incremental gap, entering recovery"
            );
            self.enter_recovery();
            self.inc_staging.insert(sequenced.seq_number, sequenced.update);
            self.try_sync();
        }
    }

    /// Handles one snapshot datagram. Ignored while Live; the snapshot
    /// socket only exists during recovery anyway.
    pub fn on_snapshot(&mut self, sequenced: &SequencedUpdate) {
        if !self.in_recovery {
            return;
        }
        // A duplicate snapshot sequence number means the cycle restarted
        // under us; everything staged belongs to the dead cycle.
        if self.snapshot_staging.contains_key(&sequenced.seq_number) {
            debug!(seq = sequenced.seq_number, "snapshot cycle restarted, discarding stage");
            self.snapshot_staging.clear();
        }
        self.snapshot_staging.insert(sequenced.seq_number, sequenced.update);
        self.try_sync();
    }

    fn enter_recovery(&mut self) {
        self.in_recovery = true;
        self.snapshot_staging.clear();
        self.inc_staging.clear();
        self.subscribe_snapshots();
    }

    fn subscribe_snapshots(&mut self) {
        if self.incremental_socket.is_none() {
            // Detached consumer: state machine only.
            return;
        }
        match net::multicast_receiver(self.snapshot_group) {
            Ok(socket) => {
                info!(group = %self.snapshot_group, "joined snapshot feed");
                self.snapshot_socket = Some(socket);
            }
            Err(e) => warn!(error = %e, "snapshot join failed, will retry"),
        }
    }

    fn leave_snapshots(&mut self) {
        // Dropping the socket leaves the group.
        if self.snapshot_socket.take().is_some() {
            info!(group = %self.snapshot_group, "left snapshot feed");
        }
    }

    /// Attempts to stitch the staged snapshot and incrementals into a
    /// consistent stream. Runs after every staged datagram.
    fn try_sync(&mut self) {
        let Some(first) = self.snapshot_staging.values().next() else {
            return;
        };

        // We must hold a cycle from its very first record.
        if first.kind != UpdateKind::SnapshotStart {
            debug!("joined mid-snapshot, discarding stage");
            self.snapshot_staging.clear();
            return;
        }

        // The cycle's own sequence space counts 0, 1, 2, … with no gaps.
        let mut expected_key: SeqNum = 0;
        let mut gap_at = None;
        for &key in self.snapshot_staging.keys() {
            if key != expected_key {
                gap_at = Some(key);
                break;
            }
            expected_key += 1;
        }
        if let Some(got) = gap_at {
            debug!(expected = expected_key, got, "snapshot gap, discarding stage");
            self.snapshot_staging.clear();
            return;
        }

        let last = self.snapshot_staging.values().next_back().expect("stage is non-empty");
        if last.kind != UpdateKind::SnapshotEnd {
            // Still streaming.
            return;
        }

        // The End sentinel's order-id field carries the anchor: the last
        // incremental sequence number this snapshot reflects.
        let anchor = last.order_id;
        self.next_expected_inc_seq = anchor;

        // Collect the consecutive incremental tail from the anchor. A gap
        // means this snapshot cannot bridge to the live stream; drop it
        // and wait for the next cycle.
        let mut stitched = Vec::new();
        for (&key, update) in &self.inc_staging {
            if key < self.next_expected_inc_seq {
                continue;
            }
            if key == self.next_expected_inc_seq {
                stitched.push(*update);
                self.next_expected_inc_seq += 1;
            } else {
                debug!(
                    expected = self.next_expected_inc_seq,
                    got = key,
                    "incremental gap behind snapshot, discarding stage"
                );
                self.snapshot_staging.clear();
                return;
            }
        }

        // Replay: snapshot body first (the sentinels carry no book
        // state), then the stitched tail.
        let mut replayed = 0usize;
        for update in self.snapshot_staging.values() {
            match update.kind {
                UpdateKind::SnapshotStart | UpdateKind::SnapshotEnd => {}
                _ => {
                    self.updates.push(*update);
                    replayed += 1;
                }
            }
        }
        for update in &stitched {
            self.updates.push(*update);
        }

        info!(
            anchor,
            replayed,
            stitched = stitched.len(),
            next_expected = self.next_expected_inc_seq,
            "recovery complete, back to live"
        );
        self.snapshot_staging.clear();
        self.inc_staging.clear();
        self.in_recovery = false;
        self.leave_snapshots();
    }
}

/// Reads every datagram currently queued on `socket` and decodes it.
fn drain_socket(socket: Option<&UdpSocket>) -> Vec<SequencedUpdate> {
    let mut received = Vec::new();
    let Some(socket) = socket else {
        return received;
    };
    let mut datagram = [0u8; MARKET_UPDATE_SIZE];
    loop {
        match socket.recv(&mut datagram) {
            Ok(n) => match WireMarketUpdate::decode(&datagram[..n]) {
                Some(wire) => received.push(wire.sequenced()),
                None => warn!(len = n, "undecodable market data datagram"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "market data recv failed");
                break;
            }
        }
    }
    received
}
