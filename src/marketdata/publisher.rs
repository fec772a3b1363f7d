//! Incremental market-data publisher.
//!
//! Drains the engine's market-update queue, stamps each record with the
//! next incremental sequence number, and multicasts it as a single
//! fixed-size datagram. Every published record is also teed into the
//! snapshot synthesizer's feed queue so the shadow book tracks exactly
//! what the market saw, sequence numbers included.

use crate::error::ExchangeError;
use crate::fabric::{Consumer, Producer};
use crate::messages::{MarketUpdate, SequencedUpdate};
use crate::net;
use crate::types::SeqNum;
use crate::utils::Worker;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{trace, warn};
use zerocopy::IntoBytes;

/// Publisher thread state. Owns the incremental multicast socket.
pub struct MarketDataPublisher {
    updates: Consumer<MarketUpdate>,
    snapshot_feed: Producer<SequencedUpdate>,
    socket: UdpSocket,
    group: SocketAddr,
    /// Incremental stream position; the first published record carries 1.
    next_seq: SeqNum,
    running: Arc<AtomicBool>,
}

impl MarketDataPublisher {
    /// Creates the multicast sender for `group` and wires the queues.
    pub fn new(
        group: SocketAddr,
        updates: Consumer<MarketUpdate>,
        snapshot_feed: Producer<SequencedUpdate>,
    ) -> Result<Self, ExchangeError> {
        let socket = net::multicast_sender(group)?;
        Ok(MarketDataPublisher {
            updates,
            snapshot_feed,
            socket,
            group,
            next_seq: 1,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Moves the publisher onto its worker thread.
    pub fn start(self) -> Worker {
        let running = Arc::clone(&self.running);
        let mut publisher = self;
        Worker::spawn("md-publisher", running, move || {
            while publisher.running.load(Ordering::Acquire) {
                publisher.poll();
            }
        })
    }

    /// Drains and publishes everything currently queued.
    pub fn poll(&mut self) {
        while let Some(update) = self.updates.pop() {
            self.publish(&update);
        }
    }

    fn publish(&mut self, update: &MarketUpdate) {
        let sequenced = SequencedUpdate { seq_number: self.next_seq, update: *update };
        self.next_seq += 1;

        let wire = crate::wire::WireMarketUpdate::new(sequenced.seq_number, update);
        trace!(%sequenced, "publishing");
        if let Err(e) = self.socket.send_to(wire.as_bytes(), self.group) {
            // UDP is lossy by contract; consumers recover via snapshots.
            warn!(error = %e, seq = sequenced.seq_number, "incremental send failed");
        }

        self.snapshot_feed.push(sequenced);
    }
}
