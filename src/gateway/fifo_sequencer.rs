//! Receive-time arbitration of validated client requests.
//!
//! The gateway polls all ready sockets in one cycle before handing
//! anything to the engine; servicing clients in socket-iteration order
//! would favor whoever happens to sit early in the poll list. Instead,
//! every validated request is staged with its receive timestamp and the
//! whole batch is sorted by that timestamp before publication. The sort
//! is stable, so same-timestamp requests keep arrival order.

use crate::fabric::Producer;
use crate::messages::ClientRequest;
use crate::types::{ME_MAX_PENDING_REQUESTS, Nanos};
use tracing::trace;

struct TimedRequest {
    recv_time: Nanos,
    request: ClientRequest,
}

/// Stages one poll cycle's requests and publishes them in receive-time
/// order to the matching engine's request queue.
pub struct FifoSequencer {
    pending: Vec<TimedRequest>,
    requests: Producer<ClientRequest>,
}

impl FifoSequencer {
    pub fn new(requests: Producer<ClientRequest>) -> Self {
        FifoSequencer {
            pending: Vec::with_capacity(ME_MAX_PENDING_REQUESTS),
            requests,
        }
    }

    /// Stages a validated request. Overflowing the staging buffer is a
    /// sizing invariant and aborts.
    pub fn stage(&mut self, recv_time: Nanos, request: ClientRequest) {
        assert!(
            self.pending.len() < ME_MAX_PENDING_REQUESTS,
            "fifo sequencer overflow: more than {ME_MAX_PENDING_REQUESTS} pending requests"
        );
        self.pending.push(TimedRequest { recv_time, request });
    }

    /// Number of staged requests in the current cycle.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Sorts the staged batch by receive time and pushes it onto the
    /// request queue. Called once per poll cycle, after every ready
    /// socket has been drained.
    pub fn sequence_and_publish(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        self.pending.sort_by_key(|timed| timed.recv_time);

        for timed in self.pending.drain(..) {
            trace!(rx = timed.recv_time, request = %timed.request, "sequenced");
            self.requests.push(timed.request);
        }
    }
}
