//! Non-blocking TCP order server.
//!
//! One poll cycle accepts new connections, drains every readable socket,
//! lets the FIFO sequencer publish the validated batch, and flushes
//! outbound responses. A client id is bound to the first socket that
//! presents it; requests for that id arriving on any other socket are
//! dropped and logged, as are requests whose per-client sequence number
//! does not match the expected one — the expectation is never advanced on
//! a mismatch, so a client bug surfaces instead of being reordered away.

use super::fifo_sequencer::FifoSequencer;
use crate::error::ExchangeError;
use crate::fabric::{Consumer, Producer};
use crate::messages::{ClientRequest, ClientResponse, RequestKind};
use crate::net;
use crate::types::{ME_MAX_NUM_CLIENTS, ME_MAX_ORDER_IDS, ME_MAX_TICKERS, SeqNum, Side};
use crate::utils::{Worker, nanos_since};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 4096;

struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    rx: Vec<u8>,
    tx: Vec<u8>,
    dead: bool,
}

/// The exchange's order gateway thread state.
pub struct OrderServer {
    listener: TcpListener,
    sessions: Vec<Option<Session>>,

    /// Client id → session slot it is bound to.
    client_sessions: Box<[Option<usize>]>,
    /// Next inbound sequence number expected from each client. Starts
    /// at 1 and only advances on accepted requests.
    next_expected_seq: Box<[SeqNum]>,
    /// Next outbound sequence number for each client's responses.
    next_outgoing_seq: Box<[SeqNum]>,

    sequencer: FifoSequencer,
    responses: Consumer<ClientResponse>,

    /// Monotonic anchor for receive timestamps.
    epoch: Instant,
    running: Arc<AtomicBool>,
}

impl OrderServer {
    /// Binds the listening socket and wires the two engine-facing queues.
    pub fn new(
        addr: SocketAddr,
        requests: Producer<ClientRequest>,
        responses: Consumer<ClientResponse>,
    ) -> Result<Self, ExchangeError> {
        let listener = net::tcp_listener(addr)?;
        info!(%addr, "order server listening");
        Ok(OrderServer {
            listener,
            sessions: Vec::new(),
            client_sessions: vec![None; ME_MAX_NUM_CLIENTS].into_boxed_slice(),
            next_expected_seq: vec![1; ME_MAX_NUM_CLIENTS].into_boxed_slice(),
            next_outgoing_seq: vec![1; ME_MAX_NUM_CLIENTS].into_boxed_slice(),
            sequencer: FifoSequencer::new(requests),
            responses,
            epoch: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The bound address, useful when listening on an ephemeral port.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr().expect("listener has a local address")
    }

    /// Moves the server onto its worker thread.
    pub fn start(self) -> Worker {
        let running = Arc::clone(&self.running);
        let mut server = self;
        Worker::spawn("order-server", running, move || {
            while server.running.load(Ordering::Acquire) {
                server.poll();
            }
        })
    }

    /// One gateway cycle: accept, read and validate, sequence, respond.
    pub fn poll(&mut self) {
        self.accept_sessions();
        self.read_sessions();
        self.sequencer.sequence_and_publish();
        self.send_responses();
        self.flush_sessions();
        self.reap_dead_sessions();
    }

    fn accept_sessions(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if stream.set_nonblocking(true).and_then(|_| stream.set_nodelay(true)).is_err()
                    {
                        warn!(%peer, "failed to configure accepted socket, dropping");
                        continue;
                    }
                    info!(%peer, "client connected");
                    let session = Session {
                        stream,
                        peer,
                        rx: Vec::with_capacity(READ_CHUNK),
                        tx: Vec::new(),
                        dead: false,
                    };
                    if let Some(slot) = self.sessions.iter().position(Option::is_none) {
                        self.sessions[slot] = Some(session);
                    } else {
                        self.sessions.push(Some(session));
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    fn read_sessions(&mut self) {
        let mut chunk = [0u8; READ_CHUNK];
        for slot in 0..self.sessions.len() {
            let Some(session) = self.sessions[slot].as_mut() else { continue };
            if session.dead {
                continue;
            }

            let mut received = false;
            loop {
                match session.stream.read(&mut chunk) {
                    Ok(0) => {
                        debug!(peer = %session.peer, "client disconnected");
                        session.dead = true;
                        break;
                    }
                    Ok(n) => {
                        session.rx.extend_from_slice(&chunk[..n]);
                        received = true;
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(peer = %session.peer, error = %e, "read failed");
                        session.dead = true;
                        break;
                    }
                }
            }

            if received {
                let rx_time = nanos_since(self.epoch);
                self.parse_session(slot, rx_time);
            }
        }
    }

    /// Frames and validates every complete request buffered on one
    /// session, staging survivors with their receive time.
    fn parse_session(&mut self, slot: usize, rx_time: u64) {
        use crate::wire::{CLIENT_REQUEST_SIZE, WireClientRequest};

        let mut staged = Vec::new();
        {
            let session = self.sessions[slot].as_mut().expect("session exists");
            let mut offset = 0;
            while session.rx.len() - offset >= CLIENT_REQUEST_SIZE {
                let frame = &session.rx[offset..offset + CLIENT_REQUEST_SIZE];
                let wire = WireClientRequest::decode(frame).expect("exact-size frame");
                staged.push((wire.seq_number(), wire.request()));
                offset += CLIENT_REQUEST_SIZE;
            }
            session.rx.drain(..offset);
        }

        for (seq_number, request) in staged {
            self.validate_and_stage(slot, seq_number, request, rx_time);
        }
    }

    fn validate_and_stage(
        &mut self,
        slot: usize,
        seq_number: SeqNum,
        request: ClientRequest,
        rx_time: u64,
    ) {
        let client_id = request.client_id;
        let malformed = request.kind == RequestKind::Invalid
            || (client_id as usize) >= ME_MAX_NUM_CLIENTS
            || (request.client_order_id as usize) >= ME_MAX_ORDER_IDS
            || (request.ticker_id as usize) >= ME_MAX_TICKERS
            || (request.kind == RequestKind::New && request.side == Side::Invalid);
        if malformed {
            warn!(%request, "malformed request, dropping");
            return;
        }
        let client = client_id as usize;

        // Bind the client id to its first socket; reject it elsewhere.
        match self.client_sessions[client] {
            None => self.client_sessions[client] = Some(slot),
            Some(bound) if bound != slot => {
                warn!(
                    client_id,
                    bound_slot = bound,
                    got_slot = slot,
                    "request from client on a different socket, dropping"
                );
                return;
            }
            Some(_) => {}
        }

        // Wrong sequence numbers are dropped without advancing the
        // expectation: the client's bug stays visible.
        let expected = self.next_expected_seq[client];
        if seq_number != expected {
            warn!(client_id, expected, got = seq_number, "bad request sequence, dropping");
            return;
        }
        self.next_expected_seq[client] = expected + 1;

        self.sequencer.stage(rx_time, request);
    }

    fn send_responses(&mut self) {
        use crate::wire::WireClientResponse;
        use zerocopy::IntoBytes;

        while let Some(response) = self.responses.pop() {
            let client = response.client_id as usize;
            assert!(client < ME_MAX_NUM_CLIENTS, "response for unknown client {client}");

            let Some(slot) = self.client_sessions[client] else {
                warn!(client_id = response.client_id, %response, "no socket for response, dropping");
                continue;
            };
            let Some(session) = self.sessions[slot].as_mut() else {
                warn!(client_id = response.client_id, "session gone, dropping response");
                continue;
            };

            let seq = self.next_outgoing_seq[client];
            self.next_outgoing_seq[client] = seq + 1;
            let wire = WireClientResponse::new(seq, &response);
            session.tx.extend_from_slice(wire.as_bytes());
            debug!(client_id = response.client_id, seq, %response, "queued response");
        }
    }

    fn flush_sessions(&mut self) {
        for session in self.sessions.iter_mut().flatten() {
            if session.dead || session.tx.is_empty() {
                continue;
            }
            let mut written = 0;
            loop {
                match session.stream.write(&session.tx[written..]) {
                    Ok(0) => {
                        session.dead = true;
                        break;
                    }
                    Ok(n) => {
                        written += n;
                        if written == session.tx.len() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(peer = %session.peer, error = %e, "write failed");
                        session.dead = true;
                        break;
                    }
                }
            }
            session.tx.drain(..written);
        }
    }

    fn reap_dead_sessions(&mut self) {
        for slot in 0..self.sessions.len() {
            let is_dead = matches!(&self.sessions[slot], Some(s) if s.dead);
            if !is_dead {
                continue;
            }
            // Unbind any client attached to this socket so a reconnect can
            // bind fresh; sequence expectations survive the reconnect.
            for binding in self.client_sessions.iter_mut() {
                if *binding == Some(slot) {
                    *binding = None;
                }
            }
            self.sessions[slot] = None;
        }
    }
}
