//! Client-side order gateway: one TCP session to the exchange.
//!
//! Outbound requests are stamped with the session's monotone sequence
//! number; inbound responses must carry this client's id and the expected
//! response sequence. Violations are logged and dropped without advancing
//! the expectation — on a reliable stream they indicate a peer bug, not
//! loss.

use crate::error::ExchangeError;
use crate::fabric::{Consumer, Producer};
use crate::messages::{ClientRequest, ClientResponse};
use crate::net;
use crate::types::{ClientId, ME_MAX_NUM_CLIENTS, SeqNum};
use crate::utils::Worker;
use crate::wire::{CLIENT_RESPONSE_SIZE, WireClientRequest, WireClientResponse};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use zerocopy::IntoBytes;

const READ_CHUNK: usize = 4096;

/// Order gateway thread state for one trading client.
pub struct OrderGateway {
    client_id: ClientId,
    stream: TcpStream,
    rx: Vec<u8>,
    tx: Vec<u8>,

    requests: Consumer<ClientRequest>,
    responses: Producer<ClientResponse>,

    next_outgoing_seq: SeqNum,
    next_expected_seq: SeqNum,
    running: Arc<AtomicBool>,
}

impl OrderGateway {
    /// Connects to the exchange gateway at `addr`.
    pub fn new(
        client_id: ClientId,
        addr: SocketAddr,
        requests: Consumer<ClientRequest>,
        responses: Producer<ClientResponse>,
    ) -> Result<Self, ExchangeError> {
        if (client_id as usize) >= ME_MAX_NUM_CLIENTS {
            return Err(ExchangeError::ClientIdOutOfRange {
                client_id,
                max: ME_MAX_NUM_CLIENTS,
            });
        }
        let stream = net::tcp_connect(addr)?;
        info!(client_id, %addr, "order gateway connected");
        Ok(OrderGateway {
            client_id,
            stream,
            rx: Vec::with_capacity(READ_CHUNK),
            tx: Vec::new(),
            requests,
            responses,
            next_outgoing_seq: 1,
            next_expected_seq: 1,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Moves the gateway onto its worker thread.
    pub fn start(self) -> Worker {
        let running = Arc::clone(&self.running);
        let mut gateway = self;
        Worker::spawn("order-gateway", running, move || {
            while gateway.running.load(Ordering::Acquire) {
                gateway.poll();
            }
        })
    }

    /// One cycle: push queued requests out, pull responses in.
    pub fn poll(&mut self) {
        self.send_requests();
        self.read_responses();
    }

    fn send_requests(&mut self) {
        while let Some(request) = self.requests.pop() {
            let seq = self.next_outgoing_seq;
            self.next_outgoing_seq += 1;
            let wire = WireClientRequest::new(seq, &request);
            self.tx.extend_from_slice(wire.as_bytes());
            debug!(seq, %request, "sending request");
        }

        if self.tx.is_empty() {
            return;
        }
        let mut written = 0;
        loop {
            match self.stream.write(&self.tx[written..]) {
                Ok(0) => break,
                Ok(n) => {
                    written += n;
                    if written == self.tx.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "gateway write failed");
                    break;
                }
            }
        }
        self.tx.drain(..written);
    }

    fn read_responses(&mut self) {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    warn!("exchange closed the order session");
                    break;
                }
                Ok(n) => self.rx.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "gateway read failed");
                    break;
                }
            }
        }

        let mut offset = 0;
        while self.rx.len() - offset >= CLIENT_RESPONSE_SIZE {
            let frame = &self.rx[offset..offset + CLIENT_RESPONSE_SIZE];
            offset += CLIENT_RESPONSE_SIZE;
            let wire = WireClientResponse::decode(frame).expect("exact-size frame");
            let response = wire.response();

            if response.client_id != self.client_id {
                warn!(
                    expected = self.client_id,
                    got = response.client_id,
                    "response for another client, dropping"
                );
                continue;
            }
            if wire.seq_number() != self.next_expected_seq {
                warn!(
                    expected = self.next_expected_seq,
                    got = wire.seq_number(),
                    "bad response sequence, dropping"
                );
                continue;
            }
            self.next_expected_seq += 1;

            debug!(%response, "received response");
            self.responses.push(response);
        }
        self.rx.drain(..offset);
    }
}
