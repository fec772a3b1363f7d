//! Packed little-endian wire formats.
//!
//! Every record is fixed-size with no padding, so both gateways can frame
//! a TCP byte stream by size alone and the market-data consumer can assume
//! exactly one record per UDP datagram. The structs derive the `zerocopy`
//! traits so encoding is a byte-slice view and decoding is a checked copy,
//! with no per-field parsing.
//!
//! Layouts (offsets in bytes):
//!
//! ```text
//! request  (38): 0 seq u64 | 8 kind u8 | 9 client u32 | 13 ticker u32
//!                | 17 client_order_id u64 | 25 side i8 | 26 price i64
//!                | 34 qty u32
//! response (54): 0 seq u64 | 8 kind u8 | 9 client u32 | 13 ticker u32
//!                | 17 client_order_id u64 | 25 market_order_id u64
//!                | 33 side i8 | 34 price i64 | 42 qty u32 | 46 exec u32
//!                | 50 leaves u32
//! update   (42): 0 seq u64 | 8 kind u8 | 9 market_order_id u64
//!                | 17 ticker u32 | 21 side i8 | 22 price i64 | 30 qty u32
//!                | 34 priority u64
//! ```

use crate::messages::{
    ClientRequest, ClientResponse, MarketUpdate, RequestKind, ResponseKind, SequencedUpdate,
    UpdateKind,
};
use crate::types::{SeqNum, Side};
use zerocopy::byteorder::little_endian::{I64, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// On-wire size of a [`WireClientRequest`].
pub const CLIENT_REQUEST_SIZE: usize = size_of::<WireClientRequest>();
/// On-wire size of a [`WireClientResponse`].
pub const CLIENT_RESPONSE_SIZE: usize = size_of::<WireClientResponse>();
/// On-wire size of a [`WireMarketUpdate`].
pub const MARKET_UPDATE_SIZE: usize = size_of::<WireMarketUpdate>();

/// A sequenced client request as sent on the order-gateway TCP stream.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct WireClientRequest {
    pub seq_number: U64,
    pub kind: u8,
    pub client_id: U32,
    pub ticker_id: U32,
    pub client_order_id: U64,
    pub side: i8,
    pub price: I64,
    pub qty: U32,
}

impl WireClientRequest {
    pub fn new(seq_number: SeqNum, request: &ClientRequest) -> Self {
        WireClientRequest {
            seq_number: U64::new(seq_number),
            kind: request.kind as u8,
            client_id: U32::new(request.client_id),
            ticker_id: U32::new(request.ticker_id),
            client_order_id: U64::new(request.client_order_id),
            side: request.side.to_wire(),
            price: I64::new(request.price),
            qty: U32::new(request.qty),
        }
    }

    /// Decodes exactly one record from `bytes`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        WireClientRequest::read_from_bytes(bytes).ok()
    }

    /// The engine-form request carried by this record.
    pub fn request(&self) -> ClientRequest {
        ClientRequest {
            kind: RequestKind::from_wire(self.kind),
            client_id: self.client_id.get(),
            ticker_id: self.ticker_id.get(),
            client_order_id: self.client_order_id.get(),
            side: Side::from_wire(self.side),
            price: self.price.get(),
            qty: self.qty.get(),
        }
    }

    #[inline]
    pub fn seq_number(&self) -> SeqNum {
        self.seq_number.get()
    }
}

/// A sequenced client response as sent back on the client's TCP socket.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct WireClientResponse {
    pub seq_number: U64,
    pub kind: u8,
    pub client_id: U32,
    pub ticker_id: U32,
    pub client_order_id: U64,
    pub market_order_id: U64,
    pub side: i8,
    pub price: I64,
    pub qty: U32,
    pub exec_qty: U32,
    pub leaves_qty: U32,
}

impl WireClientResponse {
    pub fn new(seq_number: SeqNum, response: &ClientResponse) -> Self {
        WireClientResponse {
            seq_number: U64::new(seq_number),
            kind: response.kind as u8,
            client_id: U32::new(response.client_id),
            ticker_id: U32::new(response.ticker_id),
            client_order_id: U64::new(response.client_order_id),
            market_order_id: U64::new(response.market_order_id),
            side: response.side.to_wire(),
            price: I64::new(response.price),
            qty: U32::new(response.qty),
            exec_qty: U32::new(response.exec_qty),
            leaves_qty: U32::new(response.leaves_qty),
        }
    }

    /// Decodes exactly one record from `bytes`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        WireClientResponse::read_from_bytes(bytes).ok()
    }

    /// The engine-form response carried by this record.
    pub fn response(&self) -> ClientResponse {
        ClientResponse {
            kind: ResponseKind::from_wire(self.kind),
            client_id: self.client_id.get(),
            ticker_id: self.ticker_id.get(),
            client_order_id: self.client_order_id.get(),
            market_order_id: self.market_order_id.get(),
            side: Side::from_wire(self.side),
            price: self.price.get(),
            qty: self.qty.get(),
            exec_qty: self.exec_qty.get(),
            leaves_qty: self.leaves_qty.get(),
        }
    }

    #[inline]
    pub fn seq_number(&self) -> SeqNum {
        self.seq_number.get()
    }
}

/// A sequenced market update, one per UDP datagram on both multicast
/// groups.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct WireMarketUpdate {
    pub seq_number: U64,
    pub kind: u8,
    pub market_order_id: U64,
    pub ticker_id: U32,
    pub side: i8,
    pub price: I64,
    pub qty: U32,
    pub priority: U64,
}

impl WireMarketUpdate {
    pub fn new(seq_number: SeqNum, update: &MarketUpdate) -> Self {
        WireMarketUpdate {
            seq_number: U64::new(seq_number),
            kind: update.kind as u8,
            market_order_id: U64::new(update.order_id),
            ticker_id: U32::new(update.ticker_id),
            side: update.side.to_wire(),
            price: I64::new(update.price),
            qty: U32::new(update.qty),
            priority: U64::new(update.priority),
        }
    }

    /// Decodes exactly one record from `bytes`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        WireMarketUpdate::read_from_bytes(bytes).ok()
    }

    /// The sequenced engine-form update carried by this datagram.
    pub fn sequenced(&self) -> SequencedUpdate {
        SequencedUpdate {
            seq_number: self.seq_number.get(),
            update: MarketUpdate {
                kind: UpdateKind::from_wire(self.kind),
                order_id: self.market_order_id.get(),
                ticker_id: self.ticker_id.get(),
                side: Side::from_wire(self.side),
                price: self.price.get(),
                qty: self.qty.get(),
                priority: self.priority.get(),
            },
        }
    }
}
