//! # Low-Latency Exchange and Trading Client Stack
//!
//! An end-to-end electronic trading stack in Rust: an **exchange** binary
//! that accepts client orders over TCP, matches them in a price-time
//! priority central limit order book, and multicasts market data; and a
//! **trading client** binary that consumes the feed, maintains a replica
//! book, recovers from packet loss via periodic snapshots, and sends
//! orders back through the exchange.
//!
//! ## Key Features
//!
//! - **Lock-free pipeline**: every thread boundary is a bounded
//!   single-producer/single-consumer ring queue with release/acquire
//!   cursor publication and no locks anywhere on the hot path.
//! - **Arena-backed books**: orders and price levels live in pre-sized
//!   object pools; intrusive cyclic doubly linked lists are expressed as
//!   stable pool handles, so the matching path never allocates.
//! - **Price-time priority matching**: strict FIFO within a level,
//!   fills at the passive price, anonymous trade prints.
//! - **Lossy-feed recovery**: the incremental stream is sequenced and
//!   gap-checked; a consumer that detects loss subscribes to the
//!   snapshot group, stitches a complete snapshot cycle with the
//!   consecutive incremental tail, and returns to the live stream.
//! - **Receive-time fairness**: the order gateway stages each poll
//!   cycle's requests and hands them to the engine sorted by receive
//!   timestamp, not socket iteration order.
//!
//! ## Architecture
//!
//! Exchange side:
//!
//! ```text
//! TCP clients → OrderServer → FifoSequencer → request queue
//!     → MatchingEngine → OrderBook (per instrument)
//!         → response queue → OrderServer → TCP clients
//!         → market-update queue → MarketDataPublisher → incremental UDP
//!             → feed queue → SnapshotSynthesizer → snapshot UDP
//! ```
//!
//! Client side:
//!
//! ```text
//! incremental/snapshot UDP → MarketDataConsumer → update queue
//!     → TradeEngine → MarketBook (per instrument) → Strategy
//!         → request queue → OrderGateway → TCP exchange
//! ```
//!
//! Each component owns its sockets and state and runs a busy-wait worker
//! loop; queues are the only shared structures.
//!
//! ## Error tiers
//!
//! 1. **Wire/client errors** are observable and recoverable: unknown
//!    orders are cancel-rejected, out-of-sequence or misrouted requests
//!    are logged and dropped, incremental gaps trigger recovery.
//! 2. **Recovery failures** are retried: an incomplete or gapped
//!    snapshot is discarded and the next cycle is awaited.
//! 3. **Invariant violations** are fatal: pool exhaustion, queue
//!    overflow, corrupt book links, and unknown message kinds abort with
//!    a diagnostic, because they are programming errors.
//!
//! ## Status
//!
//! This project is a reference implementation for studying exchange
//! internals; it is not hardened for production use.

pub mod config;
pub mod engine;
pub mod error;
pub mod fabric;
pub mod gateway;
pub mod marketdata;
pub mod messages;
pub mod net;
pub mod orderbook;
pub mod prelude;
pub mod trading;
pub mod types;
pub mod utils;
pub mod wire;

pub use config::Config;
pub use engine::MatchingEngine;
pub use error::ExchangeError;
pub use fabric::{Consumer, Handle, ObjectPool, Producer, spsc_channel};
pub use gateway::{FifoSequencer, OrderServer};
pub use marketdata::{MarketDataPublisher, SnapshotSynthesizer};
pub use messages::{
    ClientRequest, ClientResponse, MarketUpdate, RequestKind, ResponseKind, SequencedUpdate,
    UpdateKind,
};
pub use orderbook::{EventSink, OrderBook};
pub use trading::{
    Bbo, LoggingStrategy, MarketBook, MarketDataConsumer, OrderEntry, OrderGateway, Strategy,
    TradeEngine,
};
pub use types::Side;
pub use utils::current_time_millis;
