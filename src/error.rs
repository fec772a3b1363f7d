//! Recoverable error type for setup-time failures.
//!
//! Everything that can fail while wiring the stack together (sockets,
//! configuration, thread spawning) surfaces here and propagates to the
//! binaries with `?`. Hot-path failures are invariant violations and
//! abort instead; see the error-tier notes in the crate docs.

use crate::types::ClientId;
use std::net::IpAddr;
use thiserror::Error;

/// Errors raised while constructing or connecting components.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExchangeError {
    /// Underlying socket or file I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A configured group address is not in the multicast range.
    #[error("{group} is not an IPv4 multicast group")]
    NotMulticast {
        /// The offending address.
        group: IpAddr,
    },

    /// The configuration file could not be parsed.
    #[error("invalid config {path}: {source}")]
    Config {
        /// Path of the file that failed to parse.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A client id outside the configured table sizes.
    #[error("client id {client_id} exceeds the configured maximum of {max}")]
    ClientIdOutOfRange {
        /// The offending client id.
        client_id: ClientId,
        /// The configured bound.
        max: usize,
    },
}
