//! Runtime configuration for both binaries.
//!
//! Defaults mirror the reference deployment: the order gateway on
//! loopback TCP port 12345, snapshots on 233.252.14.1:20000, and
//! incrementals on 233.252.14.3:20001, with a 60 second snapshot cadence.
//! A JSON file can override any subset of fields.

use crate::error::ExchangeError;
use crate::types::{ME_MAX_CLIENT_UPDATES, ME_MAX_MARKET_UPDATES};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Transport endpoints and sizing for one exchange/client deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP endpoint of the exchange order gateway.
    pub gateway_addr: SocketAddr,
    /// Multicast group carrying periodic snapshots.
    pub snapshot_group: SocketAddr,
    /// Multicast group carrying the incremental stream.
    pub incremental_group: SocketAddr,
    /// Seconds between snapshot cycles.
    pub snapshot_interval_secs: u64,
    /// Capacity of the request/response queues.
    pub client_queue_capacity: usize,
    /// Capacity of the market-update queues.
    pub market_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gateway_addr: SocketAddr::from(([127, 0, 0, 1], 12345)),
            snapshot_group: SocketAddr::from(([233, 252, 14, 1], 20000)),
            incremental_group: SocketAddr::from(([233, 252, 14, 3], 20001)),
            snapshot_interval_secs: 60,
            client_queue_capacity: ME_MAX_CLIENT_UPDATES,
            market_queue_capacity: ME_MAX_MARKET_UPDATES,
        }
    }
}

impl Config {
    /// Loads a JSON config file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ExchangeError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| ExchangeError::Config {
            path: path.display().to_string(),
            source,
        })
    }

    /// The snapshot cadence as a [`Duration`].
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }
}
