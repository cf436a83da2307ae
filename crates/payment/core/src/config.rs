//! Metering configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Network metering parameters.
///
/// These should eventually be published on chain and read through contracts;
/// until then they are deployment configuration and must agree across
/// dispersal nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeteringConfig {
    /// Network-wide cap for on-demand traffic, in bytes per second.
    pub global_bytes_per_second: u64,
    /// Price in currency units per `min_chargeable_size` bytes.
    pub price_per_chargeable: u32,
    /// Floor applied to every data length before pricing and accounting.
    pub min_chargeable_size: u32,
    /// Seconds per reservation accounting bin.
    pub reservation_window: u32,
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            global_bytes_per_second: DEFAULT_GLOBAL_BYTES_PER_SECOND,
            price_per_chargeable: DEFAULT_PRICE_PER_CHARGEABLE,
            min_chargeable_size: DEFAULT_MIN_CHARGEABLE_SIZE,
            reservation_window: DEFAULT_RESERVATION_WINDOW,
        }
    }
}

impl MeteringConfig {
    /// Reject configurations that would divide or window by zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_chargeable_size == 0 {
            return Err("min chargeable size must be non-zero".to_string());
        }
        if self.reservation_window == 0 {
            return Err("reservation window must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Deadlines applied to chain-adapter calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTimeouts {
    /// Deadline for reads on the metering hot path.
    pub read: Duration,
    /// Deadline for writes.
    pub write: Duration,
    /// Deadline for state queries.
    pub state: Duration,
    /// Deadline for transaction broadcasts.
    pub txn_broadcast: Duration,
}

impl Default for ChainTimeouts {
    fn default() -> Self {
        Self {
            read: DEFAULT_CHAIN_READ_TIMEOUT,
            write: DEFAULT_CHAIN_WRITE_TIMEOUT,
            state: DEFAULT_CHAIN_STATE_TIMEOUT,
            txn_broadcast: DEFAULT_TXN_BROADCAST_TIMEOUT,
        }
    }
}
