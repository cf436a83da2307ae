//! Default metering parameters.

use std::time::Duration;

/// Quorums every on-demand request must stay within. Reservations carry
/// their own allowed set on chain.
pub const ON_DEMAND_QUORUMS: &[u8] = &[0, 1];

/// Default network-wide cap for on-demand traffic, in bytes per second.
pub(crate) const DEFAULT_GLOBAL_BYTES_PER_SECOND: u64 = 1_048_576;

/// Default price in currency units per minimum chargeable size.
pub(crate) const DEFAULT_PRICE_PER_CHARGEABLE: u32 = 100;

/// Default floor applied to every data length before pricing.
pub(crate) const DEFAULT_MIN_CHARGEABLE_SIZE: u32 = 1024;

/// Default reservation bin width in seconds.
pub(crate) const DEFAULT_RESERVATION_WINDOW: u32 = 60;

/// Default deadline for chain reads on the metering hot path.
pub(crate) const DEFAULT_CHAIN_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for chain writes.
pub(crate) const DEFAULT_CHAIN_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for chain state queries.
pub(crate) const DEFAULT_CHAIN_STATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for transaction broadcasts.
pub(crate) const DEFAULT_TXN_BROADCAST_TIMEOUT: Duration = Duration::from_secs(30);
