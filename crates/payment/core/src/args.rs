//! CLI arguments for payment metering configuration.

use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::config::{ChainTimeouts, MeteringConfig};
use crate::constants::*;

/// Payment metering CLI arguments. Sizes are in bytes, prices in currency
/// units, timeouts in seconds.
#[derive(Debug, Args, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[command(next_help_heading = "Payment Metering")]
#[serde(default)]
pub struct PaymentArgs {
    /// Network-wide on-demand cap in bytes per second
    #[arg(long = "payment.global-rate", default_value_t = DEFAULT_GLOBAL_BYTES_PER_SECOND)]
    pub global_bytes_per_second: u64,

    /// Price in currency units per minimum chargeable size
    #[arg(long = "payment.price", default_value_t = DEFAULT_PRICE_PER_CHARGEABLE)]
    pub price_per_chargeable: u32,

    /// Minimum chargeable size in bytes
    #[arg(long = "payment.min-chargeable", default_value_t = DEFAULT_MIN_CHARGEABLE_SIZE)]
    pub min_chargeable_size: u32,

    /// Reservation bin width in seconds
    #[arg(long = "payment.window", default_value_t = DEFAULT_RESERVATION_WINDOW)]
    pub reservation_window: u32,

    /// Chain read deadline in seconds
    #[arg(long = "payment.chain-read-timeout", default_value_t = DEFAULT_CHAIN_READ_TIMEOUT.as_secs())]
    pub chain_read_timeout: u64,

    /// Chain write deadline in seconds
    #[arg(long = "payment.chain-write-timeout", default_value_t = DEFAULT_CHAIN_WRITE_TIMEOUT.as_secs())]
    pub chain_write_timeout: u64,

    /// Chain state query deadline in seconds
    #[arg(long = "payment.chain-state-timeout", default_value_t = DEFAULT_CHAIN_STATE_TIMEOUT.as_secs())]
    pub chain_state_timeout: u64,

    /// Transaction broadcast deadline in seconds
    #[arg(long = "payment.txn-broadcast-timeout", default_value_t = DEFAULT_TXN_BROADCAST_TIMEOUT.as_secs())]
    pub txn_broadcast_timeout: u64,
}

impl Default for PaymentArgs {
    fn default() -> Self {
        Self {
            global_bytes_per_second: DEFAULT_GLOBAL_BYTES_PER_SECOND,
            price_per_chargeable: DEFAULT_PRICE_PER_CHARGEABLE,
            min_chargeable_size: DEFAULT_MIN_CHARGEABLE_SIZE,
            reservation_window: DEFAULT_RESERVATION_WINDOW,
            chain_read_timeout: DEFAULT_CHAIN_READ_TIMEOUT.as_secs(),
            chain_write_timeout: DEFAULT_CHAIN_WRITE_TIMEOUT.as_secs(),
            chain_state_timeout: DEFAULT_CHAIN_STATE_TIMEOUT.as_secs(),
            txn_broadcast_timeout: DEFAULT_TXN_BROADCAST_TIMEOUT.as_secs(),
        }
    }
}

impl PaymentArgs {
    /// Validate argument combinations.
    pub fn validate(&self) -> Result<(), String> {
        self.metering_config().validate()?;
        if self.chain_read_timeout == 0 {
            return Err("chain read timeout must be non-zero".to_string());
        }
        Ok(())
    }

    /// Metering parameters described by these arguments.
    pub fn metering_config(&self) -> MeteringConfig {
        MeteringConfig {
            global_bytes_per_second: self.global_bytes_per_second,
            price_per_chargeable: self.price_per_chargeable,
            min_chargeable_size: self.min_chargeable_size,
            reservation_window: self.reservation_window,
        }
    }

    /// Chain deadlines described by these arguments.
    pub fn chain_timeouts(&self) -> ChainTimeouts {
        ChainTimeouts {
            read: Duration::from_secs(self.chain_read_timeout),
            write: Duration::from_secs(self.chain_write_timeout),
            state: Duration::from_secs(self.chain_state_timeout),
            txn_broadcast: Duration::from_secs(self.txn_broadcast_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct CommandParser {
        #[command(flatten)]
        args: PaymentArgs,
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let args = CommandParser::parse_from(["prism"]).args;
        assert_eq!(args, PaymentArgs::default());
        assert_eq!(args.metering_config(), MeteringConfig::default());
        assert_eq!(args.chain_timeouts(), ChainTimeouts::default());
        args.validate().unwrap();
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = CommandParser::parse_from([
            "prism",
            "--payment.global-rate",
            "2097152",
            "--payment.window",
            "300",
            "--payment.chain-read-timeout",
            "2",
        ])
        .args;

        assert_eq!(args.global_bytes_per_second, 2_097_152);
        assert_eq!(args.reservation_window, 300);
        assert_eq!(args.chain_timeouts().read, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_window_rejected() {
        let args = CommandParser::parse_from(["prism", "--payment.window", "0"]).args;
        assert!(args.validate().is_err());
    }
}
