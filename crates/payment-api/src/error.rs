//! Metering error kinds.

use alloy_primitives::Address;

/// Result alias for payment operations.
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Why a request was rejected or could not be decided.
///
/// Only the two adapter failures are [`retryable`](Self::retryable); every
/// other kind is terminal for the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// The chain adapter failed or timed out.
    #[error("chain state unavailable: {0}")]
    ChainUnavailable(String),

    /// The usage ledger failed or timed out.
    #[error("usage ledger unavailable: {0}")]
    StoreUnavailable(String),

    /// Reservation billing was requested but no reservation is active.
    #[error("no active reservation for account {0}")]
    NoReservation(Address),

    /// The request names no quorums at all.
    #[error("request names no quorums")]
    MissingQuorums,

    /// A requested quorum is outside the allowed set.
    #[error("quorum {quorum} is not covered by the payment")]
    InvalidQuorum {
        /// The first out-of-set quorum encountered.
        quorum: u8,
    },

    /// The declared bin index is neither current nor previous, or falls
    /// outside the reservation's validity window.
    #[error("bin index {bin_index} is outside the permitted window")]
    InvalidBinIndex {
        /// The bin index the client declared.
        bin_index: u32,
    },

    /// The reservation bin was already at or above its cap before this
    /// request contributed.
    #[error("reservation bin {bin_index} was already filled")]
    BinFilled {
        /// The bin the request was accounted against.
        bin_index: u32,
    },

    /// The request overflows the bin beyond the one-step allowance, or the
    /// forward bin lies past the reservation's end.
    #[error("usage {usage} overflows bin {bin_index} beyond the permitted allowance")]
    BinOverflow {
        /// The bin the request was accounted against.
        bin_index: u32,
        /// Post-increment usage of that bin.
        usage: u64,
    },

    /// The claimed cumulative payment exceeds the on-chain deposit.
    #[error("claimed payment {claimed} exceeds the on-chain deposit {deposit}")]
    InsufficientDeposit {
        /// The cumulative payment the request claimed.
        claimed: u64,
        /// The deposit recorded on chain.
        deposit: u64,
    },

    /// The cumulative payment does not cover the prior history plus this
    /// request's charge.
    #[error("cumulative payment {claimed} is below the required {required}")]
    InsufficientIncrement {
        /// The cumulative payment the request claimed.
        claimed: u64,
        /// The smallest acceptable cumulative payment.
        required: u64,
    },

    /// Admitting this payment would underfund the next-higher record if the
    /// two were delivered out of order.
    #[error("payment {claimed} would underfund the record at {next}")]
    NeighborInvariant {
        /// The cumulative payment the request claimed.
        claimed: u64,
        /// The neighboring record the claim collides with.
        next: u64,
    },

    /// A record at exactly this cumulative payment already exists.
    #[error("a record at cumulative payment {0} already exists")]
    DuplicatePayment(u64),

    /// The network-wide per-second byte cap was hit.
    #[error("global usage {usage} exceeds {limit} bytes per second")]
    GlobalRateLimited {
        /// Post-increment usage of the current one-second bin.
        usage: u64,
        /// The configured network-wide cap.
        limit: u64,
    },

    /// Price arithmetic overflowed 64 bits.
    #[error("price computation overflows for data length {data_length}")]
    PriceOverflow {
        /// The payload size that produced the overflow.
        data_length: u32,
    },

    /// The header's signature is malformed or was made by another account.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

impl PaymentError {
    /// Whether the caller may retry the request unchanged.
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::ChainUnavailable(_) | Self::StoreUnavailable(_))
    }
}
