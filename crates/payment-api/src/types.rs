//! Core data model for payment metering.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Payment metadata attached to a blob-dispersal request.
///
/// The billing path is selected by [`cumulative_payment`](Self::cumulative_payment):
/// zero claims service under the account's reservation, any other value is a
/// claim on the account's on-demand deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHeader {
    /// The account being charged. The meterer assumes this matches the
    /// signer recovered upstream.
    pub account: Address,
    /// Quorums the blob is addressed to.
    pub quorum_numbers: Vec<u8>,
    /// Payload size in bytes.
    pub data_length: u32,
    /// Time-window index declared by the client.
    pub bin_index: u32,
    /// Running total of currency units the account claims to have spent.
    pub cumulative_payment: u64,
}

impl PaymentHeader {
    /// Whether this header claims on-demand (pay-per-byte) billing.
    pub const fn is_on_demand(&self) -> bool {
        self.cumulative_payment != 0
    }
}

/// A pre-funded throughput allocation as recorded on chain.
///
/// Reservations are born on chain and only observed here; the meterer never
/// mutates them. Validity bounds are inclusive seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveReservation {
    /// Bytes the account may record per reservation window.
    pub data_rate: u64,
    /// First second the reservation is valid.
    pub start_timestamp: u64,
    /// Last second the reservation is valid.
    pub end_timestamp: u64,
    /// Quorums the reservation may be used with.
    pub quorum_numbers: Vec<u8>,
}

/// The authoritative upper bound on an account's on-demand spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnDemandDeposit {
    /// Total currency units the account has deposited on chain.
    pub cumulative_payment: u64,
}

/// A stored on-demand payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// The cumulative payment the record was inserted at.
    pub cumulative_payment: u64,
    /// Payload size declared by the request that inserted the record.
    pub data_length: u32,
}

/// The records strictly adjacent to a cumulative payment in an account's
/// history. The record at the queried value itself is never a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaymentNeighbors {
    /// Largest record strictly below the queried payment.
    pub prev: Option<PaymentRecord>,
    /// Smallest record strictly above the queried payment.
    pub next: Option<PaymentRecord>,
}
