//! Mutable off-chain usage accounting.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::{PaymentNeighbors, PaymentResult};

/// The off-chain usage ledger metering decisions are recorded against.
///
/// Two guarantees make the ledger the meterer's only serialisation point:
/// every mutation is atomic with respect to other calls on the same key, and
/// [`on_demand_neighbors`](Self::on_demand_neighbors) observes every
/// previously committed insert. No call spans more than one key; there are
/// no cross-key transactions.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait UsageLedger: Send + Sync + 'static {
    /// Atomically add `delta` bytes to the account's bin counter, returning
    /// the post-increment usage.
    async fn increment_reservation_bin(
        &self,
        account: Address,
        bin_index: u32,
        delta: u64,
    ) -> PaymentResult<u64>;

    /// Atomically add `delta` bytes to the network-wide counter for the
    /// given one-second bin, returning the post-increment usage.
    async fn increment_global_bin(&self, bin_index: u64, delta: u64) -> PaymentResult<u64>;

    /// Insert a payment record keyed by `(account, cumulative_payment)`.
    ///
    /// Insertion is conditional on the key being absent; a concurrent or
    /// prior record at the same payment fails with
    /// [`PaymentError::DuplicatePayment`](crate::PaymentError::DuplicatePayment).
    async fn insert_on_demand_payment(
        &self,
        account: Address,
        cumulative_payment: u64,
        data_length: u32,
    ) -> PaymentResult<()>;

    /// The records strictly adjacent to `cumulative_payment` for the
    /// account. A record at the queried value itself is never returned.
    async fn on_demand_neighbors(
        &self,
        account: Address,
        cumulative_payment: u64,
    ) -> PaymentResult<PaymentNeighbors>;

    /// Remove a payment record. Removing an absent record is not an error.
    async fn remove_on_demand_payment(
        &self,
        account: Address,
        cumulative_payment: u64,
    ) -> PaymentResult<()>;
}
