//! Read-only access to the on-chain payment state.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::{ActiveReservation, OnDemandDeposit, PaymentResult};

/// Read-only view of reservations and deposits as recorded on chain.
///
/// Calls are snapshot reads anchored at a block number and carry no side
/// effects, so they are always safe to retry. Implementations must be safe
/// for concurrent use from any number of worker tasks.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait ChainPaymentState: Send + Sync + 'static {
    /// Latest block number; the basis for the reads that follow it.
    async fn current_block_number(&self) -> PaymentResult<u64>;

    /// The account's reservation as of `block`, if one is recorded.
    async fn active_reservation(
        &self,
        block: u64,
        account: Address,
    ) -> PaymentResult<Option<ActiveReservation>>;

    /// The account's on-demand deposit as of `block`, if one is recorded.
    async fn on_demand_deposit(
        &self,
        block: u64,
        account: Address,
    ) -> PaymentResult<Option<OnDemandDeposit>>;
}
