//! Fixed chain state for tests and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::RwLock;
use prism_payment_api::{
    ActiveReservation, ChainPaymentState, OnDemandDeposit, PaymentResult,
};

/// A [`ChainPaymentState`] backed by fixed in-process tables.
///
/// Reservations and deposits are configured up front (or adjusted at
/// runtime) and served unchanged for any block number. Use it where a real
/// chain is unavailable: unit tests, local development, single-node setups.
#[derive(Debug, Default)]
pub struct StaticPaymentState {
    block_number: AtomicU64,
    reservations: RwLock<HashMap<Address, ActiveReservation>>,
    deposits: RwLock<HashMap<Address, OnDemandDeposit>>,
}

impl StaticPaymentState {
    /// Create an empty state at block zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reservation, builder style.
    pub fn with_reservation(self, account: Address, reservation: ActiveReservation) -> Self {
        self.insert_reservation(account, reservation);
        self
    }

    /// Add a deposit, builder style.
    pub fn with_deposit(self, account: Address, deposit: OnDemandDeposit) -> Self {
        self.insert_deposit(account, deposit);
        self
    }

    /// Advance (or rewind) the reported block number.
    pub fn set_block_number(&self, block: u64) {
        self.block_number.store(block, Ordering::Relaxed);
    }

    /// Insert or replace an account's reservation.
    pub fn insert_reservation(&self, account: Address, reservation: ActiveReservation) {
        self.reservations.write().insert(account, reservation);
    }

    /// Insert or replace an account's deposit.
    pub fn insert_deposit(&self, account: Address, deposit: OnDemandDeposit) {
        self.deposits.write().insert(account, deposit);
    }
}

#[async_trait]
impl ChainPaymentState for StaticPaymentState {
    async fn current_block_number(&self) -> PaymentResult<u64> {
        Ok(self.block_number.load(Ordering::Relaxed))
    }

    async fn active_reservation(
        &self,
        _block: u64,
        account: Address,
    ) -> PaymentResult<Option<ActiveReservation>> {
        Ok(self.reservations.read().get(&account).cloned())
    }

    async fn on_demand_deposit(
        &self,
        _block: u64,
        account: Address,
    ) -> PaymentResult<Option<OnDemandDeposit>> {
        Ok(self.deposits.read().get(&account).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_reservation() -> ActiveReservation {
        ActiveReservation {
            data_rate: 4096,
            start_timestamp: 1000,
            end_timestamp: 2000,
            quorum_numbers: vec![0, 1],
        }
    }

    #[tokio::test]
    async fn test_serves_configured_entries() {
        let account = Address::repeat_byte(0x01);
        let state = StaticPaymentState::new()
            .with_reservation(account, test_reservation())
            .with_deposit(account, OnDemandDeposit { cumulative_payment: 500 });

        let reservation = state.active_reservation(0, account).await.unwrap();
        assert_eq!(reservation, Some(test_reservation()));

        let deposit = state.on_demand_deposit(0, account).await.unwrap();
        assert_eq!(deposit.unwrap().cumulative_payment, 500);

        // Unknown accounts have neither.
        let other = Address::repeat_byte(0x02);
        assert!(state.active_reservation(0, other).await.unwrap().is_none());
        assert!(state.on_demand_deposit(0, other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_block_number_is_settable() {
        let state = StaticPaymentState::new();
        assert_eq!(state.current_block_number().await.unwrap(), 0);

        state.set_block_number(1234);
        assert_eq!(state.current_block_number().await.unwrap(), 1234);
    }
}
