//! Read-through cache over a chain payment reader.

use std::collections::HashMap;

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::RwLock;
use prism_payment_api::{
    ActiveReservation, ChainPaymentState, OnDemandDeposit, PaymentResult,
};

/// A cache entry together with the block it was read at.
#[derive(Debug, Clone)]
struct Stamped<T> {
    block: u64,
    value: T,
}

/// Read-through, block-stamped cache over a [`ChainPaymentState`].
///
/// Chain reads are slow relative to the metering hot path, and reservation
/// and deposit entries change rarely. Each per-account entry is stamped with
/// the block it was fetched at and served while the caller's requested block
/// is not newer; requesting a newer block refetches through the inner
/// reader. Block number queries always pass through.
///
/// Absent accounts are cached too, so repeated requests from an unknown
/// account do not hammer the chain.
#[derive(Debug)]
pub struct CachedPaymentState<C> {
    inner: C,
    reservations: RwLock<HashMap<Address, Stamped<Option<ActiveReservation>>>>,
    deposits: RwLock<HashMap<Address, Stamped<Option<OnDemandDeposit>>>>,
}

impl<C> CachedPaymentState<C> {
    /// Wrap a chain reader with an empty cache.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            reservations: RwLock::new(HashMap::new()),
            deposits: RwLock::new(HashMap::new()),
        }
    }

    /// Access the wrapped reader.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop any cached entries for the account.
    pub fn invalidate(&self, account: Address) {
        self.reservations.write().remove(&account);
        self.deposits.write().remove(&account);
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.reservations.write().clear();
        self.deposits.write().clear();
    }
}

impl<C: ChainPaymentState> CachedPaymentState<C> {
    /// Serve from `cache` when the entry is stamped at `block` or later.
    fn lookup<T: Clone>(
        cache: &RwLock<HashMap<Address, Stamped<T>>>,
        block: u64,
        account: Address,
    ) -> Option<T> {
        let cache = cache.read();
        let entry = cache.get(&account)?;
        (entry.block >= block).then(|| entry.value.clone())
    }

    /// Store a freshly fetched entry, keeping whichever stamp is newest.
    fn store<T>(
        cache: &RwLock<HashMap<Address, Stamped<T>>>,
        block: u64,
        account: Address,
        value: T,
    ) {
        let mut cache = cache.write();
        match cache.get(&account) {
            Some(existing) if existing.block > block => {}
            _ => {
                cache.insert(account, Stamped { block, value });
            }
        }
    }
}

#[async_trait]
impl<C: ChainPaymentState> ChainPaymentState for CachedPaymentState<C> {
    async fn current_block_number(&self) -> PaymentResult<u64> {
        self.inner.current_block_number().await
    }

    async fn active_reservation(
        &self,
        block: u64,
        account: Address,
    ) -> PaymentResult<Option<ActiveReservation>> {
        if let Some(hit) = Self::lookup(&self.reservations, block, account) {
            return Ok(hit);
        }

        let fresh = self.inner.active_reservation(block, account).await?;
        Self::store(&self.reservations, block, account, fresh.clone());
        Ok(fresh)
    }

    async fn on_demand_deposit(
        &self,
        block: u64,
        account: Address,
    ) -> PaymentResult<Option<OnDemandDeposit>> {
        if let Some(hit) = Self::lookup(&self.deposits, block, account) {
            return Ok(hit);
        }

        let fresh = self.inner.on_demand_deposit(block, account).await?;
        Self::store(&self.deposits, block, account, fresh);
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticPaymentState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts reads that reach the wrapped state.
    struct Probe {
        inner: StaticPaymentState,
        reads: AtomicUsize,
    }

    impl Probe {
        fn new(inner: StaticPaymentState) -> Self {
            Self {
                inner,
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl ChainPaymentState for Probe {
        async fn current_block_number(&self) -> PaymentResult<u64> {
            self.inner.current_block_number().await
        }

        async fn active_reservation(
            &self,
            block: u64,
            account: Address,
        ) -> PaymentResult<Option<ActiveReservation>> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.active_reservation(block, account).await
        }

        async fn on_demand_deposit(
            &self,
            block: u64,
            account: Address,
        ) -> PaymentResult<Option<OnDemandDeposit>> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.on_demand_deposit(block, account).await
        }
    }

    fn test_reservation() -> ActiveReservation {
        ActiveReservation {
            data_rate: 4096,
            start_timestamp: 0,
            end_timestamp: 10_000,
            quorum_numbers: vec![0, 1],
        }
    }

    #[tokio::test]
    async fn test_repeated_reads_hit_the_cache() {
        let account = Address::repeat_byte(0x01);
        let cached = CachedPaymentState::new(Arc::new(Probe::new(
            StaticPaymentState::new().with_reservation(account, test_reservation()),
        )));

        for _ in 0..5 {
            let reservation = cached.active_reservation(10, account).await.unwrap();
            assert_eq!(reservation, Some(test_reservation()));
        }

        assert_eq!(cached.inner().reads(), 1);
    }

    #[tokio::test]
    async fn test_newer_block_refetches() {
        let account = Address::repeat_byte(0x01);
        let cached = CachedPaymentState::new(Arc::new(Probe::new(
            StaticPaymentState::new().with_reservation(account, test_reservation()),
        )));

        cached.active_reservation(10, account).await.unwrap();
        // An older or equal block is served from the cache.
        cached.active_reservation(5, account).await.unwrap();
        cached.active_reservation(10, account).await.unwrap();
        assert_eq!(cached.inner().reads(), 1);

        // A newer block is not.
        cached.active_reservation(11, account).await.unwrap();
        assert_eq!(cached.inner().reads(), 2);
    }

    #[tokio::test]
    async fn test_absence_is_cached() {
        let account = Address::repeat_byte(0x01);
        let cached = CachedPaymentState::new(Arc::new(Probe::new(StaticPaymentState::new())));

        for _ in 0..3 {
            assert!(cached.on_demand_deposit(10, account).await.unwrap().is_none());
        }
        assert_eq!(cached.inner().reads(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let account = Address::repeat_byte(0x01);
        let probe = Arc::new(Probe::new(
            StaticPaymentState::new().with_reservation(account, test_reservation()),
        ));
        let cached = CachedPaymentState::new(Arc::clone(&probe));

        cached.active_reservation(10, account).await.unwrap();
        cached.invalidate(account);
        cached.active_reservation(10, account).await.unwrap();

        assert_eq!(probe.reads(), 2);
    }
}
