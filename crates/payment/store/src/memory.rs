//! In-memory usage ledger.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included};

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;
use prism_payment_api::{
    PaymentError, PaymentNeighbors, PaymentRecord, PaymentResult, UsageLedger,
};

use crate::tables::{GlobalBinKey, OnDemandKey, ReservationBinKey};

/// A linearisable, process-local [`UsageLedger`].
///
/// Rows are stored under the encoded keys of [`tables`](crate::tables), the
/// same byte order a persistent backend would use, so the strict-neighbor
/// queries run as bounded range scans over an account's key partition. Each
/// table is guarded by its own mutex and every operation holds exactly one
/// lock, never across an await point, so all mutations are atomic with
/// respect to other calls on the same table.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    reservation_bins: Mutex<BTreeMap<[u8; ReservationBinKey::LEN], u64>>,
    global_bins: Mutex<BTreeMap<[u8; GlobalBinKey::LEN], u64>>,
    on_demand: Mutex<BTreeMap<[u8; OnDemandKey::LEN], u32>>,
}

/// Bounds of an account's key partition in the `on_demand` table.
fn partition(account: Address) -> ([u8; OnDemandKey::LEN], [u8; OnDemandKey::LEN]) {
    let key = |cumulative_payment| {
        OnDemandKey {
            account,
            cumulative_payment,
        }
        .encode()
    };
    (key(0), key(u64::MAX))
}

/// Recover a payment record from a stored row.
fn record_at(key: &[u8; OnDemandKey::LEN], data_length: u32) -> PaymentRecord {
    let key = OnDemandKey::decode(key).expect("fixed-width key");
    PaymentRecord {
        cumulative_payment: key.cumulative_payment,
        data_length,
    }
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded usage for an account's bin; zero when untouched.
    pub fn reservation_usage(&self, account: Address, bin_index: u32) -> u64 {
        self.reservation_bins
            .lock()
            .get(&ReservationBinKey { account, bin_index }.encode())
            .copied()
            .unwrap_or(0)
    }

    /// Network-wide usage recorded for a one-second bin; zero when untouched.
    pub fn global_usage(&self, bin_index: u64) -> u64 {
        self.global_bins
            .lock()
            .get(&GlobalBinKey(bin_index).encode())
            .copied()
            .unwrap_or(0)
    }

    /// All payment records for an account, ordered by cumulative payment.
    pub fn on_demand_records(&self, account: Address) -> Vec<PaymentRecord> {
        let (first, last) = partition(account);
        self.on_demand
            .lock()
            .range(first..=last)
            .map(|(key, &data_length)| record_at(key, data_length))
            .collect()
    }
}

#[async_trait]
impl UsageLedger for InMemoryLedger {
    async fn increment_reservation_bin(
        &self,
        account: Address,
        bin_index: u32,
        delta: u64,
    ) -> PaymentResult<u64> {
        let mut bins = self.reservation_bins.lock();
        let usage = bins
            .entry(ReservationBinKey { account, bin_index }.encode())
            .or_insert(0);
        *usage = usage.saturating_add(delta);
        Ok(*usage)
    }

    async fn increment_global_bin(&self, bin_index: u64, delta: u64) -> PaymentResult<u64> {
        let mut bins = self.global_bins.lock();
        let usage = bins.entry(GlobalBinKey(bin_index).encode()).or_insert(0);
        *usage = usage.saturating_add(delta);
        Ok(*usage)
    }

    async fn insert_on_demand_payment(
        &self,
        account: Address,
        cumulative_payment: u64,
        data_length: u32,
    ) -> PaymentResult<()> {
        let key = OnDemandKey {
            account,
            cumulative_payment,
        }
        .encode();

        let mut records = self.on_demand.lock();
        if records.contains_key(&key) {
            return Err(PaymentError::DuplicatePayment(cumulative_payment));
        }
        records.insert(key, data_length);
        Ok(())
    }

    async fn on_demand_neighbors(
        &self,
        account: Address,
        cumulative_payment: u64,
    ) -> PaymentResult<PaymentNeighbors> {
        let key = OnDemandKey {
            account,
            cumulative_payment,
        }
        .encode();
        let (first, last) = partition(account);

        // Both scans stay inside the account's partition and exclude the
        // queried key itself, so a record at the queried payment is never
        // its own neighbor.
        let records = self.on_demand.lock();
        Ok(PaymentNeighbors {
            prev: records
                .range(first..key)
                .next_back()
                .map(|(key, &data_length)| record_at(key, data_length)),
            next: records
                .range((Excluded(key), Included(last)))
                .next()
                .map(|(key, &data_length)| record_at(key, data_length)),
        })
    }

    async fn remove_on_demand_payment(
        &self,
        account: Address,
        cumulative_payment: u64,
    ) -> PaymentResult<()> {
        self.on_demand.lock().remove(
            &OnDemandKey {
                account,
                cumulative_payment,
            }
            .encode(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_account() -> Address {
        Address::repeat_byte(0x01)
    }

    #[tokio::test]
    async fn test_reservation_bin_returns_post_increment_usage() {
        let ledger = InMemoryLedger::new();
        let account = test_account();

        assert_eq!(
            ledger
                .increment_reservation_bin(account, 7, 3000)
                .await
                .unwrap(),
            3000
        );
        assert_eq!(
            ledger
                .increment_reservation_bin(account, 7, 2000)
                .await
                .unwrap(),
            5000
        );
        assert_eq!(ledger.reservation_usage(account, 7), 5000);

        // Other bins and accounts are independent.
        assert_eq!(ledger.reservation_usage(account, 8), 0);
        assert_eq!(ledger.reservation_usage(Address::repeat_byte(0x02), 7), 0);
    }

    #[tokio::test]
    async fn test_global_bin_is_account_agnostic() {
        let ledger = InMemoryLedger::new();

        assert_eq!(ledger.increment_global_bin(100, 512).await.unwrap(), 512);
        assert_eq!(ledger.increment_global_bin(100, 512).await.unwrap(), 1024);
        assert_eq!(ledger.global_usage(100), 1024);
        assert_eq!(ledger.global_usage(101), 0);
    }

    #[tokio::test]
    async fn test_insert_conflicts_on_existing_payment() {
        let ledger = InMemoryLedger::new();
        let account = test_account();

        ledger
            .insert_on_demand_payment(account, 200, 2048)
            .await
            .unwrap();

        let err = ledger
            .insert_on_demand_payment(account, 200, 1024)
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::DuplicatePayment(200));

        // The original record is untouched by the losing insert.
        let records = ledger.on_demand_records(account);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data_length, 2048);
    }

    #[tokio::test]
    async fn test_neighbors_are_strict() {
        let ledger = InMemoryLedger::new();
        let account = test_account();

        for (payment, length) in [(200u64, 2048u32), (500, 1024), (900, 4096)] {
            ledger
                .insert_on_demand_payment(account, payment, length)
                .await
                .unwrap();
        }

        // The record at the queried value is excluded from both sides.
        let neighbors = ledger.on_demand_neighbors(account, 500).await.unwrap();
        assert_eq!(neighbors.prev.unwrap().cumulative_payment, 200);
        assert_eq!(neighbors.next.unwrap().cumulative_payment, 900);
        assert_eq!(neighbors.next.unwrap().data_length, 4096);

        // Below the smallest and above the largest record.
        let neighbors = ledger.on_demand_neighbors(account, 100).await.unwrap();
        assert!(neighbors.prev.is_none());
        assert_eq!(neighbors.next.unwrap().cumulative_payment, 200);

        let neighbors = ledger.on_demand_neighbors(account, 1000).await.unwrap();
        assert_eq!(neighbors.prev.unwrap().cumulative_payment, 900);
        assert!(neighbors.next.is_none());

        // A value between records sees both sides.
        let neighbors = ledger.on_demand_neighbors(account, 600).await.unwrap();
        assert_eq!(neighbors.prev.unwrap().cumulative_payment, 500);
        assert_eq!(neighbors.next.unwrap().cumulative_payment, 900);
    }

    #[tokio::test]
    async fn test_neighbor_scan_stays_in_the_account_partition() {
        let ledger = InMemoryLedger::new();
        let low = Address::repeat_byte(0x01);
        let high = Address::repeat_byte(0x02);

        // Adjacent key partitions: `low`'s largest possible payment sorts
        // immediately before `high`'s smallest.
        ledger
            .insert_on_demand_payment(low, u64::MAX, 2048)
            .await
            .unwrap();
        ledger.insert_on_demand_payment(high, 5, 1024).await.unwrap();

        // Neither scan crosses into the other account's rows.
        let neighbors = ledger.on_demand_neighbors(high, 10).await.unwrap();
        assert_eq!(neighbors.prev.unwrap().cumulative_payment, 5);
        assert!(neighbors.next.is_none());

        let neighbors = ledger.on_demand_neighbors(low, u64::MAX).await.unwrap();
        assert!(neighbors.prev.is_none());
        assert!(neighbors.next.is_none());

        let neighbors = ledger.on_demand_neighbors(high, 1).await.unwrap();
        assert!(neighbors.prev.is_none());
        assert_eq!(neighbors.next.unwrap().cumulative_payment, 5);
    }

    #[tokio::test]
    async fn test_neighbors_for_unknown_account() {
        let ledger = InMemoryLedger::new();

        let neighbors = ledger
            .on_demand_neighbors(test_account(), 500)
            .await
            .unwrap();
        assert_eq!(neighbors, PaymentNeighbors::default());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let ledger = InMemoryLedger::new();
        let account = test_account();

        ledger
            .insert_on_demand_payment(account, 200, 2048)
            .await
            .unwrap();
        ledger.remove_on_demand_payment(account, 200).await.unwrap();
        assert!(ledger.on_demand_records(account).is_empty());

        // Absent records, and accounts never seen, are fine to remove.
        ledger.remove_on_demand_payment(account, 200).await.unwrap();
        ledger
            .remove_on_demand_payment(Address::repeat_byte(0x02), 1)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_increments_lose_nothing() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account = test_account();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    ledger
                        .increment_reservation_bin(account, 0, 1)
                        .await
                        .unwrap();
                    ledger.increment_global_bin(0, 1).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(ledger.reservation_usage(account, 0), 800);
        assert_eq!(ledger.global_usage(0), 800);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_inserts_admit_exactly_one() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account = test_account();

        let mut handles = Vec::new();
        for i in 0..8u32 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.insert_on_demand_payment(account, 300, 1024 + i).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(ledger.on_demand_records(account).len(), 1);
    }
}
