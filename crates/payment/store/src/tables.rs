//! Key layout for the usage tables.
//!
//! This module fixes the storage layout of the three tables: each key is a
//! fixed-width partition component followed by a big-endian range component,
//! so lexicographic byte order agrees with numeric order and the strict
//! neighbor queries run as bounded range scans over the `on_demand` table.
//! [`InMemoryLedger`](crate::InMemoryLedger) stores its rows under exactly
//! these keys, and a persistent ordered KV backend would reuse them
//! unchanged.
//!
//! | table              | partition      | range                | value         |
//! |--------------------|----------------|----------------------|---------------|
//! | `reservation_bins` | account (20 B) | bin index (4 B BE)   | usage `u64`   |
//! | `global_bins`      | -              | bin index (8 B BE)   | usage `u64`   |
//! | `on_demand`        | account (20 B) | payment (8 B BE)     | length `u32`  |

use alloy_primitives::Address;

/// Errors decoding a persisted key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The raw key has the wrong length for its table.
    #[error("key has length {actual}, expected {expected}")]
    Length {
        /// Length of the raw key handed in.
        actual: usize,
        /// Length the table's keys always have.
        expected: usize,
    },
}

/// Key into the `reservation_bins` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReservationBinKey {
    /// Partition component.
    pub account: Address,
    /// Range component.
    pub bin_index: u32,
}

impl ReservationBinKey {
    /// Encoded width in bytes.
    pub const LEN: usize = Address::len_bytes() + 4;

    /// Encode to the persisted representation.
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..20].copy_from_slice(self.account.as_slice());
        out[20..].copy_from_slice(&self.bin_index.to_be_bytes());
        out
    }

    /// Decode from the persisted representation.
    pub fn decode(raw: &[u8]) -> Result<Self, KeyError> {
        let raw: &[u8; Self::LEN] = raw.try_into().map_err(|_| KeyError::Length {
            actual: raw.len(),
            expected: Self::LEN,
        })?;
        Ok(Self {
            account: Address::from_slice(&raw[..20]),
            bin_index: u32::from_be_bytes(raw[20..].try_into().expect("4-byte slice")),
        })
    }
}

/// Key into the `global_bins` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalBinKey(pub u64);

impl GlobalBinKey {
    /// Encoded width in bytes.
    pub const LEN: usize = 8;

    /// Encode to the persisted representation.
    pub fn encode(&self) -> [u8; Self::LEN] {
        self.0.to_be_bytes()
    }

    /// Decode from the persisted representation.
    pub fn decode(raw: &[u8]) -> Result<Self, KeyError> {
        let raw: &[u8; Self::LEN] = raw.try_into().map_err(|_| KeyError::Length {
            actual: raw.len(),
            expected: Self::LEN,
        })?;
        Ok(Self(u64::from_be_bytes(*raw)))
    }
}

/// Key into the `on_demand` table. The cumulative payment is the sort key;
/// the neighbor queries depend on its order surviving encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OnDemandKey {
    /// Partition component.
    pub account: Address,
    /// Range component and sort key.
    pub cumulative_payment: u64,
}

impl OnDemandKey {
    /// Encoded width in bytes.
    pub const LEN: usize = Address::len_bytes() + 8;

    /// Encode to the persisted representation.
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..20].copy_from_slice(self.account.as_slice());
        out[20..].copy_from_slice(&self.cumulative_payment.to_be_bytes());
        out
    }

    /// Decode from the persisted representation.
    pub fn decode(raw: &[u8]) -> Result<Self, KeyError> {
        let raw: &[u8; Self::LEN] = raw.try_into().map_err(|_| KeyError::Length {
            actual: raw.len(),
            expected: Self::LEN,
        })?;
        Ok(Self {
            account: Address::from_slice(&raw[..20]),
            cumulative_payment: u64::from_be_bytes(raw[20..].try_into().expect("8-byte slice")),
        })
    }
}
