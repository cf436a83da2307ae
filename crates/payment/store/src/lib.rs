//! Off-chain usage ledger implementations.
//!
//! The meterer records every accepted request against a [`UsageLedger`]
//! (bin counters and the neighbor-queryable payment index). This crate
//! provides:
//!
//! - [`tables`] - the order-preserving key layout of the three tables
//! - [`InMemoryLedger`] - a linearisable, process-local ledger storing its
//!   rows under those keys
//!
//! [`UsageLedger`]: prism_payment_api::UsageLedger

mod memory;
pub mod tables;

pub use memory::InMemoryLedger;
