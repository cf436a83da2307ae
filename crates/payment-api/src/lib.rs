//! Payment metering seam for the prism dispersal network.
//!
//! This crate defines the data model and the two adapter traits the meterer
//! is written against:
//!
//! - [`ChainPaymentState`] - read-only snapshot of reservations and deposits
//!   as recorded on chain
//! - [`UsageLedger`] - mutable off-chain usage accounting (bin counters and
//!   the neighbor-queryable payment index)
//!
//! plus [`PaymentError`], the single rejection/failure enumeration shared by
//! every component, and EIP-712 signing support for [`PaymentHeader`] in
//! [`eip712`].

#![warn(missing_docs)]

mod chain;
mod error;
pub mod eip712;
mod ledger;
mod types;

pub use chain::ChainPaymentState;
pub use error::{PaymentError, PaymentResult};
pub use eip712::{PaymentHeaderExt, SignedPaymentHeader};
pub use ledger::UsageLedger;
pub use types::{
    ActiveReservation, OnDemandDeposit, PaymentHeader, PaymentNeighbors, PaymentRecord,
};

// Re-export so downstream crates agree on the account identity type.
pub use alloy_primitives::Address;
