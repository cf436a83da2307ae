//! On-chain payment state adapters.
//!
//! Implementations of [`ChainPaymentState`]:
//!
//! - [`StaticPaymentState`] - fixed in-process tables for tests and
//!   development
//! - [`CachedPaymentState`] - a read-through, block-stamped cache in front
//!   of a slower chain reader
//!
//! [`ChainPaymentState`]: prism_payment_api::ChainPaymentState

mod cached;
mod static_state;

pub use cached::CachedPaymentState;
pub use static_state::StaticPaymentState;
