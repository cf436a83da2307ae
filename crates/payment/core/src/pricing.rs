//! Chargeable-size and price arithmetic.
//!
//! Both billing paths account in **chargeable sizes**: a payload's length
//! floored by the configured minimum, so that dust-sized blobs still pay for
//! the work they cause. Prices are quoted per minimum chargeable size and
//! rounded up, never down.

use prism_payment_api::{PaymentError, PaymentResult};

/// The accounting size of a payload.
pub fn charged_size(data_length: u32, min_chargeable_size: u32) -> u64 {
    u64::from(data_length.max(min_chargeable_size))
}

/// Price of a payload in currency units.
///
/// `ceil(charged_size * price_per_chargeable / min_chargeable_size)`. The
/// intermediate product is checked; a 64-bit overflow rejects the request
/// rather than wrapping into a cheaper price.
pub fn payment_charged(
    data_length: u32,
    min_chargeable_size: u32,
    price_per_chargeable: u32,
) -> PaymentResult<u64> {
    let size = charged_size(data_length, min_chargeable_size);
    let scaled = size
        .checked_mul(u64::from(price_per_chargeable))
        .ok_or(PaymentError::PriceOverflow { data_length })?;
    Ok(scaled.div_ceil(u64::from(min_chargeable_size)))
}
