//! Conversions between the pool's sqrt-price encoding and linear prices.
//!
//! Prices are always token0 quoted in token1 (`price = token1 per token0`).
//! Every function here is pure and rounds toward negative infinity, so the
//! same inputs always produce the same bits.

use alloy_primitives::U256;
use cow_operator_types::{bigint_to_u256, u256_to_bigint, FixedDecimal, FixedPointError, Q96_BITS};
use num_bigint::BigInt;
use num_traits::Signed;

use crate::MatchingError;

/// Linear price from `sqrtPriceX96`: `floor18(s / 2^96)` squared, truncated to 18 digits
pub fn price_from_sqrt_x96(sqrt_price_x96: U256) -> FixedDecimal {
    let scaled = u256_to_bigint(sqrt_price_x96) * FixedDecimal::one().raw();
    let sqrt_price = FixedDecimal::from_raw(scaled >> Q96_BITS);
    sqrt_price.mul_floor(&sqrt_price)
}

/// `floor(sqrt(price * 2^192))`, the inverse of [`price_from_sqrt_x96`] up to rounding
pub fn sqrt_price_x96_from_price(price: &FixedDecimal) -> Result<U256, MatchingError> {
    if price.is_negative() {
        return Err(FixedPointError::Negative(price.to_string()).into());
    }
    let shifted: BigInt = (price.raw() << (2 * Q96_BITS)) / FixedDecimal::one().raw();
    debug_assert!(!shifted.is_negative());
    Ok(bigint_to_u256(&shifted.sqrt())?)
}

/// Output received for `input` at `price`, floored to a whole token unit.
///
/// Zero-for-one sells token0, so the output is `input * price` token1;
/// one-for-zero sells token1 for `input / price` token0.
pub fn ideal_output(
    input: U256,
    price: &FixedDecimal,
    zero_for_one: bool,
) -> Result<U256, MatchingError> {
    let input = FixedDecimal::from_u256(input);
    let output = if zero_for_one {
        input.mul_floor(price)
    } else {
        input.div_floor(price).ok_or(MatchingError::ZeroPrice)?
    };
    Ok(output.floor_to_u256()?)
}
