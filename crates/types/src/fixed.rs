use alloy_primitives::U256;
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by [`FixedDecimal`]
pub const DECIMAL_PRECISION: u32 = 18;

const SCALE: u64 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixedPointError {
    #[error("value is negative: {0}")]
    Negative(String),

    #[error("value does not fit in 256 bits: {0}")]
    Overflow(String),

    #[error("invalid decimal literal: {0}")]
    Parse(String),
}

/// Signed decimal with exactly 18 fractional digits.
///
/// The value is stored as an arbitrary-precision integer scaled by 10^18, so
/// token amounts of any uint256 magnitude keep their full fractional part.
/// Every operation that can produce more than 18 fractional digits rounds
/// toward negative infinity, which is how the pool itself truncates.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FixedDecimal {
    raw: BigInt,
}

impl FixedDecimal {
    pub fn zero() -> Self {
        Self { raw: BigInt::zero() }
    }

    pub fn one() -> Self {
        Self {
            raw: BigInt::from(SCALE),
        }
    }

    /// Build from an already scaled representation (`value * 10^18`)
    pub fn from_raw(raw: BigInt) -> Self {
        Self { raw }
    }

    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Self {
            raw: value.into() * BigInt::from(SCALE),
        }
    }

    pub fn from_u256(value: U256) -> Self {
        Self::from_integer(u256_to_bigint(value))
    }

    /// Scaled representation (`value * 10^18`)
    pub fn raw(&self) -> &BigInt {
        &self.raw
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.raw.is_negative()
    }

    /// Product, truncated toward negative infinity to 18 fractional digits
    pub fn mul_floor(&self, other: &Self) -> Self {
        Self {
            raw: (&self.raw * &other.raw).div_floor(&BigInt::from(SCALE)),
        }
    }

    /// Quotient, truncated toward negative infinity to 18 fractional digits.
    ///
    /// Returns `None` when dividing by zero.
    pub fn div_floor(&self, other: &Self) -> Option<Self> {
        if other.raw.is_zero() {
            return None;
        }
        Some(Self {
            raw: (&self.raw * BigInt::from(SCALE)).div_floor(&other.raw),
        })
    }

    /// Largest integer not greater than this value
    pub fn floor(&self) -> BigInt {
        self.raw.div_floor(&BigInt::from(SCALE))
    }

    /// Floor of this value as an unsigned 256-bit integer
    pub fn floor_to_u256(&self) -> Result<U256, FixedPointError> {
        bigint_to_u256(&self.floor())
    }
}

impl Default for FixedDecimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for FixedDecimal {
    type Output = FixedDecimal;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            raw: self.raw + rhs.raw,
        }
    }
}

impl Sub for FixedDecimal {
    type Output = FixedDecimal;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            raw: self.raw - rhs.raw,
        }
    }
}

impl PartialOrd for FixedDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FixedDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.raw.abs();
        let (integer, fraction) = magnitude.div_rem(&BigInt::from(SCALE));
        if self.raw.is_negative() {
            write!(f, "-")?;
        }
        if fraction.is_zero() {
            return write!(f, "{integer}");
        }
        let digits = format!("{:0>width$}", fraction.to_string(), width = DECIMAL_PRECISION as usize);
        write!(f, "{integer}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for FixedDecimal {
    type Err = FixedPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if integer.is_empty() || !all_digits(integer) || !all_digits(fraction) {
            return Err(FixedPointError::Parse(s.to_string()));
        }
        if fraction.len() > DECIMAL_PRECISION as usize {
            return Err(FixedPointError::Parse(format!(
                "{s}: more than {DECIMAL_PRECISION} fractional digits"
            )));
        }

        let padded = format!("{integer}{:0<width$}", fraction, width = DECIMAL_PRECISION as usize);
        let raw = BigInt::from_str(&padded).map_err(|e| FixedPointError::Parse(e.to_string()))?;
        Ok(Self {
            raw: if negative { -raw } else { raw },
        })
    }
}

impl Serialize for FixedDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FixedDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from(BigUint::from_bytes_be(&value.to_be_bytes_vec()))
}

pub fn bigint_to_u256(value: &BigInt) -> Result<U256, FixedPointError> {
    let (sign, bytes) = value.to_bytes_be();
    if sign == Sign::Minus {
        return Err(FixedPointError::Negative(value.to_string()));
    }
    if bytes.len() > 32 {
        return Err(FixedPointError::Overflow(value.to_string()));
    }
    U256::try_from_be_slice(&bytes).ok_or_else(|| FixedPointError::Overflow(value.to_string()))
}
