// Copyright (c) 2025 The Sia Foundation

//! The currency type.
//!
//! Values are u128-backed with explicitly checked arithmetic. Consensus
//! code never wraps and never panics on arithmetic; every operation that
//! could overflow or underflow returns a [`CurrencyError`] that callers
//! convert into a validation failure.

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use sia_util_serial::{
    write_big_uint, Reader, Result as SerialResult, SiaDecodable, SiaEncodable,
};

/// An arithmetic failure on [`Currency`] values.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum CurrencyError {
    /// currency addition overflowed
    Overflow,
    /// currency subtraction underflowed
    Underflow,
}

/// An amount of siacoins or siafunds.
///
/// On disk a currency value is a byte-count-prefixed minimal big-endian
/// integer, so the format does not change if the backing width ever grows.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Currency(u128);

impl Currency {
    /// The zero value.
    pub const ZERO: Self = Self(0);

    /// Construct from a raw integer.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// True when the value is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Self) -> Result<Self, CurrencyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(CurrencyError::Overflow)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Self) -> Result<Self, CurrencyError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(CurrencyError::Underflow)
    }

    /// Checked multiplication by a scalar.
    pub fn checked_mul(self, factor: u128) -> Result<Self, CurrencyError> {
        self.0
            .checked_mul(factor)
            .map(Self)
            .ok_or(CurrencyError::Overflow)
    }

    /// Division by a scalar, rounding down. Division by zero is a
    /// programmer error and panics like integer division does.
    pub fn div_floor(self, divisor: u128) -> Self {
        Self(self.0 / divisor)
    }
}

impl From<u64> for Currency {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SiaEncodable for Currency {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_big_uint(buf, self.0);
    }
}

impl SiaDecodable for Currency {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self(r.read_big_uint()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sia_util_serial::{decode, encode};

    #[test]
    fn checked_ops() {
        let a = Currency::new(100);
        let b = Currency::new(40);
        assert_eq!(a.checked_add(b).unwrap(), Currency::new(140));
        assert_eq!(a.checked_sub(b).unwrap(), Currency::new(60));
        assert_eq!(b.checked_sub(a), Err(CurrencyError::Underflow));
        assert_eq!(
            Currency::new(u128::MAX).checked_add(Currency::new(1)),
            Err(CurrencyError::Overflow)
        );
    }

    #[test]
    fn encoding_roundtrip() {
        for v in [0u128, 1, 100, u64::MAX as u128 + 1] {
            let c = Currency::new(v);
            assert_eq!(decode::<Currency>(&encode(&c)).unwrap(), c);
        }
    }

    #[test]
    fn encoding_is_minimal_big_endian() {
        let buf = encode(&Currency::new(0x0100));
        assert_eq!(&buf[..8], &2u64.to_le_bytes());
        assert_eq!(&buf[8..], &[1, 0]);
    }
}
