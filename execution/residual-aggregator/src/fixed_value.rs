// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const FIXED_VALUE_LENGTH: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum FixedValueParseError {
    #[error("invalid hex literal: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A 256-bit big-endian word. The same type addresses a storage slot and holds
/// the slot's value, and all arithmetic on it wraps modulo 2^256 like a
/// virtual-machine word.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FixedValue([u8; FIXED_VALUE_LENGTH]);

impl FixedValue {
    pub const MAX: FixedValue = FixedValue([0xff; FIXED_VALUE_LENGTH]);
    pub const ZERO: FixedValue = FixedValue([0; FIXED_VALUE_LENGTH]);

    pub const fn new(bytes: [u8; FIXED_VALUE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Builds a value from arbitrary bytes. Shorter inputs are left-padded
    /// with zeros, longer inputs keep only their rightmost 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut out = [0u8; FIXED_VALUE_LENGTH];
        let bytes = &bytes[bytes.len().saturating_sub(FIXED_VALUE_LENGTH)..];
        out[FIXED_VALUE_LENGTH - bytes.len()..].copy_from_slice(bytes);
        Self(out)
    }

    /// Parses a hex literal such as `0x1`, `a` or a full 64-digit word. The
    /// `0x` prefix is optional and odd lengths are accepted.
    pub fn from_hex_literal(literal: &str) -> Result<Self, FixedValueParseError> {
        let digits = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
            .unwrap_or(literal);
        let bytes = if digits.len() % 2 == 1 {
            hex::decode(format!("0{}", digits))?
        } else {
            hex::decode(digits)?
        };
        Ok(Self::from_slice(&bytes))
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_u256(U256::from(value))
    }

    pub fn from_u256(value: U256) -> Self {
        let mut out = [0u8; FIXED_VALUE_LENGTH];
        value.to_big_endian(&mut out);
        Self(out)
    }

    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; FIXED_VALUE_LENGTH] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; FIXED_VALUE_LENGTH] {
        self.0
    }

    /// Big-endian bytes without leading zeros. Empty for zero.
    pub fn trimmed_bytes(&self) -> &[u8] {
        let start = self
            .0
            .iter()
            .position(|byte| *byte != 0)
            .unwrap_or(FIXED_VALUE_LENGTH);
        &self.0[start..]
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }

    pub fn wrapping_add(&self, other: &Self) -> Self {
        let (sum, _) = self.to_u256().overflowing_add(other.to_u256());
        Self::from_u256(sum)
    }

    pub fn wrapping_sub(&self, other: &Self) -> Self {
        let (difference, _) = self.to_u256().overflowing_sub(other.to_u256());
        Self::from_u256(difference)
    }

    /// Additive inverse modulo 2^256.
    pub fn wrapping_neg(&self) -> Self {
        Self::ZERO.wrapping_sub(self)
    }

    /// Reduces an arbitrary-precision integer into the 256-bit domain.
    /// Negative inputs end up in two's-complement form.
    pub fn from_big(value: &BigInt) -> Self {
        let modulus = modulus();
        let mut residue = value % &modulus;
        if residue.is_negative() {
            residue += &modulus;
        }
        let (_, bytes) = residue.to_bytes_be();
        Self::from_slice(&bytes)
    }

    /// Unsigned interpretation.
    pub fn to_big(&self) -> BigInt {
        BigInt::from_bytes_be(Sign::Plus, &self.0)
    }

    /// Two's-complement interpretation: a set top bit means a negative value.
    pub fn to_signed_big(&self) -> BigInt {
        let unsigned = self.to_big();
        if self.0[0] & 0x80 != 0 {
            unsigned - modulus()
        } else {
            unsigned
        }
    }
}

fn modulus() -> BigInt {
    BigInt::one() << (FIXED_VALUE_LENGTH * 8)
}

impl From<u64> for FixedValue {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<U256> for FixedValue {
    fn from(value: U256) -> Self {
        Self::from_u256(value)
    }
}

impl From<FixedValue> for U256 {
    fn from(value: FixedValue) -> Self {
        value.to_u256()
    }
}

impl From<[u8; FIXED_VALUE_LENGTH]> for FixedValue {
    fn from(bytes: [u8; FIXED_VALUE_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl std::str::FromStr for FixedValue {
    type Err = FixedValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_literal(s)
    }
}

impl fmt::Display for FixedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trimmed = self.trimmed_bytes();
        if trimmed.is_empty() {
            return write!(f, "0x0");
        }
        let digits = hex::encode(trimmed);
        write!(f, "0x{}", digits.trim_start_matches('0'))
    }
}

impl fmt::LowerHex for FixedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "0x")?;
        }
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for FixedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedValue({:#x})", self)
    }
}
