// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::fixed_value::FixedValue;

/// Implements application of `Addition` to `base`. Wraps modulo 2^256.
pub fn addition(base: &FixedValue, value: &FixedValue) -> FixedValue {
    base.wrapping_add(value)
}

/// Implements application of `Subtraction` to `base`. Wraps modulo 2^256, so
/// going below zero lands in the two's-complement range.
pub fn subtraction(base: &FixedValue, value: &FixedValue) -> FixedValue {
    base.wrapping_sub(value)
}

/// Signed magnitude of a pending slot update.
#[derive(Clone, Copy, Hash, PartialOrd, Ord, Debug, PartialEq, Eq)]
pub enum SignedValue {
    Positive(FixedValue),
    Negative(FixedValue),
}

impl SignedValue {
    pub fn magnitude(&self) -> &FixedValue {
        match self {
            SignedValue::Positive(value) | SignedValue::Negative(value) => value,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, SignedValue::Positive(_))
    }

    pub fn minus(&self) -> Self {
        match self {
            SignedValue::Positive(value) => SignedValue::Negative(*value),
            SignedValue::Negative(value) => SignedValue::Positive(*value),
        }
    }

    /// Combines two signed values. The result is congruent to the sum of both
    /// modulo 2^256 no matter the argument order.
    pub fn add(&self, other: &Self) -> Self {
        // Merging values with different signs (+A-B and -A+B): the larger
        // magnitude keeps its sign.
        macro_rules! update_different_sign {
            ($a:ident, $b:ident) => {
                if $a >= $b {
                    SignedValue::Positive(subtraction($a, $b))
                } else {
                    SignedValue::Negative(subtraction($b, $a))
                }
            };
        }

        match (self, other) {
            (SignedValue::Positive(v1), SignedValue::Positive(v2)) => {
                SignedValue::Positive(addition(v1, v2))
            },
            (SignedValue::Positive(v1), SignedValue::Negative(v2)) => update_different_sign!(v1, v2),
            (SignedValue::Negative(v1), SignedValue::Positive(v2)) => update_different_sign!(v2, v1),
            (SignedValue::Negative(v1), SignedValue::Negative(v2)) => {
                SignedValue::Negative(addition(v1, v2))
            },
        }
    }

    /// The value as a single residue modulo 2^256.
    pub fn to_residue(&self) -> FixedValue {
        match self {
            SignedValue::Positive(value) => *value,
            SignedValue::Negative(value) => value.wrapping_neg(),
        }
    }
}

/// Implements base + value
pub fn addition_signed_value(base: &FixedValue, value: &SignedValue) -> FixedValue {
    match value {
        SignedValue::Positive(value) => addition(base, value),
        SignedValue::Negative(value) => subtraction(base, value),
    }
}
