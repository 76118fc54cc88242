// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Parallel slot accumulation uses a `ResidualDelta`. Every delta is a signed
//! magnitude that is added to the slot value when the epoch is merged. There
//! is no postcondition to check: wraparound is the defined behavior.

use crate::{
    fixed_value::FixedValue,
    wrapping_math::{addition_signed_value, SignedValue},
};

/// Direction of a residual update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResidualOp {
    Add,
    Sub,
}

impl From<bool> for ResidualOp {
    /// `true` adds, `false` subtracts.
    fn from(is_add: bool) -> Self {
        if is_add { ResidualOp::Add } else { ResidualOp::Sub }
    }
}

/// Represents one pending contribution to a slot value.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ResidualDelta {
    update: SignedValue,
}

impl ResidualDelta {
    pub fn new(magnitude: FixedValue, op: ResidualOp) -> Self {
        let update = match op {
            ResidualOp::Add => SignedValue::Positive(magnitude),
            ResidualOp::Sub => SignedValue::Negative(magnitude),
        };
        Self { update }
    }

    pub fn addition(magnitude: FixedValue) -> Self {
        Self::new(magnitude, ResidualOp::Add)
    }

    pub fn subtraction(magnitude: FixedValue) -> Self {
        Self::new(magnitude, ResidualOp::Sub)
    }

    pub fn get_update(&self) -> SignedValue {
        self.update
    }

    pub fn magnitude(&self) -> FixedValue {
        *self.update.magnitude()
    }

    pub fn is_add(&self) -> bool {
        self.update.is_positive()
    }

    pub fn op(&self) -> ResidualOp {
        ResidualOp::from(self.is_add())
    }

    /// Returns the result of delta application to `base`.
    pub fn apply_to(&self, base: &FixedValue) -> FixedValue {
        addition_signed_value(base, &self.update)
    }

    /// Applies self on top of previous delta, merging them together.
    pub fn merge_with_previous_delta(&mut self, previous_delta: ResidualDelta) {
        self.update = previous_delta.update.add(&self.update);
    }

    /// Applies next delta on top of self. Gives the same result as
    /// `merge_with_previous_delta` since the combination commutes.
    pub fn merge_with_next_delta(&mut self, next_delta: ResidualDelta) {
        self.update = self.update.add(&next_delta.update);
    }
}

impl From<SignedValue> for ResidualDelta {
    fn from(update: SignedValue) -> Self {
        Self { update }
    }
}

impl std::fmt::Debug for ResidualDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.update {
            SignedValue::Positive(value) => write!(f, "+{}", value),
            SignedValue::Negative(value) => write!(f, "-{}", value),
        }
    }
}

/// Reduces `residuals` into `base`. The result is
/// `base + Σ(±magnitude) mod 2^256` for any ordering of `residuals`.
pub fn fold_residuals<'a, I>(base: FixedValue, residuals: I) -> FixedValue
where
    I: IntoIterator<Item = &'a ResidualDelta>,
{
    residuals
        .into_iter()
        .fold(base, |acc, delta| delta.apply_to(&acc))
}

/// Pre-combines a queue into one net delta, `None` for an empty queue.
pub fn combine_residuals<'a, I>(residuals: I) -> Option<ResidualDelta>
where
    I: IntoIterator<Item = &'a ResidualDelta>,
{
    residuals.into_iter().copied().reduce(|mut acc, delta| {
        acc.merge_with_next_delta(delta);
        acc
    })
}

#[cfg(any(test, feature = "testing"))]
pub fn residual_add(v: u64) -> ResidualDelta {
    ResidualDelta::addition(FixedValue::from_u64(v))
}

#[cfg(any(test, feature = "testing"))]
pub fn residual_sub(v: u64) -> ResidualDelta {
    ResidualDelta::subtraction(FixedValue::from_u64(v))
}
