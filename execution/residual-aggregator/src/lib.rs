// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Storage slots updated from many speculative workers record their effect as
//! signed residual deltas instead of overwriting the slot. Because addition
//! modulo 2^256 commutes, the deltas of an epoch can be reduced into the slot
//! value in any order once all workers are done.

pub mod fixed_value;
pub mod resolver;
pub mod residual_delta;
pub mod wrapping_math;

pub use fixed_value::{FixedValue, FixedValueParseError};
pub use residual_delta::{combine_residuals, fold_residuals, ResidualDelta, ResidualOp};
pub use wrapping_math::SignedValue;
