// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::types::EpochState;
use residual_aggregator::FixedValue;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StateObjectError {
    /// The operation does not fit the current epoch state, or workers are
    /// still registered when the epoch is expected to be quiescent.
    #[error("{operation} is not allowed in {state} state with {active_writers} registered writers")]
    InvalidState {
        operation: &'static str,
        state: EpochState,
        active_writers: usize,
    },
    #[error("residual queue of slot {slot} is full ({limit} residuals)")]
    QueueCapacityExceeded { slot: FixedValue, limit: usize },
    #[error("{residuals} residuals over {slots} slots have not been merged")]
    UnmergedResiduals { slots: usize, residuals: usize },
}

pub type StateObjectResult<T> = Result<T, StateObjectError>;
