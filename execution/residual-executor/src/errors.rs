// Copyright © Aptos Foundation
// Parts of the project are originally copyright © Meta Platforms, Inc.
// SPDX-License-Identifier: Apache-2.0

use residual_state::StateObjectError;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError<E: Debug> {
    /// Execution of a transaction yields a non-recoverable error, such error will be propagated
    /// back to the caller. Transactions not yet started when it happened are skipped.
    #[error("transaction {index} aborted: {error:?}")]
    UserError { index: usize, error: E },
    /// The state object refused to accept writers, e.g. because it is closed.
    #[error(transparent)]
    StateObject(#[from] StateObjectError),
    /// Invariant violation that happens internally inside of the executor, usually an indication
    /// of implementation error.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T, E> = ::std::result::Result<T, ExecutionError<E>>;
