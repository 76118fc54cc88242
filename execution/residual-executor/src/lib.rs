// Copyright © Aptos Foundation
// Parts of the project are originally copyright © Meta Platforms, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Drives the transactions of an epoch against an `AccountStateObject`.
//!
//! The parallel executor hands transactions to a fixed number of rayon
//! workers. Each worker registers as a writer for the lifetime of its loop,
//! so every deferred write it issues happens-before the join of the scope.
//! Only after the join does the executor hand out a `QuiescentEpoch`, the
//! token through which the epoch is merged.

mod counters;
pub mod errors;
pub mod executor;
pub mod task;


pub use errors::ExecutionError;
pub use executor::{ParallelResidualExecutor, QuiescentEpoch, SequentialResidualExecutor};
pub use task::{ExecutorTask, ParallelWriter, SequentialWriter, StateWriter};
