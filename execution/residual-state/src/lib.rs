// Copyright © Aptos Foundation
// Parts of the project are originally copyright © Meta Platforms, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory storage of a single account during an execution epoch.
//!
//! Concurrency is managed by DashMap, i.e. when a method appends to the
//! residual queue of a given slot, it holds exclusive access to that slot's
//! shard and doesn't need to explicitly synchronize with other writers.
//! Writers of unrelated slots only contend when their slots share a shard.

pub mod committed_store;
mod counters;
pub mod errors;
pub mod residual_queue;
pub mod state_object;
pub mod types;

#[cfg(test)]
mod unit_tests;

pub use committed_store::{CommittedSlotStore, SlotEntry};
pub use errors::StateObjectError;
pub use residual_queue::ResidualQueueStore;
pub use state_object::{AccountStateObject, WriterGuard};
pub use types::{EpochState, MergeSummary};
