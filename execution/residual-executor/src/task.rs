// Copyright © Aptos Foundation
// Parts of the project are originally copyright © Meta Platforms, Inc.
// SPDX-License-Identifier: Apache-2.0

use residual_aggregator::{FixedValue, ResidualDelta, ResidualOp};
use residual_state::{errors::StateObjectResult, AccountStateObject, WriterGuard};
use std::fmt::Debug;

/// View of account state handed to a transaction. Reads return committed
/// values; residual writes are commutative additions to a slot.
pub trait StateWriter {
    fn read_state(&self, slot: &FixedValue) -> FixedValue;

    fn write_residual(
        &self,
        slot: FixedValue,
        magnitude: FixedValue,
        op: ResidualOp,
    ) -> StateObjectResult<()>;
}

/// Trait for single threaded transaction executor.
pub trait ExecutorTask: Sync {
    /// Type of transaction.
    type Txn: Sync;

    /// Type of error when the executor failed to process a transaction and needs to abort.
    type Error: Debug + Send;

    /// Execute a single transaction given the view of the current state.
    fn execute_transaction(
        &self,
        view: &dyn StateWriter,
        txn: &Self::Txn,
    ) -> Result<(), Self::Error>;
}

/// Applies residual writes immediately, by reading the committed value and
/// writing back the sum. Only correct when transactions run one at a time.
pub struct SequentialWriter<'a> {
    state_object: &'a AccountStateObject,
}

impl<'a> SequentialWriter<'a> {
    pub fn new(state_object: &'a AccountStateObject) -> Self {
        Self { state_object }
    }
}

impl StateWriter for SequentialWriter<'_> {
    fn read_state(&self, slot: &FixedValue) -> FixedValue {
        self.state_object.get_state(slot)
    }

    fn write_residual(
        &self,
        slot: FixedValue,
        magnitude: FixedValue,
        op: ResidualOp,
    ) -> StateObjectResult<()> {
        let base = self.state_object.get_state(&slot);
        let value = ResidualDelta::new(magnitude, op).apply_to(&base);
        self.state_object.set_state(slot, value)
    }
}

/// Defers residual writes to the slot queues of the state object. Holds a
/// writer registration, so the epoch cannot be merged while it is alive.
pub struct ParallelWriter<'a> {
    guard: WriterGuard<'a>,
}

impl<'a> ParallelWriter<'a> {
    pub fn new(guard: WriterGuard<'a>) -> Self {
        Self { guard }
    }
}

impl StateWriter for ParallelWriter<'_> {
    fn read_state(&self, slot: &FixedValue) -> FixedValue {
        self.guard.get_state(slot)
    }

    fn write_residual(
        &self,
        slot: FixedValue,
        magnitude: FixedValue,
        op: ResidualOp,
    ) -> StateObjectResult<()> {
        self.guard.set_residual_state(slot, magnitude, op)
    }
}
