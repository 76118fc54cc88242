// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{
    committed_store::CommittedSlotStore,
    counters::{
        MERGED_RESIDUALS, MERGED_SLOTS, MERGE_SECONDS, REJECTED_OPERATIONS, RESIDUAL_APPENDS,
    },
    errors::{StateObjectError, StateObjectResult},
    residual_queue::ResidualQueueStore,
    types::{EpochState, MergeSummary},
};
use crossbeam::utils::{Backoff, CachePadded};
use primitive_types::H160;
use residual_aggregator::{
    fold_residuals,
    resolver::{SlotReadMode, SlotResolver},
    FixedValue, ResidualDelta, ResidualOp,
};
use residual_config::config::ResidualStateConfig;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Storage of one account for the duration of an execution epoch.
///
/// Slots are updated either directly (`set_state`, the serialized path) or by
/// appending residual deltas (`set_residual_state`, safe to call from any
/// number of workers). `merge_residual_state` folds the residuals into the
/// committed values at the end of the epoch.
///
/// Merging requires quiescence: every deferred write of the epoch must
/// happen-before the merge. Workers announce themselves through
/// `register_writer`, and a merge attempted while any writer is registered is
/// refused with `InvalidState`.
pub struct AccountStateObject {
    address: H160,
    config: ResidualStateConfig,
    committed: CommittedSlotStore,
    residuals: ResidualQueueStore,
    epoch_state: CachePadded<AtomicU8>,
    active_writers: CachePadded<AtomicUsize>,
    epoch: CachePadded<AtomicU64>,
}

impl AccountStateObject {
    pub fn new(address: H160, config: ResidualStateConfig) -> Self {
        Self {
            address,
            residuals: ResidualQueueStore::new(config.max_residuals_per_slot),
            config,
            committed: CommittedSlotStore::new(),
            epoch_state: CachePadded::new(AtomicU8::new(EpochState::Open as u8)),
            active_writers: CachePadded::new(AtomicUsize::new(0)),
            epoch: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Creates an object whose committed store starts from the values of a
    /// prior epoch. Loaded slots are not dirty.
    pub fn with_storage<I>(address: H160, config: ResidualStateConfig, storage: I) -> Self
    where
        I: IntoIterator<Item = (FixedValue, FixedValue)>,
    {
        let state_object = Self::new(address, config);
        for (slot, value) in storage {
            state_object.committed.load(slot, value);
        }
        state_object
    }

    pub fn address(&self) -> H160 {
        self.address
    }

    pub fn state(&self) -> EpochState {
        EpochState::from_u8(self.epoch_state.load(Ordering::SeqCst))
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn active_writers(&self) -> usize {
        self.active_writers.load(Ordering::SeqCst)
    }

    /// Overwrites the committed value of `slot` and marks it dirty.
    ///
    /// Must not run concurrently with deferred writes or a merge touching the
    /// same slot; the last writer wins in that case. The write counts as a
    /// registered writer for its duration, so it is never interleaved with a
    /// merge that checks quiescence.
    pub fn set_state(&self, slot: FixedValue, value: FixedValue) -> StateObjectResult<()> {
        let _writer = self.register("set_state")?;
        self.committed.write(slot, value);
        Ok(())
    }

    /// Appends a residual to the queue of `slot`. Safe to call concurrently
    /// from any number of workers.
    ///
    /// Only effects expressible as a signed addition may use this path.
    pub fn set_residual_state(
        &self,
        slot: FixedValue,
        magnitude: FixedValue,
        op: impl Into<ResidualOp>,
    ) -> StateObjectResult<()> {
        self.register_writer()?
            .set_residual_state(slot, magnitude, op)
    }

    /// Registers the caller as a writer of the current epoch. The epoch cannot
    /// be merged while the returned guard is alive.
    ///
    /// A merge or close in progress is waited out; only a closed object
    /// refuses the registration.
    pub fn register_writer(&self) -> StateObjectResult<WriterGuard<'_>> {
        self.register("set_residual_state")
    }

    /// Folds every pending residual into the committed value of its slot
    /// (zero for slots without one), marks the slots dirty and clears the
    /// queues. Moves the object to the next epoch.
    ///
    /// All deferred writes of the epoch must have completed before the call,
    /// e.g. by joining the workers that issued them.
    pub fn merge_residual_state(&self) -> StateObjectResult<MergeSummary> {
        self.transition(EpochState::Open, EpochState::Merging, "merge_residual_state")?;
        if self.config.enforce_quiescence {
            let active_writers = self.active_writers();
            if active_writers > 0 {
                self.epoch_state
                    .store(EpochState::Open as u8, Ordering::SeqCst);
                return Err(self.invalid_state("merge_residual_state", EpochState::Open));
            }
        }

        let timer = MERGE_SECONDS.start_timer();
        let epoch = self.epoch();
        let mut summary = MergeSummary {
            epoch,
            ..MergeSummary::default()
        };
        for (slot, residuals) in self.residuals.drain() {
            let base = self.committed.value_or_zero(&slot);
            let merged = fold_residuals(base, &residuals);
            debug!(
                address = ?self.address,
                epoch,
                %slot,
                %base,
                %merged,
                residuals = residuals.len(),
                "Merged residual queue"
            );
            self.committed.write(slot, merged);
            summary.slots_merged += 1;
            summary.residuals_applied += residuals.len();
        }
        timer.observe_duration();

        MERGED_SLOTS.inc_by(summary.slots_merged as u64);
        MERGED_RESIDUALS.inc_by(summary.residuals_applied as u64);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.epoch_state
            .store(EpochState::Open as u8, Ordering::SeqCst);

        info!(
            address = ?self.address,
            epoch,
            slots_merged = summary.slots_merged,
            residuals_applied = summary.residuals_applied,
            "Merged residual state"
        );
        Ok(summary)
    }

    /// Ends the object's lifecycle. Pending residuals must have been merged.
    ///
    /// The object holds `Merging` while the checks run, so writers arriving
    /// meanwhile wait instead of observing a `Closed` state that may be
    /// rolled back.
    pub fn close(&self) -> StateObjectResult<()> {
        self.transition(EpochState::Open, EpochState::Merging, "close")?;
        let active_writers = self.active_writers();
        let residuals = self.residuals.num_residuals();
        if active_writers > 0 {
            self.epoch_state
                .store(EpochState::Open as u8, Ordering::SeqCst);
            return Err(self.invalid_state("close", EpochState::Open));
        }
        if residuals > 0 {
            let slots = self.residuals.num_slots();
            self.epoch_state
                .store(EpochState::Open as u8, Ordering::SeqCst);
            return Err(StateObjectError::UnmergedResiduals { slots, residuals });
        }
        self.epoch_state
            .store(EpochState::Closed as u8, Ordering::SeqCst);
        info!(address = ?self.address, epoch = self.epoch(), "Closed account state");
        Ok(())
    }

    /// Committed value of `slot`, zero if it was never written.
    pub fn get_state(&self, slot: &FixedValue) -> FixedValue {
        self.committed.value_or_zero(slot)
    }

    pub fn get_committed_state(&self, slot: &FixedValue) -> Option<FixedValue> {
        self.committed.get(slot)
    }

    pub fn pending_residuals(&self, slot: &FixedValue) -> usize {
        self.residuals.pending(slot)
    }

    pub fn num_pending_residuals(&self) -> usize {
        self.residuals.num_residuals()
    }

    pub fn is_dirty(&self, slot: &FixedValue) -> bool {
        self.committed.is_dirty(slot)
    }

    pub fn dirty_slots(&self) -> Vec<FixedValue> {
        self.committed.dirty_slots()
    }

    /// Hands the dirty slots over for incremental commit, ordered by slot.
    pub fn take_dirty_storage(&self) -> Vec<(FixedValue, FixedValue)> {
        self.committed.take_dirty()
    }

    pub fn committed_store(&self) -> &CommittedSlotStore {
        &self.committed
    }

    fn register(&self, operation: &'static str) -> StateObjectResult<WriterGuard<'_>> {
        let backoff = Backoff::new();
        loop {
            // Registering before checking the state pairs with merge and
            // close, which leave `Open` before checking for writers: one of
            // the two always observes the other.
            self.active_writers.fetch_add(1, Ordering::SeqCst);
            match self.state() {
                EpochState::Open => {
                    return Ok(WriterGuard {
                        state_object: self,
                    });
                },
                EpochState::Merging => {
                    self.active_writers.fetch_sub(1, Ordering::SeqCst);
                    while self.state() == EpochState::Merging {
                        backoff.snooze();
                    }
                },
                EpochState::Closed => {
                    self.active_writers.fetch_sub(1, Ordering::SeqCst);
                    return Err(self.invalid_state(operation, EpochState::Closed));
                },
            }
        }
    }

    fn append_residual(&self, slot: FixedValue, delta: ResidualDelta) -> StateObjectResult<()> {
        match self.residuals.append(slot, delta) {
            Ok(_) => {
                RESIDUAL_APPENDS.inc();
                Ok(())
            },
            Err(err) => {
                REJECTED_OPERATIONS
                    .with_label_values(&["set_residual_state", "capacity"])
                    .inc();
                warn!(address = ?self.address, %slot, error = %err, "Rejected residual");
                Err(err)
            },
        }
    }

    fn transition(
        &self,
        from: EpochState,
        to: EpochState,
        operation: &'static str,
    ) -> StateObjectResult<()> {
        self.epoch_state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|current| self.invalid_state(operation, EpochState::from_u8(current)))
    }

    fn invalid_state(&self, operation: &'static str, state: EpochState) -> StateObjectError {
        REJECTED_OPERATIONS
            .with_label_values(&[operation, "state"])
            .inc();
        StateObjectError::InvalidState {
            operation,
            state,
            active_writers: self.active_writers(),
        }
    }
}

impl SlotResolver for AccountStateObject {
    fn resolve_slot_value(&self, slot: &FixedValue, mode: SlotReadMode) -> FixedValue {
        let base = self.get_state(slot);
        match mode {
            SlotReadMode::LastCommitted => base,
            SlotReadMode::Aggregated => fold_residuals(base, &self.residuals.snapshot(slot)),
        }
    }
}

/// Registration of a worker issuing deferred writes. Dropping the guard
/// deregisters the worker.
pub struct WriterGuard<'a> {
    state_object: &'a AccountStateObject,
}

impl WriterGuard<'_> {
    pub fn set_residual_state(
        &self,
        slot: FixedValue,
        magnitude: FixedValue,
        op: impl Into<ResidualOp>,
    ) -> StateObjectResult<()> {
        self.state_object
            .append_residual(slot, ResidualDelta::new(magnitude, op.into()))
    }

    /// Committed value of `slot`, ignoring pending residuals.
    pub fn get_state(&self, slot: &FixedValue) -> FixedValue {
        self.state_object.get_state(slot)
    }

    pub fn state_object(&self) -> &AccountStateObject {
        self.state_object
    }
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        self.state_object
            .active_writers
            .fetch_sub(1, Ordering::SeqCst);
    }
}
