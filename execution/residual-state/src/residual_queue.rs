// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::errors::{StateObjectError, StateObjectResult};
use dashmap::DashMap;
use residual_aggregator::{FixedValue, ResidualDelta};

/// Maps each slot to the residuals appended to it during the current epoch.
///
/// The DashMap shards act as a lock table keyed by slot: an append holds the
/// write lock of its slot's shard only for the push itself, so a reader never
/// observes a half-appended residual and appends to unrelated slots proceed
/// in parallel.
pub struct ResidualQueueStore {
    queues: DashMap<FixedValue, Vec<ResidualDelta>>,
    max_residuals_per_slot: usize,
}

impl ResidualQueueStore {
    pub fn new(max_residuals_per_slot: usize) -> Self {
        Self {
            queues: DashMap::new(),
            max_residuals_per_slot,
        }
    }

    /// Appends `delta` to the queue of `slot`, returning the queue length
    /// after the append.
    pub fn append(&self, slot: FixedValue, delta: ResidualDelta) -> StateObjectResult<usize> {
        let mut queue = self.queues.entry(slot).or_default();
        if queue.len() >= self.max_residuals_per_slot {
            return Err(StateObjectError::QueueCapacityExceeded {
                slot,
                limit: self.max_residuals_per_slot,
            });
        }
        queue.push(delta);
        Ok(queue.len())
    }

    /// Number of residuals pending for `slot`.
    pub fn pending(&self, slot: &FixedValue) -> usize {
        self.queues.get(slot).map_or(0, |queue| queue.len())
    }

    /// Copy of the residuals pending for `slot`, in insertion order.
    pub fn snapshot(&self, slot: &FixedValue) -> Vec<ResidualDelta> {
        self.queues
            .get(slot)
            .map(|queue| queue.value().clone())
            .unwrap_or_default()
    }

    pub fn num_slots(&self) -> usize {
        self.queues.iter().filter(|queue| !queue.is_empty()).count()
    }

    pub fn num_residuals(&self) -> usize {
        self.queues.iter().map(|queue| queue.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_residuals() == 0
    }

    /// Removes every queue, returning the non-empty ones ordered by slot.
    ///
    /// Must not race with `append`: residuals appended while draining may end
    /// up in the returned queues or stay behind for the next drain.
    pub fn drain(&self) -> Vec<(FixedValue, Vec<ResidualDelta>)> {
        // Keys are collected first so that no shard guard is held while removing.
        let mut slots: Vec<FixedValue> = self.queues.iter().map(|entry| *entry.key()).collect();
        slots.sort();
        slots
            .into_iter()
            .filter_map(|slot| self.queues.remove(&slot))
            .filter(|(_, queue)| !queue.is_empty())
            .collect()
    }
}
