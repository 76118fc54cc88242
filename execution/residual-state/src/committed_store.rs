// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use dashmap::DashMap;
use residual_aggregator::FixedValue;
use std::collections::BTreeMap;

/// Committed value of a slot and whether it changed since the last time
/// dirty slots were handed to persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotEntry {
    pub value: FixedValue,
    pub dirty: bool,
}

/// Confirmed storage of an account: the values set by direct writes and by
/// the most recent merge.
#[derive(Default)]
pub struct CommittedSlotStore {
    slots: DashMap<FixedValue, SlotEntry>,
}

impl CommittedSlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value carried over from a prior epoch. Not dirty.
    pub fn load(&self, slot: FixedValue, value: FixedValue) {
        self.slots.insert(slot, SlotEntry {
            value,
            dirty: false,
        });
    }

    pub fn write(&self, slot: FixedValue, value: FixedValue) {
        self.slots.insert(slot, SlotEntry { value, dirty: true });
    }

    pub fn get(&self, slot: &FixedValue) -> Option<FixedValue> {
        self.slots.get(slot).map(|entry| entry.value)
    }

    pub fn value_or_zero(&self, slot: &FixedValue) -> FixedValue {
        self.get(slot).unwrap_or(FixedValue::ZERO)
    }

    pub fn is_dirty(&self, slot: &FixedValue) -> bool {
        self.slots.get(slot).is_some_and(|entry| entry.dirty)
    }

    pub fn dirty_slots(&self) -> Vec<FixedValue> {
        let mut slots: Vec<FixedValue> = self
            .slots
            .iter()
            .filter(|entry| entry.dirty)
            .map(|entry| *entry.key())
            .collect();
        slots.sort();
        slots
    }

    /// Returns the dirty slots with their values, ordered by slot, and clears
    /// their dirty flags.
    pub fn take_dirty(&self) -> Vec<(FixedValue, FixedValue)> {
        let mut dirty = Vec::new();
        for mut entry in self.slots.iter_mut() {
            if entry.dirty {
                entry.dirty = false;
                dirty.push((*entry.key(), entry.value));
            }
        }
        dirty.sort();
        dirty
    }

    pub fn snapshot(&self) -> BTreeMap<FixedValue, FixedValue> {
        self.slots
            .iter()
            .map(|entry| (*entry.key(), entry.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
