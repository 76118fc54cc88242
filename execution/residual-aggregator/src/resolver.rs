// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::fixed_value::FixedValue;

/// Defines different ways a slot value can be resolved by a `SlotResolver`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotReadMode {
    /// The committed value with every pending residual folded in. Only exact
    /// once the epoch is quiescent; concurrent appends may or may not be seen.
    Aggregated,
    /// The returned value is based on last committed value, ignoring
    /// any pending residuals.
    LastCommitted,
}

/// Returns the value of a storage slot. Slots that were never written
/// resolve to zero.
pub trait SlotResolver {
    fn resolve_slot_value(&self, slot: &FixedValue, mode: SlotReadMode) -> FixedValue;
}

// Utils to resolve slot values from a plain map together with a list of
// pending residuals. Here, we only care about a single account.
#[cfg(any(test, feature = "testing"))]
pub mod test_utils {
    use super::*;
    use crate::residual_delta::{fold_residuals, ResidualDelta};
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct SlotStore {
        committed: HashMap<FixedValue, FixedValue>,
        pending: HashMap<FixedValue, Vec<ResidualDelta>>,
    }

    impl SlotStore {
        pub fn set_committed(&mut self, slot: FixedValue, value: FixedValue) {
            self.committed.insert(slot, value);
        }

        pub fn push_residual(&mut self, slot: FixedValue, delta: ResidualDelta) {
            self.pending.entry(slot).or_default().push(delta);
        }
    }

    impl SlotResolver for SlotStore {
        fn resolve_slot_value(&self, slot: &FixedValue, mode: SlotReadMode) -> FixedValue {
            let base = self.committed.get(slot).copied().unwrap_or_default();
            match mode {
                SlotReadMode::LastCommitted => base,
                SlotReadMode::Aggregated => match self.pending.get(slot) {
                    Some(residuals) => fold_residuals(base, residuals),
                    None => base,
                },
            }
        }
    }

}
