// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Lifecycle of an account state object within an execution epoch.
///
/// Open --merge_residual_state--> Merging --(done or refused)--> Open
///   |
///   +--close--> Merging --(checks pass)--> Closed
///
/// Closed is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EpochState {
    /// Workers may issue direct and deferred writes.
    Open = 0,
    /// A merge or close holds the object. Writers wait for it to finish.
    Merging = 1,
    /// Handed over to persistence, or discarded.
    Closed = 2,
}

impl EpochState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => EpochState::Open,
            1 => EpochState::Merging,
            _ => EpochState::Closed,
        }
    }
}

impl fmt::Display for EpochState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EpochState::Open => "open",
            EpochState::Merging => "merging",
            EpochState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of reducing one epoch of residuals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Epoch that was merged. The object is in epoch `epoch + 1` afterwards.
    pub epoch: u64,
    pub slots_merged: usize,
    pub residuals_applied: usize,
}
