// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use prometheus::{
    exponential_buckets, register_histogram, register_int_counter, register_int_counter_vec,
    Histogram, IntCounter, IntCounterVec,
};

/// Count of residuals appended to slot queues
pub static RESIDUAL_APPENDS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "residual_state_appends_total",
        "Count of residual deltas appended to slot queues"
    )
    .unwrap()
});

/// Count of rejected state object operations, labeled by operation and reason
pub static REJECTED_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "residual_state_rejected_operations_total",
        "Count of state object operations rejected by epoch checks or queue limits",
        &["operation", "reason"]
    )
    .unwrap()
});

/// Count of slots whose queue was reduced into the committed store
pub static MERGED_SLOTS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "residual_state_merged_slots_total",
        "Count of slots reduced by residual merges"
    )
    .unwrap()
});

/// Count of residuals folded by merges
pub static MERGED_RESIDUALS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "residual_state_merged_residuals_total",
        "Count of residual deltas folded by residual merges"
    )
    .unwrap()
});

pub static MERGE_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "residual_state_merge_seconds",
        "Time spent reducing the residual queues of an account",
        exponential_buckets(/*start=*/ 1e-6, /*factor=*/ 2.0, /*count=*/ 24).unwrap()
    )
    .unwrap()
});
