// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec, HistogramVec,
    IntCounterVec,
};

/// Count of executed transactions, labeled by execution mode
pub static EXECUTED_TRANSACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "residual_executor_executed_transactions_total",
        "Count of transactions executed against account state",
        &["mode"]
    )
    .unwrap()
});

/// Count of epochs whose execution stopped on an error, labeled by execution mode
pub static ABORTED_EPOCHS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "residual_executor_aborted_epochs_total",
        "Count of epoch executions stopped by a transaction or state error",
        &["mode"]
    )
    .unwrap()
});

pub static EXECUTION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "residual_executor_execution_seconds",
        "Time spent executing the transactions of an epoch",
        &["mode"],
        exponential_buckets(/*start=*/ 1e-6, /*factor=*/ 2.0, /*count=*/ 26).unwrap()
    )
    .unwrap()
});
