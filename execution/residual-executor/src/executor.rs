// Copyright © Aptos Foundation
// Parts of the project are originally copyright © Meta Platforms, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    counters::{ABORTED_EPOCHS, EXECUTED_TRANSACTIONS, EXECUTION_SECONDS},
    errors::{ExecutionError, Result},
    task::{ExecutorTask, ParallelWriter, SequentialWriter},
};
use parking_lot::Mutex;
use rayon::scope;
use residual_config::config::ExecutionConfig;
use residual_state::{errors::StateObjectResult, AccountStateObject, MergeSummary};
use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tracing::{debug, info, warn};

/// Runs transactions one after the other, applying residual writes
/// immediately. Serves as the baseline the parallel executor must agree with.
#[derive(Default)]
pub struct SequentialResidualExecutor;

impl SequentialResidualExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Executes `transactions` in order and returns how many were executed.
    /// Stops at the first error.
    pub fn execute_transactions<E: ExecutorTask>(
        &self,
        task: &E,
        state_object: &AccountStateObject,
        transactions: &[E::Txn],
    ) -> Result<usize, E::Error> {
        let timer = EXECUTION_SECONDS
            .with_label_values(&["sequential"])
            .start_timer();
        let view = SequentialWriter::new(state_object);
        for (index, txn) in transactions.iter().enumerate() {
            if let Err(error) = task.execute_transaction(&view, txn) {
                timer.observe_duration();
                EXECUTED_TRANSACTIONS
                    .with_label_values(&["sequential"])
                    .inc_by(index as u64);
                ABORTED_EPOCHS.with_label_values(&["sequential"]).inc();
                warn!(index, error = ?error, "Sequential execution aborted");
                return Err(ExecutionError::UserError { index, error });
            }
        }
        timer.observe_duration();
        EXECUTED_TRANSACTIONS
            .with_label_values(&["sequential"])
            .inc_by(transactions.len() as u64);
        Ok(transactions.len())
    }
}

/// Proof that every worker of an epoch has been joined. Merging through the
/// token is therefore never refused for registered writers of this executor.
#[must_use = "the residuals of an executed epoch are only folded in by merge()"]
pub struct QuiescentEpoch<'a> {
    state_object: &'a AccountStateObject,
    num_executed: usize,
}

impl<'a> QuiescentEpoch<'a> {
    pub fn num_executed(&self) -> usize {
        self.num_executed
    }

    pub fn state_object(&self) -> &'a AccountStateObject {
        self.state_object
    }

    pub fn merge(self) -> StateObjectResult<MergeSummary> {
        self.state_object.merge_residual_state()
    }
}

impl fmt::Debug for QuiescentEpoch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuiescentEpoch")
            .field("address", &self.state_object.address())
            .field("epoch", &self.state_object.epoch())
            .field("num_executed", &self.num_executed)
            .finish()
    }
}

pub struct ParallelResidualExecutor {
    concurrency_level: usize,
}

impl ParallelResidualExecutor {
    /// The caller should make sure that `concurrency_level` > 0.
    pub fn new(concurrency_level: usize) -> Self {
        assert!(
            concurrency_level > 0,
            "Parallel execution requires concurrency level > 0"
        );
        Self { concurrency_level }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(config.concurrency_level)
    }

    pub fn concurrency_level(&self) -> usize {
        self.concurrency_level
    }

    /// Executes `transactions` on up to `concurrency_level` workers, each of
    /// which defers its residual writes to the queues of `state_object`.
    ///
    /// The first error stops every worker before its next transaction and is
    /// returned; residuals written by the transactions that did execute stay
    /// queued for the caller to merge or discard.
    pub fn execute_transactions<'s, E: ExecutorTask>(
        &self,
        task: &E,
        state_object: &'s AccountStateObject,
        transactions: &[E::Txn],
    ) -> Result<QuiescentEpoch<'s>, E::Error> {
        let num_txns = transactions.len();
        let num_workers = self.concurrency_level.min(num_txns).max(1);
        let timer = EXECUTION_SECONDS
            .with_label_values(&["parallel"])
            .start_timer();

        let next_idx = AtomicUsize::new(0);
        let num_executed = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let first_error: Mutex<Option<ExecutionError<E::Error>>> = Mutex::new(None);
        let record_error = |error: ExecutionError<E::Error>| {
            stop.store(true, Ordering::Release);
            let mut first_error = first_error.lock();
            if first_error.is_none() {
                *first_error = Some(error);
            }
        };

        debug!(
            address = ?state_object.address(),
            epoch = state_object.epoch(),
            num_workers,
            num_txns,
            "Launching workers"
        );
        scope(|s| {
            for _ in 0..num_workers {
                s.spawn(|_| {
                    // Registration lasts until the worker returns, so the join
                    // of the scope orders every residual before the merge.
                    let view = match state_object.register_writer() {
                        Ok(guard) => ParallelWriter::new(guard),
                        Err(err) => {
                            record_error(err.into());
                            return;
                        },
                    };
                    while !stop.load(Ordering::Acquire) {
                        let index = next_idx.fetch_add(1, Ordering::Relaxed);
                        if index >= num_txns {
                            break;
                        }
                        match task.execute_transaction(&view, &transactions[index]) {
                            Ok(()) => {
                                num_executed.fetch_add(1, Ordering::Relaxed);
                            },
                            Err(error) => {
                                record_error(ExecutionError::UserError { index, error });
                                break;
                            },
                        }
                    }
                });
            }
        });
        timer.observe_duration();

        let num_executed = num_executed.into_inner();
        EXECUTED_TRANSACTIONS
            .with_label_values(&["parallel"])
            .inc_by(num_executed as u64);

        if let Some(error) = first_error.into_inner() {
            ABORTED_EPOCHS.with_label_values(&["parallel"]).inc();
            warn!(
                address = ?state_object.address(),
                num_executed,
                error = ?error,
                "Parallel execution aborted"
            );
            return Err(error);
        }
        if num_executed != num_txns {
            return Err(ExecutionError::InvariantViolation(format!(
                "executed {} of {} transactions without an error",
                num_executed, num_txns
            )));
        }

        info!(
            address = ?state_object.address(),
            epoch = state_object.epoch(),
            num_executed,
            pending_residuals = state_object.num_pending_residuals(),
            "Parallel execution finished"
        );
        Ok(QuiescentEpoch {
            state_object,
            num_executed,
        })
    }
}
