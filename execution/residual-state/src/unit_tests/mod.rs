// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{AccountStateObject, EpochState, MergeSummary, StateObjectError};
use claims::{assert_err, assert_matches, assert_ok, assert_ok_eq};
use primitive_types::H160;
use proptest::prelude::*;
use rand::{seq::SliceRandom, thread_rng};
use residual_aggregator::{
    residual_delta::{residual_add, residual_sub},
    resolver::{SlotReadMode, SlotResolver},
    FixedValue, ResidualDelta, ResidualOp,
};
use residual_config::config::ResidualStateConfig;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Barrier,
    },
    thread,
};
use test_case::test_case;

fn v(value: u64) -> FixedValue {
    FixedValue::from_u64(value)
}

fn hex(literal: &str) -> FixedValue {
    FixedValue::from_hex_literal(literal).unwrap()
}

fn new_state_object() -> AccountStateObject {
    AccountStateObject::new(H160::repeat_byte(0xab), ResidualStateConfig::default())
}

fn state_object_with(slot: FixedValue, value: FixedValue) -> AccountStateObject {
    AccountStateObject::with_storage(
        H160::repeat_byte(0xab),
        ResidualStateConfig::default(),
        vec![(slot, value)],
    )
}

fn append_all(state_object: &AccountStateObject, slot: FixedValue, residuals: &[ResidualDelta]) {
    for delta in residuals {
        assert_ok!(state_object.set_residual_state(slot, delta.magnitude(), delta.op()));
    }
}

#[test]
fn merge_from_zero_base_is_order_independent() {
    let slot = hex("1");
    let residuals = [residual_add(2), residual_add(1), residual_sub(1)];

    let mut rng = thread_rng();
    for _ in 0..10 {
        let mut shuffled = residuals.to_vec();
        shuffled.shuffle(&mut rng);

        let state_object = new_state_object();
        append_all(&state_object, slot, &shuffled);
        assert_ok!(state_object.merge_residual_state());
        assert_eq!(state_object.get_state(&slot), v(2));
    }
}

#[test]
fn empty_merge_leaves_values_untouched() {
    let slot = hex("1");
    let state_object = state_object_with(slot, hex("2"));

    assert_ok_eq!(state_object.merge_residual_state(), MergeSummary {
        epoch: 0,
        slots_merged: 0,
        residuals_applied: 0,
    });
    assert_eq!(state_object.get_state(&slot), hex("2"));
    assert!(!state_object.is_dirty(&slot));
    assert_eq!(state_object.epoch(), 1);
}

#[test]
fn slot_only_in_queue_merges_against_zero() {
    let slot = hex("a");
    let state_object = new_state_object();
    assert_ok!(state_object.set_residual_state(slot, hex("1"), true));
    assert_eq!(state_object.get_committed_state(&slot), None);

    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_committed_state(&slot), Some(hex("1")));
    assert!(state_object.is_dirty(&slot));

    assert_ok!(state_object.set_residual_state(slot, hex("1"), true));
    assert_ok!(state_object.set_residual_state(slot, hex("1"), true));
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&slot), hex("3"));
}

#[test]
fn merge_wraps_below_zero() {
    let slot = hex("1");
    let state_object = new_state_object();
    assert_ok!(state_object.set_residual_state(slot, hex("1"), ResidualOp::Sub));
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&slot), FixedValue::MAX);

    assert_ok!(state_object.set_residual_state(slot, hex("2"), ResidualOp::Add));
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&slot), hex("1"));
}

#[test]
fn direct_write_survives_empty_merge() {
    let slot = hex("1");
    let state_object = state_object_with(slot, hex("2"));
    assert_ok!(state_object.set_state(slot, hex("7")));
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&slot), hex("7"));
    assert!(state_object.is_dirty(&slot));
}

#[test]
fn merge_builds_on_direct_write() {
    let slot = hex("1");
    let state_object = new_state_object();
    assert_ok!(state_object.set_state(slot, hex("10")));
    append_all(&state_object, slot, &[residual_add(5), residual_sub(1)]);
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&slot), v(20));
}

#[test]
fn merge_touches_only_queued_slots() {
    let state_object = AccountStateObject::with_storage(
        H160::zero(),
        ResidualStateConfig::default(),
        vec![(v(1), v(100)), (v(2), v(200)), (v(3), v(300))],
    );
    append_all(&state_object, v(1), &[residual_add(1)]);
    append_all(&state_object, v(3), &[residual_sub(1), residual_sub(1)]);

    let summary = state_object.merge_residual_state().unwrap();
    assert_eq!(summary.slots_merged, 2);
    assert_eq!(summary.residuals_applied, 3);
    assert_eq!(state_object.dirty_slots(), vec![v(1), v(3)]);
    assert_eq!(state_object.take_dirty_storage(), vec![(v(1), v(101)), (v(3), v(298))]);
    assert!(state_object.dirty_slots().is_empty());
    assert_eq!(state_object.get_state(&v(2)), v(200));
    assert_eq!(state_object.num_pending_residuals(), 0);
}

#[test]
fn end_to_end_three_workers() {
    let slot = hex("0x01");
    let state_object = state_object_with(slot, hex("0x02"));
    let residuals = [
        (hex("0x01"), true),
        (hex("0x02"), true),
        (hex("0x01"), false),
    ];

    let start = Barrier::new(residuals.len());
    thread::scope(|s| {
        for (magnitude, is_add) in residuals {
            let state_object = &state_object;
            let start = &start;
            s.spawn(move || {
                start.wait();
                state_object
                    .set_residual_state(slot, magnitude, is_add)
                    .unwrap();
            });
        }
    });

    assert_eq!(state_object.pending_residuals(&slot), 3);
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&slot), hex("0x04"));
}

#[test_case(1)]
#[test_case(10)]
#[test_case(100)]
#[test_case(1000)]
fn concurrent_accumulation(num_writers: u64) {
    let slot = hex("1");
    let state_object = state_object_with(slot, hex("2"));

    thread::scope(|s| {
        for _ in 0..num_writers {
            s.spawn(|| {
                state_object
                    .set_residual_state(slot, hex("1"), true)
                    .unwrap();
            });
        }
    });

    let summary = state_object.merge_residual_state().unwrap();
    assert_eq!(summary.residuals_applied as u64, num_writers);
    assert_eq!(state_object.get_state(&slot), v(2 + num_writers));
}

#[test]
fn concurrent_accumulation_on_many_slots() {
    let num_slots = 16u64;
    let state_object = new_state_object();

    rayon::scope(|s| {
        for worker in 0..64u64 {
            let state_object = &state_object;
            s.spawn(move |_| {
                let writer = state_object.register_writer().unwrap();
                for slot in 0..num_slots {
                    let op = if (worker + slot) % 4 == 0 {
                        ResidualOp::Sub
                    } else {
                        ResidualOp::Add
                    };
                    writer.set_residual_state(v(slot), v(slot + 1), op).unwrap();
                }
            });
        }
    });

    assert_eq!(state_object.active_writers(), 0);
    assert_ok!(state_object.merge_residual_state());
    for slot in 0..num_slots {
        let subtractions = (0..64u64).filter(|w| (w + slot) % 4 == 0).count() as u64;
        let additions = 64 - subtractions;
        let expected = v(additions * (slot + 1)).wrapping_sub(&v(subtractions * (slot + 1)));
        assert_eq!(state_object.get_state(&v(slot)), expected);
    }
}

#[test]
fn merge_refused_while_writers_registered() {
    let slot = hex("1");
    let state_object = new_state_object();
    let writer = state_object.register_writer().unwrap();
    assert_ok!(writer.set_residual_state(slot, hex("1"), true));

    assert_matches!(
        state_object.merge_residual_state(),
        Err(StateObjectError::InvalidState {
            operation: "merge_residual_state",
            state: EpochState::Open,
            active_writers: 1,
        })
    );
    assert_eq!(state_object.state(), EpochState::Open);
    assert_eq!(state_object.pending_residuals(&slot), 1);

    drop(writer);
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&slot), hex("1"));
}

#[test]
fn merge_without_quiescence_check() {
    let state_object = AccountStateObject::new(H160::zero(), ResidualStateConfig {
        enforce_quiescence: false,
        ..Default::default()
    });
    let writer = state_object.register_writer().unwrap();
    assert_ok!(writer.set_residual_state(v(1), v(4), true));
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&v(1)), v(4));
}

#[test]
fn queue_capacity_from_config() {
    let state_object = AccountStateObject::new(H160::zero(), ResidualStateConfig {
        max_residuals_per_slot: 2,
        ..Default::default()
    });
    assert_ok!(state_object.set_residual_state(v(1), v(1), true));
    assert_ok!(state_object.set_residual_state(v(1), v(1), true));
    assert_matches!(
        state_object.set_residual_state(v(1), v(1), true),
        Err(StateObjectError::QueueCapacityExceeded { limit: 2, .. })
    );
    assert_eq!(state_object.active_writers(), 0);

    // The limit applies per epoch.
    assert_ok!(state_object.merge_residual_state());
    assert_ok!(state_object.set_residual_state(v(1), v(1), true));
}

#[test]
fn close_is_terminal() {
    let slot = hex("1");
    let state_object = new_state_object();
    assert_ok!(state_object.set_residual_state(slot, hex("1"), true));
    assert_matches!(
        state_object.close(),
        Err(StateObjectError::UnmergedResiduals {
            slots: 1,
            residuals: 1
        })
    );
    assert_eq!(state_object.state(), EpochState::Open);

    assert_ok!(state_object.merge_residual_state());
    assert_ok!(state_object.close());
    assert_eq!(state_object.state(), EpochState::Closed);

    assert_err!(state_object.set_state(slot, hex("2")));
    assert_matches!(
        state_object.set_residual_state(slot, hex("1"), true),
        Err(StateObjectError::InvalidState {
            state: EpochState::Closed,
            ..
        })
    );
    assert_err!(state_object.merge_residual_state());
    assert_err!(state_object.close());
    assert_eq!(state_object.get_state(&slot), hex("1"));
}

#[test]
fn close_refused_while_writers_registered() {
    let state_object = new_state_object();
    let writer = state_object.register_writer().unwrap();
    assert_matches!(
        state_object.close(),
        Err(StateObjectError::InvalidState { operation: "close", .. })
    );
    drop(writer);
    assert_ok!(state_object.close());
}

#[test]
fn refused_merges_do_not_reject_concurrent_writers() {
    let num_appends = 20_000;
    let slot = v(1);
    let state_object = new_state_object();
    // Keeps every merge of the epoch refused.
    let registered = state_object.register_writer().unwrap();

    let done = AtomicBool::new(false);
    let refused_merges = AtomicUsize::new(0);
    let rejected_appends = AtomicUsize::new(0);
    thread::scope(|s| {
        s.spawn(|| loop {
            if state_object.merge_residual_state().is_err() {
                refused_merges.fetch_add(1, Ordering::Relaxed);
            }
            if done.load(Ordering::Acquire) {
                break;
            }
        });
        s.spawn(|| {
            for _ in 0..num_appends {
                if state_object.set_residual_state(slot, v(1), true).is_err() {
                    rejected_appends.fetch_add(1, Ordering::Relaxed);
                }
            }
            done.store(true, Ordering::Release);
        });
    });

    assert_eq!(rejected_appends.load(Ordering::Relaxed), 0);
    assert!(refused_merges.load(Ordering::Relaxed) > 0);
    assert_eq!(state_object.epoch(), 0);
    assert_eq!(state_object.state(), EpochState::Open);
    assert_eq!(state_object.pending_residuals(&slot), num_appends);

    drop(registered);
    assert_ok!(state_object.merge_residual_state());
    assert_eq!(state_object.get_state(&slot), v(num_appends as u64));
}

#[test]
fn refused_closes_do_not_reject_concurrent_writes() {
    let num_writes = 10_000u64;
    let state_object = new_state_object();
    // An unmerged residual keeps every close refused.
    assert_ok!(state_object.set_residual_state(v(9), v(1), true));

    let done = AtomicBool::new(false);
    let rejected_writes = AtomicUsize::new(0);
    thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                assert_err!(state_object.close());
            }
        });
        s.spawn(|| {
            for i in 0..num_writes {
                if state_object.set_state(v(2), v(i)).is_err() {
                    rejected_writes.fetch_add(1, Ordering::Relaxed);
                }
                if state_object.set_residual_state(v(1), v(1), true).is_err() {
                    rejected_writes.fetch_add(1, Ordering::Relaxed);
                }
            }
            done.store(true, Ordering::Release);
        });
    });

    assert_eq!(rejected_writes.load(Ordering::Relaxed), 0);
    assert_eq!(state_object.state(), EpochState::Open);
    assert_eq!(state_object.get_state(&v(2)), v(num_writes - 1));
    assert_eq!(state_object.pending_residuals(&v(1)), num_writes as usize);

    assert_ok!(state_object.merge_residual_state());
    assert_ok!(state_object.close());
    assert_err!(state_object.set_state(v(2), v(0)));
}

#[test]
fn merges_interleaved_with_writers_lose_nothing() {
    let num_writers = 4;
    let appends_per_writer = 5_000u64;
    let slot = v(1);
    let state_object = new_state_object();

    let finished_writers = AtomicUsize::new(0);
    let completed_merges = AtomicUsize::new(0);
    thread::scope(|s| {
        s.spawn(|| {
            while finished_writers.load(Ordering::Acquire) < num_writers {
                if state_object.merge_residual_state().is_ok() {
                    completed_merges.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
        for _ in 0..num_writers {
            s.spawn(|| {
                for _ in 0..appends_per_writer {
                    state_object
                        .set_residual_state(slot, v(1), true)
                        .unwrap();
                }
                finished_writers.fetch_add(1, Ordering::Release);
            });
        }
    });

    assert_ok!(state_object.merge_residual_state());
    assert_eq!(
        state_object.get_state(&slot),
        v(num_writers as u64 * appends_per_writer)
    );
    assert_eq!(
        state_object.epoch(),
        completed_merges.load(Ordering::Relaxed) as u64 + 1
    );
    assert_eq!(state_object.num_pending_residuals(), 0);
}

#[test]
fn aggregated_read_does_not_consume_queue() {
    let slot = hex("1");
    let state_object = state_object_with(slot, hex("2"));
    append_all(&state_object, slot, &[residual_add(3), residual_sub(1)]);

    assert_eq!(
        state_object.resolve_slot_value(&slot, SlotReadMode::LastCommitted),
        v(2)
    );
    assert_eq!(
        state_object.resolve_slot_value(&slot, SlotReadMode::Aggregated),
        v(4)
    );
    assert_eq!(state_object.pending_residuals(&slot), 2);

    assert_ok!(state_object.merge_residual_state());
    assert_eq!(
        state_object.resolve_slot_value(&slot, SlotReadMode::LastCommitted),
        v(4)
    );
}

#[test]
fn epochs_advance_with_merges() {
    let state_object = new_state_object();
    for epoch in 0..3 {
        assert_ok!(state_object.set_residual_state(v(1), v(1), true));
        assert_eq!(state_object.merge_residual_state().unwrap().epoch, epoch);
    }
    assert_eq!(state_object.epoch(), 3);
    assert_eq!(state_object.get_state(&v(1)), v(3));
}

fn arb_residual() -> impl Strategy<Value = ResidualDelta> {
    (any::<u64>(), any::<bool>())
        .prop_map(|(magnitude, is_add)| ResidualDelta::new(v(magnitude), is_add.into()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn concurrent_merge_matches_sequential_fold(
        base in any::<u64>(),
        residuals in prop::collection::vec(arb_residual(), 0..64),
        num_workers in 1usize..8,
    ) {
        let slot = v(7);
        let state_object = state_object_with(slot, v(base));

        thread::scope(|s| {
            for chunk in residuals.chunks(residuals.len().div_ceil(num_workers).max(1)) {
                let state_object = &state_object;
                s.spawn(move || append_all(state_object, slot, chunk));
            }
        });

        state_object.merge_residual_state().unwrap();
        prop_assert_eq!(
            state_object.get_state(&slot),
            residual_aggregator::fold_residuals(v(base), &residuals)
        );
    }
}
