// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn store_outside_cycle_applies_immediately() {
    let state = WantState::new();
    state.store("count", json!(1));
    assert_eq!(state.get("count"), Some(json!(1)));
    assert!(state.state_history().is_empty());
}

#[test]
fn staged_writes_invisible_until_end_cycle() {
    let state = WantState::new();
    state.begin_cycle();
    state.store("count", json!(1));
    assert_eq!(state.get("count"), None);
    state.end_cycle("w", 100);
    assert_eq!(state.get("count"), Some(json!(1)));
}

#[test]
fn one_history_entry_per_changed_cycle() {
    let state = WantState::new();
    state.begin_cycle();
    state.store("a", json!(1));
    state.store("b", json!(2));
    state.end_cycle("w", 100);

    let history = state.state_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state_value.len(), 2);
    assert_eq!(history[0].timestamp, 100);
    assert_eq!(history[0].want_name, "w");
}

#[test]
fn unchanged_cycle_appends_nothing() {
    let state = WantState::new();
    state.begin_cycle();
    state.store("a", json!(1));
    state.end_cycle("w", 100);

    // Same value stored again: differential drops it, no new entry.
    state.begin_cycle();
    state.store("a", json!(1));
    state.end_cycle("w", 200);

    // Empty cycle: nothing staged, no new entry.
    state.begin_cycle();
    state.end_cycle("w", 300);

    assert_eq!(state.state_history().len(), 1);
}

#[test]
fn adjacent_history_entries_always_differ() {
    let state = WantState::new();
    for i in 0..10 {
        state.begin_cycle();
        state.store("i", json!(i / 2));
        state.end_cycle("w", i as u64);
    }
    let history = state.state_history();
    for pair in history.windows(2) {
        assert_ne!(pair[0].state_value, pair[1].state_value);
    }
}

#[test]
fn state_history_is_capped() {
    let state = WantState::new();
    for i in 0..(STATE_HISTORY_CAP + 20) {
        state.begin_cycle();
        state.store("i", json!(i));
        state.end_cycle("w", i as u64);
    }
    let history = state.state_history();
    assert_eq!(history.len(), STATE_HISTORY_CAP);
    // Oldest entries were evicted first.
    assert_eq!(history[0].state_value["i"], json!(20));
}

#[test]
fn parameter_history_is_capped_and_differential() {
    let state = WantState::new();
    let mut params = Params::new();
    for i in 0..(PARAMETER_HISTORY_CAP + 5) {
        params.insert("rate".to_string(), json!(i));
        state.record_params("w", &params, i as u64);
        // Recording the identical snapshot again must be a no-op.
        state.record_params("w", &params, i as u64 + 1);
    }
    let history = state.parameter_history();
    assert_eq!(history.len(), PARAMETER_HISTORY_CAP);
    assert_eq!(history[0].state_value["rate"], json!(5));
}

#[test]
fn staged_value_compared_against_pending_write() {
    let state = WantState::new();
    state.begin_cycle();
    state.store("k", json!("a"));
    state.store("k", json!("a"));
    state.store("k", json!("b"));
    state.end_cycle("w", 1);
    assert_eq!(state.get("k"), Some(json!("b")));
    assert_eq!(state.state_history().len(), 1);
}
