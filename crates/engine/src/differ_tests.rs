// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use reach_core::test_support::want;
use serde_json::json;

fn config(wants: Vec<WantConfig>) -> Config {
    Config { wants }
}

#[test]
fn identical_configs_produce_no_events() {
    let a = config(vec![
        want("src", "source").label("role", "p").param("count", 1).build(),
        want("sink", "sink").using(&[("role", "p")]).build(),
    ]);
    assert!(diff_configs(&a, &a.clone()).is_empty());
}

#[test]
fn new_want_is_an_add() {
    let last = config(vec![want("src", "source").build()]);
    let current = config(vec![
        want("src", "source").build(),
        want("sink", "sink").build(),
    ]);
    let events = diff_configs(&last, &current);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ChangeEvent::Add(w) if w.name() == "sink"));
}

#[test]
fn removed_want_is_a_delete() {
    let last = config(vec![
        want("src", "source").build(),
        want("sink", "sink").build(),
    ]);
    let current = config(vec![want("src", "source").build()]);
    let events = diff_configs(&last, &current);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ChangeEvent::Delete(w) if w.name() == "sink"));
}

#[test]
fn changed_params_are_an_update() {
    let last = config(vec![want("src", "source").param("count", 1).build()]);
    let current = config(vec![want("src", "source").param("count", 2).build()]);
    let events = diff_configs(&last, &current);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ChangeEvent::Update(w) if w.name() == "src"));
}

#[test]
fn changed_labels_and_using_are_updates() {
    let last = config(vec![
        want("a", "source").label("role", "p").build(),
        want("b", "sink").using(&[("role", "p")]).build(),
    ]);
    let current = config(vec![
        want("a", "source").label("role", "q").build(),
        want("b", "sink").using(&[("role", "q")]).build(),
    ]);
    let events = diff_configs(&last, &current);
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| matches!(e, ChangeEvent::Update(_))));
}

#[test]
fn changed_type_is_an_update() {
    let last = config(vec![want("a", "source").build()]);
    let current = config(vec![want("a", "relay").build()]);
    let events = diff_configs(&last, &current);
    assert!(matches!(&events[0], ChangeEvent::Update(_)));
}

#[test]
fn id_and_owner_changes_do_not_trigger_updates() {
    let owner = reach_core::WantId::from_string("wnt-owner");
    let last = config(vec![want("a", "source").build()]);
    let current = config(vec![
        want("a", "source").id("wnt-assigned").owner(&owner, "parent").build(),
    ]);
    assert!(diff_configs(&last, &current).is_empty());
}

#[test]
fn duplicate_name_keeps_first() {
    let last = config(vec![]);
    let current = config(vec![
        want("twin", "source").param("count", 1).build(),
        want("twin", "sink").build(),
    ]);
    let events = diff_configs(&last, &current);
    assert_eq!(events.len(), 1);
    match &events[0] {
        ChangeEvent::Add(w) => {
            assert_eq!(w.metadata.type_name, "source");
            assert_eq!(w.spec.params.get("count"), Some(&json!(1)));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn same_desired_state_ignores_param_value_identity() {
    let a = want("x", "source").param("rate", json!({"b": 2, "a": 1})).build();
    let b = want("x", "source").param("rate", json!({"a": 1, "b": 2})).build();
    // Object keys land in ordered maps; insertion order is irrelevant.
    assert!(same_desired_state(&a, &b));
}

#[test]
fn event_accessors() {
    let e = ChangeEvent::Add(want("n", "t").build());
    assert_eq!(e.name(), "n");
    assert_eq!(e.kind(), "add");
}
