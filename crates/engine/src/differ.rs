// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config diffing between the last-known and current desired state.
//!
//! Two wants are equal iff type, labels, params, and `using` agree.
//! Comparison goes through a canonical serialization; the underlying maps
//! are ordered, so map-order differences can never produce spurious
//! updates.

use reach_core::{Config, WantConfig};
use serde::Serialize;
use tracing::warn;

/// One change between two configs, keyed by want name.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Add(WantConfig),
    Update(WantConfig),
    Delete(WantConfig),
}

impl ChangeEvent {
    pub fn name(&self) -> &str {
        match self {
            ChangeEvent::Add(w) | ChangeEvent::Update(w) | ChangeEvent::Delete(w) => w.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Add(_) => "add",
            ChangeEvent::Update(_) => "update",
            ChangeEvent::Delete(_) => "delete",
        }
    }
}

fn fingerprint<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// True when both configs describe the same desired state. IDs, owner
/// references, and status are deliberately ignored.
pub fn same_desired_state(a: &WantConfig, b: &WantConfig) -> bool {
    a.metadata.type_name == b.metadata.type_name
        && a.metadata.labels == b.metadata.labels
        && fingerprint(&a.spec.params) == fingerprint(&b.spec.params)
        && fingerprint(&a.spec.using) == fingerprint(&b.spec.using)
}

/// Compute Add/Update/Delete events between two configs. One event per
/// affected name; duplicated names keep their first occurrence.
pub fn diff_configs(last: &Config, current: &Config) -> Vec<ChangeEvent> {
    let last_by_name = last.by_name();
    let current_by_name = current.by_name();

    if current.wants.len() != current_by_name.len() {
        warn!(
            dropped = current.wants.len() - current_by_name.len(),
            "config contains duplicate want names, extras ignored"
        );
    }

    let mut events = Vec::new();
    for (name, want) in &current_by_name {
        match last_by_name.get(name) {
            None => events.push(ChangeEvent::Add((*want).clone())),
            Some(previous) if !same_desired_state(previous, want) => {
                events.push(ChangeEvent::Update((*want).clone()));
            }
            Some(_) => {}
        }
    }
    for (name, want) in &last_by_name {
        if !current_by_name.contains_key(name) {
            events.push(ChangeEvent::Delete((*want).clone()));
        }
    }
    events
}

#[cfg(test)]
#[path = "differ_tests.rs"]
mod tests;
