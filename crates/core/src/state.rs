// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-want runtime state with differential, capped histories.
//!
//! All mutation goes through [`WantState`] under its own mutex. During a
//! progress cycle, writes are staged and committed as one batch at the end
//! of the cycle; at most one history entry is appended per cycle, and only
//! when the committed snapshot differs from the previous entry.

use crate::want::Params;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// Maximum retained state history entries per want.
pub const STATE_HISTORY_CAP: usize = 100;

/// Maximum retained parameter history entries per want.
pub const PARAMETER_HISTORY_CAP: usize = 50;

/// One recorded snapshot of a want's state or parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub want_name: String,
    pub state_value: BTreeMap<String, Value>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

#[derive(Default)]
struct StateInner {
    values: BTreeMap<String, Value>,
    /// Staged writes for the cycle currently in progress; `None` outside a
    /// begin/end pair.
    pending: Option<BTreeMap<String, Value>>,
    state_history: VecDeque<HistoryEntry>,
    parameter_history: VecDeque<HistoryEntry>,
}

/// Locked, differential state store for a single want.
#[derive(Default)]
pub struct WantState {
    inner: Mutex<StateInner>,
}

impl WantState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().values.get(key).cloned()
    }

    /// Copy of the live state map.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.inner.lock().values.clone()
    }

    /// Store a value. Inside a progress cycle the write is staged until
    /// [`WantState::end_cycle`]; outside a cycle it applies immediately.
    /// Differential: values equal to the one already visible are dropped.
    pub fn store(&self, key: &str, value: Value) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let current = inner
            .pending
            .as_ref()
            .and_then(|p| p.get(key))
            .or_else(|| inner.values.get(key));
        if current == Some(&value) {
            return;
        }
        match inner.pending.as_mut() {
            Some(pending) => {
                pending.insert(key.to_string(), value);
            }
            None => {
                inner.values.insert(key.to_string(), value);
            }
        }
    }

    /// Open a staging batch for one progress cycle.
    pub fn begin_cycle(&self) {
        let mut inner = self.inner.lock();
        if inner.pending.is_none() {
            inner.pending = Some(BTreeMap::new());
        }
    }

    /// Commit the staged batch atomically and append one history entry iff
    /// the resulting snapshot differs from the previous entry.
    pub fn end_cycle(&self, want_name: &str, now_ms: u64) {
        let mut inner = self.inner.lock();
        if let Some(staged) = inner.pending.take() {
            for (k, v) in staged {
                inner.values.insert(k, v);
            }
        }
        let snapshot = inner.values.clone();
        let unchanged = inner
            .state_history
            .back()
            .is_some_and(|last| last.state_value == snapshot);
        if unchanged || snapshot.is_empty() {
            return;
        }
        push_capped(
            &mut inner.state_history,
            HistoryEntry {
                want_name: want_name.to_string(),
                state_value: snapshot,
                timestamp: now_ms,
            },
            STATE_HISTORY_CAP,
        );
    }

    /// Record a parameter snapshot (initial load and later pushes).
    /// Differential like state history, capped at [`PARAMETER_HISTORY_CAP`].
    pub fn record_params(&self, want_name: &str, params: &Params, now_ms: u64) {
        let mut inner = self.inner.lock();
        let unchanged = inner
            .parameter_history
            .back()
            .is_some_and(|last| &last.state_value == params);
        if unchanged {
            return;
        }
        push_capped(
            &mut inner.parameter_history,
            HistoryEntry {
                want_name: want_name.to_string(),
                state_value: params.clone(),
                timestamp: now_ms,
            },
            PARAMETER_HISTORY_CAP,
        );
    }

    pub fn state_history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().state_history.iter().cloned().collect()
    }

    pub fn parameter_history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().parameter_history.iter().cloned().collect()
    }
}

fn push_capped(history: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, cap: usize) {
    if history.len() == cap {
        history.pop_front();
    }
    history.push_back(entry);
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
