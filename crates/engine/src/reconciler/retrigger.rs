// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion retrigger: when a provider reaches Achieved, reset its
//! users to Idle so the next Start phase re-runs them against the fresh
//! output. Users are found through the label-to-users reverse index built
//! by Connect; the per-key index over-approximates, so each candidate is
//! re-checked against the full selector.

use super::EngineState;
use reach_core::{label_key, selector_matches, Clock, Event, WantStatus};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) fn retrigger_users<C: Clock>(state: &Arc<EngineState>, clock: &C, provider: &str) {
    let Some(provider_want) = state.registry.read().get(provider) else {
        return;
    };
    let labels = provider_want.labels();

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    {
        let index = state.label_users.lock();
        for (key, value) in &labels {
            if let Some(users) = index.get(&label_key(key, value)) {
                for user in users {
                    if seen.insert(user.clone()) {
                        candidates.push(user.clone());
                    }
                }
            }
        }
    }

    let now_ms = clock.epoch_ms();
    let mut any_reset = false;
    for user_name in candidates {
        if user_name == provider {
            continue;
        }
        let Some(user) = state.registry.read().get(&user_name) else {
            continue;
        };
        if !user.merged_using().iter().any(|s| selector_matches(&labels, s)) {
            continue;
        }
        if !user.should_retrigger() {
            continue;
        }
        if !user.consume_retrigger_budget(now_ms) {
            warn!(want = %user_name, "retrigger budget exhausted, dropping");
            continue;
        }

        let previous = user.set_status(WantStatus::Idle);
        if previous != WantStatus::Idle {
            state.hub.emit(&Event::StatusChanged {
                id: user.id(),
                name: user_name.clone(),
                from: previous,
                to: WantStatus::Idle,
            });
        }
        info!(provider, user = %user_name, "retriggering consumer after completion");
        any_reset = true;
    }

    if any_reset {
        // Queue the reconcile that relaunches the reset users. Best
        // effort; the next periodic cycle recovers a dropped trigger.
        let _ = state.trigger_tx.try_send(super::TriggerCommand::Reconcile);
    }
}

#[cfg(test)]
#[path = "retrigger_tests.rs"]
mod tests;
