// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compile phase: apply config changes to the registry.
//!
//! Diffs the desired state against the last-known config, applies the
//! events sink-first, and stores a deep copy as the new last-known. A
//! failing factory never aborts the cycle; it leaves a Failed placeholder
//! want carrying the error in its state.

use super::{delete_want_by_id, EngineState};
use crate::differ::{diff_configs, ChangeEvent};
use crate::levels::{dependency_levels, sort_sink_first};
use crate::paths::PathSeed;
use crate::registry::RuntimeWant;
use reach_core::{Clock, Config, Event, WantConfig, WantId, WantStatus};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) fn compile<C: Clock>(state: &Arc<EngineState>, clock: &C) {
    let desired = state.desired.lock().clone();
    let last = state.last_known.lock().clone();

    let mut events: Vec<ChangeEvent> = if last.is_empty() {
        desired.by_name().into_values().map(|w| ChangeEvent::Add(w.clone())).collect()
    } else {
        diff_configs(&last, &desired)
    };

    if !events.is_empty() {
        let seeds: Vec<PathSeed> = desired
            .by_name()
            .into_values()
            .map(|w| PathSeed {
                name: w.name().to_string(),
                labels: w.metadata.labels.clone(),
                using: w.spec.using.clone(),
            })
            .collect();
        let levels = dependency_levels(&seeds);
        sort_sink_first(&mut events, &levels);

        debug!(events = events.len(), "compiling config changes");
        for event in events {
            match event {
                ChangeEvent::Add(config) => apply_add(state, clock, config),
                ChangeEvent::Update(config) => apply_update(state, clock, config),
                ChangeEvent::Delete(config) => apply_delete(state, config),
            }
        }
    }

    // Write assigned ids back into the desired entries, then deep-copy it
    // as the new last-known config.
    let synced = sync_ids_into_desired(state);
    *state.last_known.lock() = synced;
}

fn apply_add<C: Clock>(state: &Arc<EngineState>, clock: &C, mut config: WantConfig) {
    let name = config.name().to_string();
    if state.registry.read().get(&name).is_some() {
        // Invariant: a second add under a live name is silently dropped.
        warn!(want = %name, "add for existing want dropped");
        return;
    }

    let mut failure: Option<String> = None;

    match config.metadata.id.clone() {
        Some(id) if state.registry.read().contains_id(&id) => {
            failure = Some(format!("duplicate want id '{}'", id));
            // Placeholder still needs a unique id.
            config.metadata.id = Some(WantId::generate());
        }
        Some(_) => {}
        None => config.metadata.id = Some(WantId::generate()),
    }

    let runner = if failure.is_none() {
        match state.types.get(&config.metadata.type_name) {
            None => {
                failure = Some(format!("unknown want type '{}'", config.metadata.type_name));
                None
            }
            Some(want_type) => match want_type.build(&config.metadata, &config.spec) {
                Ok(runner) => Some(runner),
                Err(e) => {
                    failure = Some(e.to_string());
                    None
                }
            },
        }
    } else {
        None
    };

    let params = config.spec.params.clone();
    let want = RuntimeWant::new(config, runner);
    want.state.record_params(&name, &params, clock.epoch_ms());
    init_subscription(state, &want);

    if let Some(message) = failure {
        warn!(want = %name, error = %message, "compile failed, inserting failed placeholder");
        want.state.store("error", json!(message));
        want.set_status(WantStatus::Failed);
    } else {
        info!(want = %name, id = %want.id().short(12), type_name = %want.type_name(), "want added");
    }

    state.registry.write().register(want);
}

fn apply_update<C: Clock>(state: &Arc<EngineState>, clock: &C, config: WantConfig) {
    let found = {
        let registry = state.registry.read();
        // Updates are keyed by id when the config carries one, by name
        // otherwise (file-based configs usually omit ids).
        match config.id() {
            Some(id) => registry.find_by_id(id),
            None => registry.get(config.name()).map(|w| {
                let name = w.name();
                (w, name)
            }),
        }
    };
    let Some((want, old_name)) = found else {
        warn!(want = config.name(), "update for unknown want dropped");
        return;
    };

    info!(want = %old_name, "applying update, resetting to idle for rewire");

    // Stop the old wiring before anything else progresses against it.
    want.cancel_progression();
    want.sync_config(&config, clock.epoch_ms());

    // Drop the updated want's own edges from the reuse index so Connect
    // rebuilds them; edges between untouched wants keep their buffers.
    {
        let out_prefix = format!("{}_to_", old_name);
        let in_suffix = format!("_to_{}", old_name);
        state.edges.lock().retain(|edge, _| {
            !edge.starts_with(&out_prefix) && !edge.ends_with(&in_suffix)
        });
    }

    // Re-index under the possibly changed name.
    {
        let mut registry = state.registry.write();
        registry.unregister(&old_name);
        registry.register(Arc::clone(&want));
    }

    let previous = want.set_status(WantStatus::Idle);
    if previous != WantStatus::Idle {
        state.hub.emit(&Event::StatusChanged {
            id: want.id(),
            name: want.name(),
            from: previous,
            to: WantStatus::Idle,
        });
    }
}

fn apply_delete(state: &Arc<EngineState>, config: WantConfig) {
    let id = match config.id() {
        Some(id) => Some(id.clone()),
        None => state.registry.read().get(config.name()).map(|w| w.id()),
    };
    match id {
        Some(id) => {
            delete_want_by_id(state, &id);
        }
        None => warn!(want = config.name(), "delete for unknown want skipped"),
    }
}

/// Wire a want's notification inbox to the hub, honoring its filters.
/// Events are relevant when they concern this want (completions of its
/// children) or a provider it subscribed to.
fn init_subscription(state: &Arc<EngineState>, want: &Arc<RuntimeWant>) {
    let kinds = want.notification_kinds();
    let self_id = want.id();
    let watched: BTreeSet<String> = want
        .config_snapshot()
        .spec
        .state_subscriptions
        .keys()
        .cloned()
        .collect();
    let weak = Arc::downgrade(want);

    let subscription = state.hub.subscribe(kinds, move |event| {
        let Some(want) = weak.upgrade() else {
            return;
        };
        let relevant = match event {
            Event::OwnerCompleted { owner, .. } => owner == &self_id,
            Event::StatusChanged { name, .. } | Event::ParameterUpdated { name, .. } => {
                watched.contains(name)
            }
        };
        if relevant {
            want.push_notification(event.clone());
        }
    });
    want.set_subscription(subscription);
}

/// Copy registry-assigned ids onto the desired entries (matched by name)
/// and return the resulting deep copy.
fn sync_ids_into_desired(state: &Arc<EngineState>) -> Config {
    let registry = state.registry.read();
    let mut desired = state.desired.lock();
    for entry in &mut desired.wants {
        if entry.metadata.id.is_none() {
            if let Some(want) = registry.get(entry.name()) {
                entry.metadata.id = Some(want.id());
            }
        }
    }
    desired.clone()
}

#[cfg(test)]
#[path = "compile_tests.rs"]
mod tests;
