// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connect phase: wire the topology.
//!
//! Rebuilds the parameter routes of target controllers, runs the
//! auto-connection heuristic for recipe siblings, regenerates paths from
//! the current registry (reusing surviving channels), writes the paths
//! into each want, and rebuilds the channel and label-to-users indices.

use super::EngineState;
use crate::paths::{generate_paths, PathSeed};
use crate::registry::RuntimeWant;
use reach_core::{label_key, Selector, WantId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub(crate) fn connect(state: &Arc<EngineState>) {
    let wants = state.registry.read().snapshot();

    rebuild_param_routes(state, &wants);
    infer_auto_connections(state, &wants);

    // Regenerate paths, reusing channels from the previous generation.
    let seeds: Vec<PathSeed> = wants
        .iter()
        .map(|w| PathSeed { name: w.name(), labels: w.labels(), using: w.merged_using() })
        .collect();
    let prior = state.edges.lock().clone();
    let mut generated = generate_paths(&seeds, &prior);

    for want in &wants {
        let paths = generated.paths.remove(&want.name()).unwrap_or_default();
        want.set_paths(paths);
    }
    debug!(edges = generated.edges.len(), wants = wants.len(), "topology connected");
    *state.edges.lock() = generated.edges;

    rebuild_label_users(state, &wants);
}

/// Controller owner id -> child names, consumed by parameter pushes.
fn rebuild_param_routes(state: &Arc<EngineState>, wants: &[Arc<RuntimeWant>]) {
    let mut routes: HashMap<WantId, Vec<String>> = HashMap::new();
    for want in wants {
        let config = want.config_snapshot();
        for reference in &config.metadata.owner_references {
            if reference.controller {
                routes.entry(reference.id.clone()).or_default().push(want.name());
            }
        }
    }
    for children in routes.values_mut() {
        children.sort();
    }
    *state.param_routes.lock() = routes;
}

/// Auto-connection heuristic: recipe siblings (wants sharing a controller
/// owner) chain in name order. A child that needs inputs but declares no
/// `using` gets an inferred selector equal to the previous sibling's
/// labels. Inferred selectors never touch the user-declared config.
fn infer_auto_connections(state: &Arc<EngineState>, wants: &[Arc<RuntimeWant>]) {
    // Inferred wiring is recomputed from scratch every cycle.
    for want in wants {
        want.set_inferred_using(Vec::new());
    }

    let mut groups: HashMap<WantId, Vec<&Arc<RuntimeWant>>> = HashMap::new();
    for want in wants {
        let config = want.config_snapshot();
        for reference in &config.metadata.owner_references {
            if reference.controller {
                groups.entry(reference.id.clone()).or_default().push(want);
            }
        }
    }

    for siblings in groups.values() {
        // Registry snapshots are name-sorted already; keep that order.
        for pair in siblings.windows(2) {
            let (previous, child) = (&pair[0], &pair[1]);
            let needs_inputs = state
                .types
                .get(&child.type_name())
                .is_some_and(|t| t.connectivity.required_inputs > 0);
            if !needs_inputs || !child.config_snapshot().spec.using.is_empty() {
                continue;
            }
            let labels = previous.labels();
            if labels.is_empty() {
                continue;
            }
            let selector: Selector = labels.into_iter().collect();
            debug!(
                child = %child.name(),
                provider = %previous.name(),
                "auto-connecting recipe sibling"
            );
            child.set_inferred_using(vec![selector]);
        }
    }
}

/// Reverse index `key=value` -> user want names, used by the completion
/// retrigger to avoid scanning the registry on every Achieved transition.
fn rebuild_label_users(state: &Arc<EngineState>, wants: &[Arc<RuntimeWant>]) {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for want in wants {
        let name = want.name();
        for selector in want.merged_using() {
            for (key, value) in &selector {
                let users = index.entry(label_key(key, value)).or_default();
                if !users.contains(&name) {
                    users.push(name.clone());
                }
            }
        }
    }
    *state.label_users.lock() = index;
}

#[cfg(test)]
#[path = "connect_tests.rs"]
mod tests;
