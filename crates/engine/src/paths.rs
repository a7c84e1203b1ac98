// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path generation from labels and `using` selectors.
//!
//! For every want and every selector in its `using` list, each matching
//! provider contributes one edge named `{provider}_to_{user}`. Channels
//! are reused from the previous generation by edge name, so a stable
//! topology keeps its buffers across reconcile cycles. Iteration is
//! name-sorted so positional indices into `inputs`/`outputs` are
//! reproducible for the same config.

use crate::channel::Edge;
use reach_core::{selector_matches, Labels, Selector};
use std::collections::HashMap;

/// One resolved endpoint of an edge.
#[derive(Debug, Clone)]
pub struct PathInfo {
    pub edge: Edge,
    /// Edge name, `{provider}_to_{user}`.
    pub name: String,
    /// Want on the other end: the provider for inputs, the user for outputs.
    pub peer: String,
    pub active: bool,
}

/// The resolved channel endpoints of a want after selector matching.
#[derive(Debug, Clone, Default)]
pub struct Paths {
    pub inputs: Vec<PathInfo>,
    pub outputs: Vec<PathInfo>,
}

impl Paths {
    pub fn active_inputs(&self) -> usize {
        self.inputs.iter().filter(|p| p.active).count()
    }

    pub fn active_outputs(&self) -> usize {
        self.outputs.iter().filter(|p| p.active).count()
    }
}

/// Canonical edge name for a provider/user pair.
pub fn edge_name(provider: &str, user: &str) -> String {
    format!("{}_to_{}", provider, user)
}

/// Per-want input to path generation: identity plus effective selectors
/// (user-declared `using` merged with inferred auto-connections).
#[derive(Debug, Clone)]
pub struct PathSeed {
    pub name: String,
    pub labels: Labels,
    pub using: Vec<Selector>,
}

/// Output of one path generation pass.
#[derive(Debug, Default)]
pub struct GeneratedPaths {
    /// Want name -> resolved paths.
    pub paths: HashMap<String, Paths>,
    /// Edge name -> channel, the index carried to the next generation.
    pub edges: HashMap<String, Edge>,
}

/// Regenerate every want's paths, reusing channels from `prior` by edge
/// name. Edges whose name is absent from the new topology are dropped;
/// their buffered messages are lost by design.
pub fn generate_paths(seeds: &[PathSeed], prior: &HashMap<String, Edge>) -> GeneratedPaths {
    let mut sorted: Vec<&PathSeed> = seeds.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = GeneratedPaths::default();
    for seed in &sorted {
        out.paths.entry(seed.name.clone()).or_default();
    }

    for user in &sorted {
        for selector in &user.using {
            for provider in &sorted {
                // Self-matches are skipped.
                if provider.name == user.name {
                    continue;
                }
                if !selector_matches(&provider.labels, selector) {
                    continue;
                }
                let name = edge_name(&provider.name, &user.name);
                if out.edges.contains_key(&name) {
                    // A second selector matched the same provider; one
                    // edge per pair.
                    continue;
                }
                let edge = prior.get(&name).cloned().unwrap_or_else(|| Edge::new(&name));
                out.edges.insert(name.clone(), edge.clone());

                if let Some(paths) = out.paths.get_mut(&user.name) {
                    paths.inputs.push(PathInfo {
                        edge: edge.clone(),
                        name: name.clone(),
                        peer: provider.name.clone(),
                        active: true,
                    });
                }
                if let Some(paths) = out.paths.get_mut(&provider.name) {
                    paths.outputs.push(PathInfo {
                        edge,
                        name,
                        peer: user.name.clone(),
                        active: true,
                    });
                }
            }
        }
    }

    out
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
