// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency leveling by `using` depth.
//!
//! Sources sit at level 0; every other want is one above its deepest
//! provider. Update events apply sink-first (highest level first) so
//! downstream wants rewire before their upstream graph moves. Selector
//! cycles must not hang the traversal: every member of a cycle collapses
//! to level 0.

use crate::differ::ChangeEvent;
use crate::paths::PathSeed;
use reach_core::selector_matches;
use std::collections::{HashMap, HashSet};

/// Compute the dependency level of every seed.
pub fn dependency_levels(seeds: &[PathSeed]) -> HashMap<String, usize> {
    let mut sorted: Vec<&PathSeed> = seeds.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    // provider map: want -> wants matched by any of its selectors
    let mut providers: HashMap<&str, Vec<&str>> = HashMap::new();
    for user in &sorted {
        let mut matched = Vec::new();
        for selector in &user.using {
            for provider in &sorted {
                if provider.name != user.name && selector_matches(&provider.labels, selector) {
                    matched.push(provider.name.as_str());
                }
            }
        }
        providers.insert(user.name.as_str(), matched);
    }

    // First pass: find every cycle member, so no level is ever computed
    // through an unresolved cycle.
    let mut cycle_members: HashSet<String> = HashSet::new();
    let mut done: HashSet<String> = HashSet::new();
    for seed in &sorted {
        let mut stack = Vec::new();
        mark_cycles(&seed.name, &providers, &mut stack, &mut done, &mut cycle_members);
    }

    // Second pass: cycle members are level-0 leaves; everyone else sits
    // one above its deepest provider.
    let mut memo: HashMap<String, usize> = HashMap::new();
    for seed in &sorted {
        level_of(&seed.name, &providers, &cycle_members, &mut memo);
    }
    memo
}

fn mark_cycles(
    name: &str,
    providers: &HashMap<&str, Vec<&str>>,
    stack: &mut Vec<String>,
    done: &mut HashSet<String>,
    cycle_members: &mut HashSet<String>,
) {
    if done.contains(name) {
        return;
    }
    if let Some(pos) = stack.iter().position(|n| n == name) {
        // Back-edge: everything from the first occurrence down is cyclic.
        for member in &stack[pos..] {
            cycle_members.insert(member.clone());
        }
        return;
    }

    stack.push(name.to_string());
    for provider in providers.get(name).into_iter().flatten() {
        mark_cycles(provider, providers, stack, done, cycle_members);
    }
    stack.pop();
    done.insert(name.to_string());
}

fn level_of(
    name: &str,
    providers: &HashMap<&str, Vec<&str>>,
    cycle_members: &HashSet<String>,
    memo: &mut HashMap<String, usize>,
) -> usize {
    if let Some(&level) = memo.get(name) {
        return level;
    }
    if cycle_members.contains(name) {
        memo.insert(name.to_string(), 0);
        return 0;
    }

    let level = providers
        .get(name)
        .into_iter()
        .flatten()
        .map(|p| level_of(p, providers, cycle_members, memo))
        .max()
        .map(|deepest| deepest + 1)
        .unwrap_or(0);

    memo.insert(name.to_string(), level);
    level
}

/// Order change events sink-first: highest level first, stable within a
/// level. Names without a level (deletes of already-unknown wants) sort
/// as level 0.
pub fn sort_sink_first(events: &mut [ChangeEvent], levels: &HashMap<String, usize>) {
    events.sort_by_key(|e| std::cmp::Reverse(levels.get(e.name()).copied().unwrap_or(0)));
}

#[cfg(test)]
#[path = "levels_tests.rs"]
mod tests;
