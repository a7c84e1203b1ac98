// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario suite.

#![allow(dead_code)]

use reach_core::FakeClock;
use reach_engine::test_support::test_registry;
use reach_engine::{Reconciler, ReconcilerOptions};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

pub use reach_core::test_support::want;
pub use reach_core::{WantId, WantStatus};
pub use reach_engine::ReconcilerHandle;
pub use serde_json::json;

/// Orchestrator with the test want types and a file recipe loader.
pub fn orchestrator() -> Reconciler<FakeClock> {
    orchestrator_with(ReconcilerOptions::default())
}

pub fn orchestrator_with(options: ReconcilerOptions) -> Reconciler<FakeClock> {
    Reconciler::new(
        test_registry(),
        Arc::new(reach_config::FileRecipeLoader::new()),
        FakeClock::new(),
        options,
    )
}

/// Await a condition with bounded backoff.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..2_000 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

/// Await a specific status on a named want.
pub async fn wait_status(handle: &ReconcilerHandle, name: &str, status: WantStatus) -> bool {
    wait_until(|| handle.get(name).is_some_and(|w| w.status() == status)).await
}

/// Await Achieved on every named want.
pub async fn wait_all_achieved(handle: &ReconcilerHandle, names: &[&str]) -> bool {
    wait_until(|| {
        names.iter().all(|n| handle.get(n).is_some_and(|w| w.status() == WantStatus::Achieved))
    })
    .await
}

/// Write a recipe document to a temp file and return its guard.
pub fn recipe_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp recipe");
    file.write_all(content.as_bytes()).expect("write recipe");
    file
}

/// Universal invariant: no two registry wants share an id.
pub fn assert_unique_ids(handle: &ReconcilerHandle) {
    let wants = handle.snapshot();
    let mut ids: Vec<_> = wants.iter().map(|w| w.id()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), wants.len(), "duplicate want ids in registry");
}

/// Universal invariant: every input path pairs with exactly one provider
/// output on the same channel under the same edge name.
pub fn assert_channel_symmetry(handle: &ReconcilerHandle) {
    let wants = handle.snapshot();
    for user in &wants {
        for input in &user.paths().inputs {
            let matching: usize = wants
                .iter()
                .flat_map(|p| p.paths().outputs)
                .filter(|out| out.name == input.name && out.edge.same_channel(&input.edge))
                .count();
            assert_eq!(matching, 1, "edge {} lacks a unique provider endpoint", input.name);
        }
    }
}
