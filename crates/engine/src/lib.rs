// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! reach-engine: the reconciliation engine of the Reach want orchestrator.
//!
//! A single reconcile task owns the runtime registry and drives the
//! Compile -> Connect -> Start phases; each schedulable want runs its own
//! cooperative progression task. Completion of a provider retriggers its
//! consumers through a label reverse index.

mod channel;
mod differ;
mod error;
mod factory;
mod levels;
mod memory;
mod paths;
mod progress;
mod reconciler;
mod registry;
mod target;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use channel::{Edge, EDGE_CAPACITY};
pub use differ::{diff_configs, same_desired_state, ChangeEvent};
pub use error::{EngineError, ProgressError};
pub use factory::{Connectivity, ProgressCtx, Progressable, TypeRegistry, WantType};
pub use levels::{dependency_levels, sort_sink_first};
pub use paths::{edge_name, generate_paths, GeneratedPaths, PathInfo, PathSeed, Paths};
pub use reconciler::{
    Reconciler, ReconcilerHandle, ReconcilerOptions, COMMAND_QUEUE_CAPACITY,
    TRIGGER_QUEUE_CAPACITY,
};
pub use registry::{ControlDirective, RuntimeWant, WantRegistry};
pub use target::{RecipeLoader, TARGET_TYPE};
