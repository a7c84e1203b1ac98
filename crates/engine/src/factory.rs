// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Want type registry and the progression contract.
//!
//! A want type couples a factory (pure, idempotent) with a connectivity
//! declaration. Factories produce [`Progressable`] instances; the engine
//! never dispatches on concrete types.

use crate::error::{EngineError, ProgressError};
use crate::paths::Paths;
use crate::reconciler::ReconcilerHandle;
use crate::registry::RuntimeWant;
use async_trait::async_trait;
use reach_core::{Event, Metadata, Params, WantId, WantSpec};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Input/output requirements a want type declares.
///
/// A want is schedulable once its active inputs and outputs reach the
/// required counts. Maximums are validated but only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Connectivity {
    pub required_inputs: usize,
    pub required_outputs: usize,
    /// `None` = unbounded.
    pub max_inputs: Option<usize>,
    pub max_outputs: Option<usize>,
}

impl Connectivity {
    pub fn satisfied_by(&self, paths: &Paths) -> bool {
        paths.active_inputs() >= self.required_inputs
            && paths.active_outputs() >= self.required_outputs
    }

    /// Non-fatal limit check; `Some` carries the log message.
    pub fn limit_violation(&self, paths: &Paths) -> Option<String> {
        let inputs = paths.active_inputs();
        let outputs = paths.active_outputs();
        if let Some(max) = self.max_inputs {
            if inputs > max {
                return Some(format!("{} inputs exceed maximum {}", inputs, max));
            }
        }
        if let Some(max) = self.max_outputs {
            if outputs > max {
                return Some(format!("{} outputs exceed maximum {}", outputs, max));
            }
        }
        None
    }
}

/// The cooperative progression contract implemented by every want type.
///
/// The progression loop calls `initialize` once per launch, then
/// `progress` repeatedly until `is_achieved` turns true or the want is
/// stopped. Implementations read their channels through
/// [`ProgressCtx::paths`] and stage state through
/// [`ProgressCtx::store_state`]; both are cheap snapshots, safe to call
/// every cycle.
#[async_trait]
pub trait Progressable: Send {
    /// One-time setup at the top of each progression run. Re-runs after a
    /// retrigger, so implementations keep it idempotent.
    async fn initialize(&mut self, _ctx: &ProgressCtx) -> Result<(), ProgressError> {
        Ok(())
    }

    /// One cooperative step.
    async fn progress(&mut self, ctx: &ProgressCtx) -> Result<(), ProgressError>;

    /// True once the want's desired state is reached.
    fn is_achieved(&self, ctx: &ProgressCtx) -> bool;
}

type BuildFn =
    Arc<dyn Fn(&Metadata, &WantSpec) -> Result<Box<dyn Progressable>, EngineError> + Send + Sync>;

/// A registered want type: connectivity declaration plus factory.
#[derive(Clone)]
pub struct WantType {
    pub connectivity: Connectivity,
    build: BuildFn,
}

impl WantType {
    pub fn new(
        connectivity: Connectivity,
        build: impl Fn(&Metadata, &WantSpec) -> Result<Box<dyn Progressable>, EngineError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self { connectivity, build: Arc::new(build) }
    }

    pub(crate) fn build(
        &self,
        meta: &Metadata,
        spec: &WantSpec,
    ) -> Result<Box<dyn Progressable>, EngineError> {
        (self.build)(meta, spec)
    }
}

/// Factory registry keyed by the metadata `type` string. Unknown types
/// yield Failed placeholder wants, not panics.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, WantType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, want_type: WantType) {
        self.types.insert(name.into(), want_type);
    }

    pub fn get(&self, name: &str) -> Option<&WantType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

/// Execution context handed to a [`Progressable`] by its progression loop.
pub struct ProgressCtx {
    want: Arc<RuntimeWant>,
    handle: ReconcilerHandle,
}

impl ProgressCtx {
    pub(crate) fn new(want: Arc<RuntimeWant>, handle: ReconcilerHandle) -> Self {
        Self { want, handle }
    }

    pub fn id(&self) -> WantId {
        self.want.id()
    }

    pub fn name(&self) -> String {
        self.want.name()
    }

    pub fn type_name(&self) -> String {
        self.want.type_name()
    }

    /// Current paths snapshot. Refreshed by the Connect phase, so a want
    /// that keeps running across a topology change sees the new wiring on
    /// its next call.
    pub fn paths(&self) -> Paths {
        self.want.paths()
    }

    /// Stage a state write for the current cycle (differential).
    pub fn store_state(&self, key: &str, value: impl Into<Value>) {
        self.want.state.store(key, value.into());
    }

    pub fn state(&self, key: &str) -> Option<Value> {
        self.want.state.get(key)
    }

    pub fn param(&self, key: &str) -> Option<Value> {
        self.want.param(key)
    }

    pub fn params(&self) -> Params {
        self.want.params()
    }

    /// Drain events delivered to this want's notification inbox.
    pub fn take_notifications(&self) -> Vec<Event> {
        self.want.take_notifications()
    }

    /// Handle back into the orchestrator, for wants that submit or delete
    /// other wants (targets spawning recipe children).
    pub fn orchestrator(&self) -> &ReconcilerHandle {
        &self.handle
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
