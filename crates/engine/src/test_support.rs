// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feature-gated want types exercising the engine in tests.
//!
//! `source` emits a fixed number of messages, `relay` forwards inputs to
//! outputs, `sink` counts what arrives, and `task` just progresses for a
//! few cycles. Production want types live outside this crate.

use crate::error::{EngineError, ProgressError};
use crate::factory::{Connectivity, ProgressCtx, Progressable, TypeRegistry, WantType};
use crate::target::RecipeLoader;
use async_trait::async_trait;
use reach_core::{Params, WantConfig, WantSpec};
use reach_config::ResultSpec;
use serde_json::{json, Value};

fn param_u64(spec: &WantSpec, key: &str, default: u64) -> u64 {
    spec.params.get(key).and_then(Value::as_u64).unwrap_or(default)
}

/// Emits `count` messages on every output, then achieves.
struct SourceWant {
    count: u64,
    value: Value,
    sent: u64,
}

#[async_trait]
impl Progressable for SourceWant {
    async fn initialize(&mut self, _ctx: &ProgressCtx) -> Result<(), ProgressError> {
        // Every launch produces a fresh batch, so a retriggered topology
        // sees new output.
        self.sent = 0;
        Ok(())
    }

    async fn progress(&mut self, ctx: &ProgressCtx) -> Result<(), ProgressError> {
        if self.sent >= self.count {
            return Ok(());
        }
        for output in &ctx.paths().outputs {
            output.edge.try_send(self.value.clone());
        }
        self.sent += 1;
        ctx.store_state("sent", self.sent);
        Ok(())
    }

    fn is_achieved(&self, _ctx: &ProgressCtx) -> bool {
        self.sent >= self.count
    }
}

/// Forwards every received message to all outputs; achieves after
/// relaying `expect` messages.
struct RelayWant {
    expect: u64,
    relayed: u64,
}

#[async_trait]
impl Progressable for RelayWant {
    async fn progress(&mut self, ctx: &ProgressCtx) -> Result<(), ProgressError> {
        let paths = ctx.paths();
        for input in &paths.inputs {
            while let Some(message) = input.edge.try_recv() {
                for output in &paths.outputs {
                    output.edge.try_send(message.clone());
                }
                self.relayed += 1;
            }
        }
        ctx.store_state("relayed", self.relayed);
        Ok(())
    }

    fn is_achieved(&self, _ctx: &ProgressCtx) -> bool {
        self.relayed >= self.expect
    }
}

/// Counts received messages into state; achieves at `expect`.
struct SinkWant {
    expect: u64,
    received: u64,
}

#[async_trait]
impl Progressable for SinkWant {
    async fn progress(&mut self, ctx: &ProgressCtx) -> Result<(), ProgressError> {
        for input in &ctx.paths().inputs {
            while let Some(message) = input.edge.try_recv() {
                self.received += 1;
                ctx.store_state("last_message", message);
            }
        }
        ctx.store_state("received", self.received);
        Ok(())
    }

    fn is_achieved(&self, _ctx: &ProgressCtx) -> bool {
        self.received >= self.expect
    }
}

/// Progresses for `cycles` cycles, then achieves. No wiring needed.
struct TaskWant {
    cycles: u64,
    ticks: u64,
}

#[async_trait]
impl Progressable for TaskWant {
    async fn progress(&mut self, ctx: &ProgressCtx) -> Result<(), ProgressError> {
        if self.ticks < self.cycles {
            self.ticks += 1;
        }
        ctx.store_state("ticks", self.ticks);
        Ok(())
    }

    fn is_achieved(&self, _ctx: &ProgressCtx) -> bool {
        self.ticks >= self.cycles
    }
}

/// Panics on its first progress call: for exercising panic recovery.
struct PanicWant;

#[async_trait]
impl Progressable for PanicWant {
    #[allow(clippy::panic)]
    async fn progress(&mut self, _ctx: &ProgressCtx) -> Result<(), ProgressError> {
        panic!("intentional test panic");
    }

    fn is_achieved(&self, _ctx: &ProgressCtx) -> bool {
        false
    }
}

/// Registry with the test types: `source`, `relay`, `sink`, `task`,
/// `broken` (factory always fails), and `panicky` (progress panics).
pub fn test_registry() -> TypeRegistry {
    let mut types = TypeRegistry::new();

    types.register(
        "source",
        WantType::new(
            Connectivity { required_outputs: 1, ..Default::default() },
            |_, spec| {
                Ok(Box::new(SourceWant {
                    count: param_u64(spec, "count", 1),
                    value: spec.params.get("value").cloned().unwrap_or_else(|| json!("ping")),
                    sent: 0,
                }))
            },
        ),
    );

    types.register(
        "relay",
        WantType::new(
            Connectivity { required_inputs: 1, required_outputs: 1, ..Default::default() },
            |_, spec| {
                Ok(Box::new(RelayWant { expect: param_u64(spec, "expect", 1), relayed: 0 }))
            },
        ),
    );

    types.register(
        "sink",
        WantType::new(
            Connectivity { required_inputs: 1, ..Default::default() },
            |_, spec| {
                Ok(Box::new(SinkWant { expect: param_u64(spec, "expect", 1), received: 0 }))
            },
        ),
    );

    types.register(
        "task",
        WantType::new(Connectivity::default(), |_, spec| {
            Ok(Box::new(TaskWant { cycles: param_u64(spec, "cycles", 1), ticks: 0 }))
        }),
    );

    types.register(
        "broken",
        WantType::new(Connectivity::default(), |meta, _| {
            Err(EngineError::Factory {
                want: meta.name.clone(),
                message: "this type never builds".to_string(),
            })
        }),
    );

    types.register(
        "panicky",
        WantType::new(Connectivity::default(), |_, _| Ok(Box::new(PanicWant))),
    );

    types
}

/// Recipe loader returning a fixed child set, for tests that avoid disk.
pub struct StubRecipeLoader {
    pub children: Vec<WantConfig>,
    pub results: Vec<ResultSpec>,
}

impl StubRecipeLoader {
    pub fn new(children: Vec<WantConfig>) -> Self {
        Self { children, results: Vec::new() }
    }
}

impl RecipeLoader for StubRecipeLoader {
    fn load(&self, _path: &str, _params: &Params) -> Result<Vec<WantConfig>, EngineError> {
        Ok(self.children.clone())
    }

    fn result_specs(&self, _path: &str) -> Result<Vec<ResultSpec>, EngineError> {
        Ok(self.results.clone())
    }
}
