// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciler: registry ownership, command channels, and the
//! public orchestrator API.
//!
//! A single reconcile task (see `run`) owns every write to the registry,
//! the path map, and the channel index. Everything else talks to it
//! through buffered command channels with a drop-on-full policy: the
//! system only guarantees that *some* later reconcile observes a request.

mod compile;
mod connect;
mod delete;
mod retrigger;
mod run;
mod start;

pub(crate) use delete::delete_want_by_id;

use crate::channel::Edge;
use crate::factory::TypeRegistry;
use crate::registry::{ControlDirective, RuntimeWant, WantRegistry};
use crate::target::{self, RecipeLoader};
use parking_lot::{Mutex, RwLock};
use reach_core::{Clock, Config, EventHub, ExecutionId, SystemClock, WantConfig, WantId};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::warn;

/// Capacity of the trigger command queue.
pub const TRIGGER_QUEUE_CAPACITY: usize = 20;

/// Capacity of the add and delete queues.
pub const COMMAND_QUEUE_CAPACITY: usize = 10;

const BATCH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Commands multiplexed by the reconcile loop.
#[derive(Debug)]
pub(crate) enum TriggerCommand {
    /// Run a Compile -> Connect -> Start pass.
    Reconcile,
    /// Forward a control directive to a want.
    Control { id: WantId, directive: ControlDirective },
    /// A provider reached Achieved; reset its users for re-execution.
    CheckCompletedRetrigger { provider: String },
}

pub(crate) struct CommandChannels {
    pub(crate) trigger_rx: mpsc::Receiver<TriggerCommand>,
    pub(crate) add_rx: mpsc::Receiver<Vec<WantConfig>>,
    pub(crate) delete_rx: mpsc::Receiver<Vec<WantId>>,
}

/// State shared between the reconcile loop, progression tasks, and
/// API handles.
pub(crate) struct EngineState {
    pub(crate) registry: RwLock<WantRegistry>,
    /// Accumulated desired state (submissions or the config file).
    pub(crate) desired: Mutex<Config>,
    /// Deep copy of the config as of the last completed Compile.
    pub(crate) last_known: Mutex<Config>,
    /// Edge name -> channel, rebuilt by Connect, reused across cycles.
    pub(crate) edges: Mutex<HashMap<String, Edge>>,
    /// `key=value` -> user want names, for completion retriggers.
    pub(crate) label_users: Mutex<HashMap<String, Vec<String>>>,
    /// Controller owner id -> child want names, for parameter pushes.
    pub(crate) param_routes: Mutex<HashMap<WantId, Vec<String>>>,
    pub(crate) types: TypeRegistry,
    pub(crate) hub: EventHub,
    pub(crate) tracker: TaskTracker,
    pub(crate) shutdown: CancellationToken,
    pub(crate) execution_id: ExecutionId,
    /// Completed reconcile passes; batch mode waits for the first one.
    pub(crate) reconciles: AtomicU64,
    /// Config-file poll attempts; batch mode with a config file waits for
    /// the first one.
    pub(crate) config_polls: AtomicU64,
    /// Clock access for handles that are not generic over `Clock`.
    pub(crate) epoch_ms: Arc<dyn Fn() -> u64 + Send + Sync>,
    pub(crate) trigger_tx: mpsc::Sender<TriggerCommand>,
    pub(crate) add_tx: mpsc::Sender<Vec<WantConfig>>,
    pub(crate) delete_tx: mpsc::Sender<Vec<WantId>>,
}

/// Cloneable handle into the orchestrator: non-blocking submissions plus
/// read access to the registry. Held by progression contexts and external
/// submitters alike.
#[derive(Clone)]
pub struct ReconcilerHandle {
    state: Arc<EngineState>,
}

impl ReconcilerHandle {
    pub(crate) fn new(state: Arc<EngineState>) -> Self {
        Self { state }
    }

    /// Non-blocking enqueue of new wants. Returns false when the queue is
    /// full and the batch was dropped.
    pub fn submit_add(&self, wants: Vec<WantConfig>) -> bool {
        match self.state.add_tx.try_send(wants) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "add queue full, dropping batch");
                false
            }
        }
    }

    /// Non-blocking enqueue of ids to cascade-delete.
    pub fn submit_delete(&self, ids: Vec<WantId>) -> bool {
        match self.state.delete_tx.try_send(ids) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "delete queue full, dropping batch");
                false
            }
        }
    }

    /// Hint the loop to run a reconcile cycle.
    pub fn trigger_reconcile(&self) -> bool {
        self.send_trigger(TriggerCommand::Reconcile)
    }

    pub(crate) fn check_completed_retrigger(&self, provider: String) -> bool {
        self.send_trigger(TriggerCommand::CheckCompletedRetrigger { provider })
    }

    /// Forward a control directive to a want by id.
    pub fn control(&self, id: WantId, directive: ControlDirective) -> bool {
        self.send_trigger(TriggerCommand::Control { id, directive })
    }

    fn send_trigger(&self, command: TriggerCommand) -> bool {
        match self.state.trigger_tx.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                // The next tick or completion event recovers.
                warn!(error = %e, "trigger queue full, dropping command");
                false
            }
        }
    }

    /// Replace a desired-state entry by id (appending when absent) and
    /// trigger a reconcile.
    pub fn update_want(&self, want: WantConfig) -> bool {
        let Some(id) = want.id().cloned() else {
            warn!(want = want.name(), "update_want requires an id");
            return false;
        };
        {
            let mut desired = self.state.desired.lock();
            match desired.wants.iter().position(|w| w.id() == Some(&id)) {
                Some(index) => desired.wants[index] = want,
                None => desired.wants.push(want),
            }
        }
        self.trigger_reconcile()
    }

    /// Push a parameter onto a want, cascading to controlled children
    /// through the per-type translation table.
    pub fn update_parameter(&self, id: &WantId, key: &str, value: Value) {
        let now_ms = (self.state.epoch_ms)();
        target::push_parameter(&self.state, id, key, value, now_ms);
    }

    pub fn find_by_id(&self, id: &WantId) -> Option<Arc<RuntimeWant>> {
        self.state.registry.read().find_by_id(id).map(|(want, _)| want)
    }

    pub fn get(&self, name: &str) -> Option<Arc<RuntimeWant>> {
        self.state.registry.read().get(name)
    }

    /// Name-sorted snapshot of the live registry.
    pub fn snapshot(&self) -> Vec<Arc<RuntimeWant>> {
        self.state.registry.read().snapshot()
    }

    /// True when every id is present in the live registry.
    pub fn are_added(&self, ids: &[WantId]) -> bool {
        let registry = self.state.registry.read();
        ids.iter().all(|id| registry.contains_id(id))
    }

    /// True when every id is absent from the live registry.
    pub fn are_deleted(&self, ids: &[WantId]) -> bool {
        let registry = self.state.registry.read();
        ids.iter().all(|id| !registry.contains_id(id))
    }

    /// The orchestrator's event hub.
    pub fn events(&self) -> EventHub {
        self.state.hub.clone()
    }
}

/// File-backed modes of the reconcile loop.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerOptions {
    /// Watch this config file for changes (batch mode).
    pub config_path: Option<PathBuf>,
    /// Persist the runtime snapshot here when its hash changes.
    pub memory_path: Option<PathBuf>,
}

/// The reconciliation engine.
pub struct Reconciler<C: Clock = SystemClock> {
    pub(crate) state: Arc<EngineState>,
    pub(crate) clock: C,
    options: ReconcilerOptions,
    channels: Mutex<Option<CommandChannels>>,
    started: AtomicBool,
}

impl<C: Clock + 'static> Reconciler<C> {
    pub fn new(
        mut types: TypeRegistry,
        recipes: Arc<dyn RecipeLoader>,
        clock: C,
        options: ReconcilerOptions,
    ) -> Self {
        target::register_target_type(&mut types, recipes);

        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE_CAPACITY);
        let (add_tx, add_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (delete_tx, delete_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        let epoch_clock = clock.clone();
        let state = Arc::new(EngineState {
            registry: RwLock::new(WantRegistry::new()),
            desired: Mutex::new(Config::default()),
            last_known: Mutex::new(Config::default()),
            edges: Mutex::new(HashMap::new()),
            label_users: Mutex::new(HashMap::new()),
            param_routes: Mutex::new(HashMap::new()),
            types,
            hub: EventHub::new(),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            execution_id: ExecutionId::generate(),
            reconciles: AtomicU64::new(0),
            config_polls: AtomicU64::new(0),
            epoch_ms: Arc::new(move || epoch_clock.epoch_ms()),
            trigger_tx,
            add_tx,
            delete_tx,
        });

        Self {
            state,
            clock,
            options,
            channels: Mutex::new(Some(CommandChannels { trigger_rx, add_rx, delete_rx })),
            started: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> ReconcilerHandle {
        ReconcilerHandle::new(Arc::clone(&self.state))
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.state.execution_id.clone()
    }

    /// Spawn the reconcile loop. Idempotent; later calls are no-ops.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("reconcile loop already started");
            return;
        }
        let Some(channels) = self.channels.lock().take() else {
            return;
        };
        self.state.tracker.spawn(run::run_loop(
            Arc::clone(&self.state),
            self.clock.clone(),
            self.options.clone(),
            channels,
        ));
    }

    /// Run until every want reaches a terminal state, then stop.
    pub async fn execute_batch(&self) {
        self.start();
        self.handle().trigger_reconcile();
        let mut tick = tokio::time::interval(BATCH_POLL_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            if self.state.shutdown.is_cancelled() {
                break;
            }
            // Never declare completion before the first reconcile (and,
            // in file mode, the first config poll) had a chance to
            // populate the registry.
            if self.state.reconciles.load(Ordering::Acquire) == 0 {
                continue;
            }
            if self.options.config_path.is_some()
                && self.state.config_polls.load(Ordering::Acquire) == 0
            {
                continue;
            }
            if !self.queues_drained() {
                continue;
            }
            let wants = self.state.registry.read().snapshot();
            if wants.iter().all(|w| w.status().is_terminal() && !w.is_active()) {
                break;
            }
        }
        self.shutdown_and_wait().await;
    }

    /// Run until an external shutdown.
    pub async fn execute_server(&self) {
        self.start();
        self.handle().trigger_reconcile();
        self.state.shutdown.cancelled().await;
        self.shutdown_and_wait().await;
    }

    /// Request shutdown; `execute_*` returns once in-flight work drains.
    pub fn shutdown(&self) {
        self.state.shutdown.cancel();
    }

    async fn shutdown_and_wait(&self) {
        self.state.shutdown.cancel();
        self.state.tracker.close();
        self.state.tracker.wait().await;
    }

    fn queues_drained(&self) -> bool {
        let s = &self.state;
        s.trigger_tx.capacity() == s.trigger_tx.max_capacity()
            && s.add_tx.capacity() == s.add_tx.max_capacity()
            && s.delete_tx.capacity() == s.delete_tx.max_capacity()
    }

    // Convenience pass-throughs to the handle.

    pub fn submit_add(&self, wants: Vec<WantConfig>) -> bool {
        self.handle().submit_add(wants)
    }

    pub fn submit_delete(&self, ids: Vec<WantId>) -> bool {
        self.handle().submit_delete(ids)
    }

    pub fn update_want(&self, want: WantConfig) -> bool {
        self.handle().update_want(want)
    }

    pub fn trigger_reconcile(&self) -> bool {
        self.handle().trigger_reconcile()
    }

    pub fn update_parameter(&self, id: &WantId, key: &str, value: Value) {
        target::push_parameter(&self.state, id, key, value, self.clock.epoch_ms());
    }

    pub fn find_by_id(&self, id: &WantId) -> Option<Arc<RuntimeWant>> {
        self.handle().find_by_id(id)
    }

    pub fn snapshot(&self) -> Vec<Arc<RuntimeWant>> {
        self.handle().snapshot()
    }

    pub fn are_added(&self, ids: &[WantId]) -> bool {
        self.handle().are_added(ids)
    }

    pub fn are_deleted(&self, ids: &[WantId]) -> bool {
        self.handle().are_deleted(ids)
    }

    pub fn suspend(&self, id: WantId) -> bool {
        self.handle().control(id, ControlDirective::Suspend)
    }

    pub fn resume(&self, id: WantId) -> bool {
        self.handle().control(id, ControlDirective::Resume)
    }

    pub fn stop(&self, id: WantId) -> bool {
        self.handle().control(id, ControlDirective::Stop)
    }

    pub fn restart(&self, id: WantId) -> bool {
        self.handle().control(id, ControlDirective::Restart)
    }
}

/// One full reconcile pass: Compile, Connect, Start.
pub(crate) fn reconcile<C: Clock + 'static>(state: &Arc<EngineState>, clock: &C) {
    compile::compile(state, clock);
    connect::connect(state);
    start::start_phase(state, clock);
    state.reconciles.fetch_add(1, Ordering::Release);
}


#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
