// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime registry of wants.
//!
//! The reconcile task is the sole writer of the registry and of each
//! want's config/paths; progression tasks own their want's state and
//! history. No lock here is held across an `.await`.

use crate::factory::Progressable;
use crate::paths::Paths;
use reach_core::{
    Event, EventKind, Labels, Params, Selector, SubscriptionId, WantConfig, WantId, WantState,
    WantStatus,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Control directives forwarded to a want's mailbox.
///
/// Stop always means "stop the current progression loop"; the remaining
/// directives are interpreted by the loop (suspend parks it, restart
/// resets the want to Idle for the next Start phase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlDirective {
    Suspend,
    Resume,
    Stop,
    Restart,
}

/// Completion-triggered restarts allowed per want per window.
pub(crate) const MAX_RETRIGGERS_PER_WINDOW: u32 = 16;
pub(crate) const RETRIGGER_WINDOW_MS: u64 = 1_000;

const NOTIFICATION_INBOX_CAP: usize = 100;

#[derive(Default)]
struct RetriggerBudget {
    window_start_ms: u64,
    count: u32,
}

/// A want materialized in the runtime: config plus concurrency state.
pub struct RuntimeWant {
    /// Immutable for the lifetime of the runtime want. Updates match by
    /// ID, so syncing a new config never changes it.
    id: WantId,
    config: RwLock<WantConfig>,
    status: Mutex<WantStatus>,
    pub state: WantState,
    paths: RwLock<Paths>,
    /// Selectors synthesized by auto-connection; merged with `spec.using`
    /// at path-generation time, never written back into config.
    inferred_using: Mutex<Vec<Selector>>,
    runner: Mutex<Option<Box<dyn Progressable>>>,
    stop: Mutex<CancellationToken>,
    active: AtomicBool,
    controls: Mutex<VecDeque<ControlDirective>>,
    notifications: Mutex<VecDeque<Event>>,
    subscription: Mutex<Option<SubscriptionId>>,
    retrigger: Mutex<RetriggerBudget>,
}

impl RuntimeWant {
    /// Build a runtime want from a compiled config. The config must carry
    /// an ID by this point; a missing one is filled defensively.
    pub(crate) fn new(mut config: WantConfig, runner: Option<Box<dyn Progressable>>) -> Arc<Self> {
        let id = match config.metadata.id.clone() {
            Some(id) => id,
            None => {
                let id = WantId::generate();
                config.metadata.id = Some(id.clone());
                id
            }
        };
        Arc::new(Self {
            id,
            config: RwLock::new(config),
            status: Mutex::new(WantStatus::Idle),
            state: WantState::new(),
            paths: RwLock::new(Paths::default()),
            inferred_using: Mutex::new(Vec::new()),
            runner: Mutex::new(runner),
            stop: Mutex::new(CancellationToken::new()),
            active: AtomicBool::new(false),
            controls: Mutex::new(VecDeque::new()),
            notifications: Mutex::new(VecDeque::new()),
            subscription: Mutex::new(None),
            retrigger: Mutex::new(RetriggerBudget::default()),
        })
    }

    pub fn id(&self) -> WantId {
        self.id.clone()
    }

    pub fn name(&self) -> String {
        self.config.read().metadata.name.clone()
    }

    pub fn type_name(&self) -> String {
        self.config.read().metadata.type_name.clone()
    }

    pub fn labels(&self) -> Labels {
        self.config.read().metadata.labels.clone()
    }

    pub fn params(&self) -> Params {
        self.config.read().spec.params.clone()
    }

    pub fn param(&self, key: &str) -> Option<Value> {
        self.config.read().spec.params.get(key).cloned()
    }

    /// Deep copy of the current config.
    pub fn config_snapshot(&self) -> WantConfig {
        self.config.read().clone()
    }

    /// Effective selectors: user-declared `using` plus inferred
    /// auto-connections.
    pub fn merged_using(&self) -> Vec<Selector> {
        let mut using = self.config.read().spec.using.clone();
        using.extend(self.inferred_using.lock().iter().cloned());
        using
    }

    pub(crate) fn set_inferred_using(&self, selectors: Vec<Selector>) {
        *self.inferred_using.lock() = selectors;
    }

    pub fn status(&self) -> WantStatus {
        *self.status.lock()
    }

    /// Swap the status, returning the previous one.
    pub(crate) fn set_status(&self, status: WantStatus) -> WantStatus {
        std::mem::replace(&mut *self.status.lock(), status)
    }

    /// Snapshot of the resolved paths, refreshed by the Connect phase.
    pub fn paths(&self) -> Paths {
        self.paths.read().clone()
    }

    pub(crate) fn set_paths(&self, paths: Paths) {
        *self.paths.write() = paths;
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub(crate) fn has_runner(&self) -> bool {
        self.runner.lock().is_some()
    }

    pub(crate) fn take_runner(&self) -> Option<Box<dyn Progressable>> {
        self.runner.lock().take()
    }

    pub(crate) fn return_runner(&self, runner: Box<dyn Progressable>) {
        *self.runner.lock() = Some(runner);
    }

    /// Replace the stop token for a fresh progression run and return it.
    /// The token is a child of `parent` so an engine shutdown stops every
    /// loop without touching per-want tokens.
    pub(crate) fn refresh_stop_token(&self, parent: &CancellationToken) -> CancellationToken {
        let token = parent.child_token();
        *self.stop.lock() = token.clone();
        token
    }

    /// Cancel the current progression loop, if any.
    pub(crate) fn cancel_progression(&self) {
        self.stop.lock().cancel();
    }

    pub fn push_control(&self, directive: ControlDirective) {
        self.controls.lock().push_back(directive);
    }

    pub(crate) fn pop_control(&self) -> Option<ControlDirective> {
        self.controls.lock().pop_front()
    }

    pub(crate) fn push_notification(&self, event: Event) {
        let mut inbox = self.notifications.lock();
        if inbox.len() == NOTIFICATION_INBOX_CAP {
            inbox.pop_front();
        }
        inbox.push_back(event);
    }

    /// Drain the notification inbox.
    pub fn take_notifications(&self) -> Vec<Event> {
        self.notifications.lock().drain(..).collect()
    }

    /// Parsed notification filters; empty means all kinds.
    pub(crate) fn notification_kinds(&self) -> Vec<EventKind> {
        self.config
            .read()
            .spec
            .notification_filters
            .iter()
            .filter_map(|f| EventKind::parse(f))
            .collect()
    }

    pub(crate) fn set_subscription(&self, id: SubscriptionId) {
        *self.subscription.lock() = Some(id);
    }

    pub(crate) fn take_subscription(&self) -> Option<SubscriptionId> {
        self.subscription.lock().take()
    }

    /// Retrigger predicate: the progression loop is inactive and the want
    /// is Achieved (re-run on new provider output) or Idle.
    pub fn should_retrigger(&self) -> bool {
        !self.is_active() && matches!(self.status(), WantStatus::Achieved | WantStatus::Idle)
    }

    /// Take one unit of retrigger budget. Bounds completion-triggered
    /// restart chains so cyclic topologies cannot livelock.
    pub(crate) fn consume_retrigger_budget(&self, now_ms: u64) -> bool {
        let mut budget = self.retrigger.lock();
        if now_ms.saturating_sub(budget.window_start_ms) >= RETRIGGER_WINDOW_MS {
            budget.window_start_ms = now_ms;
            budget.count = 0;
        }
        if budget.count >= MAX_RETRIGGERS_PER_WINDOW {
            return false;
        }
        budget.count += 1;
        true
    }

    /// Set one parameter and record the new snapshot in parameter history.
    pub fn update_parameter(&self, key: &str, value: Value, now_ms: u64) {
        let params = {
            let mut config = self.config.write();
            config.spec.params.insert(key.to_string(), value);
            config.spec.params.clone()
        };
        let name = self.name();
        self.state.record_params(&name, &params, now_ms);
    }

    /// Sync an updated config onto this want (Update event application).
    /// The ID is the match key and never changes.
    pub(crate) fn sync_config(&self, new: &WantConfig, now_ms: u64) {
        let params_changed;
        {
            let mut config = self.config.write();
            params_changed = config.spec.params != new.spec.params;
            let id = config.metadata.id.clone();
            let owner_references = config.metadata.owner_references.clone();
            config.metadata = new.metadata.clone();
            config.metadata.id = id;
            // Owner references are runtime-managed; a config update must
            // not orphan recipe children.
            if config.metadata.owner_references.is_empty() {
                config.metadata.owner_references = owner_references;
            }
            config.spec = new.spec.clone();
        }
        if params_changed {
            let name = self.name();
            let params = self.params();
            self.state.record_params(&name, &params, now_ms);
        }
    }
}

/// Thread-safe map of name -> runtime want with an ID index.
#[derive(Default)]
pub struct WantRegistry {
    by_name: HashMap<String, Arc<RuntimeWant>>,
    by_id: HashMap<WantId, String>,
}

impl WantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a want. A second registration under an existing name is
    /// silently dropped (logged); returns whether the want was inserted.
    pub(crate) fn register(&mut self, want: Arc<RuntimeWant>) -> bool {
        let name = want.name();
        if self.by_name.contains_key(&name) {
            warn!(want = %name, "duplicate registration dropped");
            return false;
        }
        self.by_id.insert(want.id(), name.clone());
        self.by_name.insert(name, want);
        true
    }

    pub(crate) fn unregister(&mut self, name: &str) -> Option<Arc<RuntimeWant>> {
        let want = self.by_name.remove(name)?;
        self.by_id.remove(&want.id());
        Some(want)
    }

    pub fn get(&self, name: &str) -> Option<Arc<RuntimeWant>> {
        self.by_name.get(name).cloned()
    }

    pub fn find_by_id(&self, id: &WantId) -> Option<(Arc<RuntimeWant>, String)> {
        let name = self.by_id.get(id)?;
        self.by_name.get(name).map(|w| (Arc::clone(w), name.clone()))
    }

    pub fn contains_id(&self, id: &WantId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Name-sorted snapshot of all wants.
    pub fn snapshot(&self) -> Vec<Arc<RuntimeWant>> {
        let mut names: Vec<&String> = self.by_name.keys().collect();
        names.sort();
        names.into_iter().filter_map(|n| self.by_name.get(n).cloned()).collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
