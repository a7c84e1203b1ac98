// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous in-process event hub.
//!
//! The reconciler and progression loops emit events; subscribers receive
//! them on the emitting task, inside the cycle that produced them. That
//! synchrony is load-bearing: a target observes a child's completion
//! before the child's progression loop exits.

use crate::id::WantId;
use crate::want::WantStatus;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Events emitted by the orchestrator core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A want's lifecycle status changed.
    StatusChanged { id: WantId, name: String, from: WantStatus, to: WantStatus },
    /// A want with owner references reached Achieved.
    OwnerCompleted { owner: WantId, child: WantId, child_name: String },
    /// A parameter was pushed onto a want.
    ParameterUpdated { id: WantId, name: String, key: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StatusChanged { .. } => EventKind::StatusChanged,
            Event::OwnerCompleted { .. } => EventKind::OwnerCompleted,
            Event::ParameterUpdated { .. } => EventKind::ParameterUpdated,
        }
    }

    /// One-line form for logging.
    pub fn log_summary(&self) -> String {
        match self {
            Event::StatusChanged { name, from, to, .. } => {
                format!("status_changed want={} {}->{}", name, from, to)
            }
            Event::OwnerCompleted { owner, child_name, .. } => {
                format!("owner_completed owner={} child={}", owner.short(12), child_name)
            }
            Event::ParameterUpdated { name, key, .. } => {
                format!("parameter_updated want={} key={}", name, key)
            }
        }
    }
}

/// Discriminant of [`Event`], used by notification filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StatusChanged,
    OwnerCompleted,
    ParameterUpdated,
}

impl EventKind {
    /// Parse a notification-filter entry. Unknown names are `None` and get
    /// ignored by subscribers.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "status_changed" => Some(EventKind::StatusChanged),
            "owner_completed" => Some(EventKind::OwnerCompleted),
            "parameter_updated" => Some(EventKind::ParameterUpdated),
            _ => None,
        }
    }
}

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

struct SubscriptionEntry {
    id: u64,
    /// Empty = all kinds.
    kinds: Vec<EventKind>,
    callback: Callback,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    subscriptions: Vec<SubscriptionEntry>,
}

/// Synchronous pub/sub hub shared across the orchestrator.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a callback for the given event kinds (empty = all).
    pub fn subscribe(
        &self,
        kinds: Vec<EventKind>,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscriptions.push(SubscriptionEntry {
            id,
            kinds,
            callback: Arc::new(callback),
        });
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().subscriptions.retain(|s| s.id != id.0);
    }

    /// Deliver an event to every matching subscriber, synchronously.
    ///
    /// The subscriber list is copied out first so callbacks may subscribe
    /// or emit without deadlocking the hub.
    pub fn emit(&self, event: &Event) {
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock();
            inner
                .subscriptions
                .iter()
                .filter(|s| s.kinds.is_empty() || s.kinds.contains(&event.kind()))
                .map(|s| Arc::clone(&s.callback))
                .collect()
        };
        for callback in callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
