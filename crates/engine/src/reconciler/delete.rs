// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cascade delete.
//!
//! Deleting a want first deletes every want whose owner references point
//! at it (depth-first), then the want itself: stop channel closed, hub
//! subscription removed, registry and desired config purged. A missing
//! owner is logged and skipped, never fatal.

use super::EngineState;
use reach_core::{Event, WantId, WantStatus};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) fn delete_want_by_id(state: &Arc<EngineState>, id: &WantId) -> bool {
    let Some((want, name)) = state.registry.read().find_by_id(id) else {
        warn!(id = %id.short(12), "delete target not found, skipping");
        return false;
    };

    // Children first, depth-first through their own references.
    let children: Vec<WantId> = state
        .registry
        .read()
        .snapshot()
        .iter()
        .filter(|w| w.config_snapshot().owned_by(id))
        .map(|w| w.id())
        .collect();
    for child in children {
        delete_want_by_id(state, &child);
    }

    want.cancel_progression();
    if let Some(subscription) = want.take_subscription() {
        state.hub.unsubscribe(subscription);
    }

    let previous = want.set_status(WantStatus::Terminated);
    if previous != WantStatus::Terminated {
        state.hub.emit(&Event::StatusChanged {
            id: want.id(),
            name: name.clone(),
            from: previous,
            to: WantStatus::Terminated,
        });
    }

    state.registry.write().unregister(&name);
    {
        let mut desired = state.desired.lock();
        desired.wants.retain(|w| w.id() != Some(id) && w.name() != name);
    }
    {
        let mut last_known = state.last_known.lock();
        last_known.wants.retain(|w| w.id() != Some(id) && w.name() != name);
    }

    info!(want = %name, id = %id.short(12), "want deleted");
    true
}

#[cfg(test)]
#[path = "delete_tests.rs"]
mod tests;
