// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start phase: launch idle wants whose connectivity holds.
//!
//! Unschedulable wants stay Idle and are retried on later cycles; max
//! violations are logged, never fatal.

use super::EngineState;
use crate::progress;
use reach_core::{Clock, WantStatus};
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) fn start_phase<C: Clock + 'static>(state: &Arc<EngineState>, clock: &C) {
    let wants = state.registry.read().snapshot();
    for want in wants {
        if want.status() != WantStatus::Idle || want.is_active() || !want.has_runner() {
            continue;
        }
        let Some(want_type) = state.types.get(&want.type_name()) else {
            continue;
        };
        let paths = want.paths();
        if !want_type.connectivity.satisfied_by(&paths) {
            debug!(
                want = %want.name(),
                inputs = paths.active_inputs(),
                outputs = paths.active_outputs(),
                "connectivity unsatisfied, staying idle"
            );
            continue;
        }
        if let Some(violation) = want_type.connectivity.limit_violation(&paths) {
            warn!(want = %want.name(), %violation, "connectivity limit exceeded");
        }
        progress::spawn(Arc::clone(state), want, clock.clone());
    }
}
