// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-want progression loop.
//!
//! Launched by the Start phase for each schedulable want. The loop moves
//! the want Idle -> Reaching, initializes its runner once, then drives
//! `progress` cycles with batched state commits until the want is
//! achieved, faulted, or stopped. Panics inside the runner are captured
//! and surface as a Failed want, never as a crashed task.

use crate::factory::ProgressCtx;
use crate::reconciler::{EngineState, ReconcilerHandle};
use crate::registry::{ControlDirective, RuntimeWant};
use futures_util::FutureExt;
use reach_core::{Clock, Event, WantStatus};
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Pause between progress cycles, bounding CPU of busy loops.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(10);
/// Poll cadence while suspended.
const SUSPEND_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
enum Outcome {
    Achieved,
    Faulted(String),
    Stopped,
    Restart,
}

/// Launch the progression task for a want. The caller must have verified
/// status, runner presence, and connectivity.
pub(crate) fn spawn<C: Clock + 'static>(
    state: Arc<EngineState>,
    want: Arc<RuntimeWant>,
    clock: C,
) {
    let stop = want.refresh_stop_token(&state.shutdown);
    want.set_active(true);
    let tracker = state.tracker.clone();
    tracker.spawn(run_progression(state, want, clock, stop));
}

async fn run_progression<C: Clock>(
    state: Arc<EngineState>,
    want: Arc<RuntimeWant>,
    clock: C,
    stop: CancellationToken,
) {
    let handle = ReconcilerHandle::new(Arc::clone(&state));
    let name = want.name();

    let Some(mut runner) = want.take_runner() else {
        // Lost a race with delete or a concurrent launch.
        want.set_active(false);
        return;
    };

    transition(&state, &want, WantStatus::Reaching);
    let ctx = ProgressCtx::new(Arc::clone(&want), handle.clone());
    debug!(want = %name, "progression loop started");

    let outcome = match AssertUnwindSafe(runner.initialize(&ctx)).catch_unwind().await {
        Ok(Ok(())) => drive(&want, &mut *runner, &ctx, &clock, &stop, &name).await,
        Ok(Err(e)) => Outcome::Faulted(e.to_string()),
        Err(panic) => Outcome::Faulted(panic_message(panic)),
    };

    match &outcome {
        Outcome::Achieved => {
            transition(&state, &want, WantStatus::Achieved);
            // Completion events are synchronous: owners observe the child
            // achieved before this task exits.
            let child_id = want.id();
            for reference in &want.config_snapshot().metadata.owner_references {
                state.hub.emit(&Event::OwnerCompleted {
                    owner: reference.id.clone(),
                    child: child_id.clone(),
                    child_name: name.clone(),
                });
            }
            handle.check_completed_retrigger(name.clone());
        }
        Outcome::Faulted(message) => {
            warn!(want = %name, error = %message, "progression faulted");
            want.state.store("error", json!(message));
            transition(&state, &want, WantStatus::Failed);
        }
        Outcome::Stopped => {}
        Outcome::Restart => {
            transition(&state, &want, WantStatus::Idle);
        }
    }

    want.return_runner(runner);
    want.set_active(false);
    debug!(want = %name, ?outcome, "progression loop exited");
    // Consumers may retrigger; give the reconciler a chance to notice.
    handle.trigger_reconcile();
}

async fn drive<C: Clock>(
    want: &Arc<RuntimeWant>,
    runner: &mut dyn crate::factory::Progressable,
    ctx: &ProgressCtx,
    clock: &C,
    stop: &CancellationToken,
    name: &str,
) -> Outcome {
    loop {
        if stop.is_cancelled() {
            return Outcome::Stopped;
        }
        match drain_controls(want, stop).await {
            ControlFlow::Continue => {}
            ControlFlow::Stop => return Outcome::Stopped,
            ControlFlow::Restart => return Outcome::Restart,
        }

        want.state.begin_cycle();
        let result = AssertUnwindSafe(runner.progress(ctx)).catch_unwind().await;
        want.state.end_cycle(name, clock.epoch_ms());

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Outcome::Faulted(e.to_string()),
            Err(panic) => return Outcome::Faulted(panic_message(panic)),
        }

        if runner.is_achieved(ctx) {
            return Outcome::Achieved;
        }

        tokio::select! {
            _ = stop.cancelled() => return Outcome::Stopped,
            _ = tokio::time::sleep(PROGRESS_INTERVAL) => {}
        }
    }
}

enum ControlFlow {
    Continue,
    Stop,
    Restart,
}

/// Drain the control mailbox; parks the loop while suspended.
async fn drain_controls(want: &Arc<RuntimeWant>, stop: &CancellationToken) -> ControlFlow {
    let mut suspended = false;
    loop {
        while let Some(directive) = want.pop_control() {
            match directive {
                ControlDirective::Stop => return ControlFlow::Stop,
                ControlDirective::Restart => return ControlFlow::Restart,
                ControlDirective::Suspend => suspended = true,
                ControlDirective::Resume => suspended = false,
            }
        }
        if !suspended {
            return ControlFlow::Continue;
        }
        tokio::select! {
            _ = stop.cancelled() => return ControlFlow::Stop,
            _ = tokio::time::sleep(SUSPEND_POLL) => {}
        }
    }
}

/// Status transition with a StatusChanged event when it actually changes.
fn transition(state: &EngineState, want: &Arc<RuntimeWant>, to: WantStatus) {
    let from = want.set_status(to);
    if from != to {
        state.hub.emit(&Event::StatusChanged { id: want.id(), name: want.name(), from, to });
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("progress panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("progress panicked: {}", message)
    } else {
        "progress panicked".to_string()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
