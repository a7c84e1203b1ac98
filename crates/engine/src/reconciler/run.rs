// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconcile loop: one task multiplexing the trigger, add, and delete
//! channels with the config-file and stats tickers.

use super::{reconcile, retrigger, CommandChannels, EngineState, ReconcilerOptions, TriggerCommand};
use crate::memory;
use crate::registry::ControlDirective;
use reach_core::{Clock, Event, WantConfig, WantId, WantStatus};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const CONFIG_POLL_INTERVAL: Duration = Duration::from_millis(50);
const STATS_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) async fn run_loop<C: Clock + 'static>(
    state: Arc<EngineState>,
    clock: C,
    options: ReconcilerOptions,
    mut channels: CommandChannels,
) {
    let mut config_tick = tokio::time::interval(CONFIG_POLL_INTERVAL);
    config_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats_tick = tokio::time::interval(STATS_INTERVAL);
    stats_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_config_hash: Option<String> = None;
    let mut last_memory_hash: Option<String> = None;

    info!(execution = %state.execution_id.short(12), "reconcile loop started");
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            Some(command) = channels.trigger_rx.recv() => match command {
                TriggerCommand::Reconcile => reconcile(&state, &clock),
                TriggerCommand::Control { id, directive } => {
                    handle_control(&state, &id, directive);
                }
                TriggerCommand::CheckCompletedRetrigger { provider } => {
                    retrigger::retrigger_users(&state, &clock, &provider);
                }
            },
            Some(batch) = channels.add_rx.recv() => {
                handle_add(&state, batch);
                reconcile(&state, &clock);
            }
            Some(ids) = channels.delete_rx.recv() => {
                handle_delete(&state, ids);
                reconcile(&state, &clock);
            }
            _ = config_tick.tick() => {
                poll_config_file(&state, &clock, &options, &mut last_config_hash);
            }
            _ = stats_tick.tick() => {
                dump_memory(&state, &options, &mut last_memory_hash);
            }
        }
    }
    info!("reconcile loop stopped");
}

/// Append an add batch to the desired state. Names already present stay
/// untouched; a second add with the same name is silently dropped.
fn handle_add(state: &Arc<EngineState>, batch: Vec<WantConfig>) {
    let mut desired = state.desired.lock();
    for want in batch {
        let duplicate = desired.wants.iter().any(|w| w.name() == want.name());
        if duplicate {
            warn!(want = want.name(), "add for duplicate name dropped");
            continue;
        }
        debug!(want = want.name(), "queued want accepted into desired state");
        desired.wants.push(want);
    }
}

fn handle_delete(state: &Arc<EngineState>, ids: Vec<WantId>) {
    for id in ids {
        super::delete_want_by_id(state, &id);
    }
}

fn handle_control(state: &Arc<EngineState>, id: &WantId, directive: ControlDirective) {
    let Some((want, name)) = state.registry.read().find_by_id(id) else {
        warn!(id = %id.short(12), "control target not found");
        return;
    };
    debug!(want = %name, ?directive, "forwarding control directive");

    // Restarting an inactive want does not need the mailbox; reset it for
    // the next Start phase directly.
    if directive == ControlDirective::Restart && !want.is_active() {
        let previous = want.set_status(WantStatus::Idle);
        if previous != WantStatus::Idle {
            state.hub.emit(&Event::StatusChanged {
                id: want.id(),
                name,
                from: previous,
                to: WantStatus::Idle,
            });
        }
        let _ = state.trigger_tx.try_send(TriggerCommand::Reconcile);
        return;
    }
    want.push_control(directive);
}

/// Batch mode: reload the source config file when its hash changes.
fn poll_config_file<C: Clock + 'static>(
    state: &Arc<EngineState>,
    clock: &C,
    options: &ReconcilerOptions,
    last_hash: &mut Option<String>,
) {
    let Some(path) = &options.config_path else {
        return;
    };
    state.config_polls.fetch_add(1, std::sync::atomic::Ordering::Release);
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "config file unreadable, skipping poll");
            return;
        }
    };
    let hash = format!("{:x}", Sha256::digest(&bytes));
    if last_hash.as_deref() == Some(hash.as_str()) {
        return;
    }
    *last_hash = Some(hash);

    match reach_config::parse_config(&bytes) {
        Ok(config) => {
            info!(path = %path.display(), wants = config.wants.len(), "config file changed, reloading");
            *state.desired.lock() = config;
            reconcile(state, clock);
        }
        Err(e) => warn!(path = %path.display(), error = %e, "config file invalid, keeping last"),
    }
}

fn dump_memory(
    state: &Arc<EngineState>,
    options: &ReconcilerOptions,
    last_hash: &mut Option<String>,
) {
    let Some(path) = &options.memory_path else {
        return;
    };
    if let Err(e) = memory::dump_memory_file(state, path, last_hash) {
        warn!(path = %path.display(), error = %e, "memory file write failed");
    }
}
