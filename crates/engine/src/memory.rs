// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory-file persistence of the runtime snapshot.
//!
//! A single YAML document `{timestamp, execution_id, wants}` rewritten
//! atomically (temp file + rename) when the hash of the wants section
//! changes. The timestamp is excluded from the hash so an unchanged
//! runtime never rewrites the file.

use crate::error::EngineError;
use crate::reconciler::EngineState;
use chrono::{DateTime, Utc};
use reach_core::{ExecutionId, HistoryEntry, WantConfig, WantStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// One want as persisted in the memory file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MemoryWant {
    #[serde(flatten)]
    pub config: WantConfig,
    pub status: WantStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MemoryDoc {
    pub timestamp: DateTime<Utc>,
    pub execution_id: ExecutionId,
    pub wants: Vec<MemoryWant>,
}

/// Serialize the runtime snapshot to `path` when it changed since the
/// last write. Returns whether a write happened.
pub(crate) fn dump_memory_file(
    state: &EngineState,
    path: &Path,
    last_hash: &mut Option<String>,
) -> Result<bool, EngineError> {
    let wants: Vec<MemoryWant> = state
        .registry
        .read()
        .snapshot()
        .iter()
        .map(|w| MemoryWant {
            config: w.config_snapshot(),
            status: w.status(),
            state: w.state.snapshot(),
            state_history: w.state.state_history(),
            parameter_history: w.state.parameter_history(),
        })
        .collect();

    let body = serde_yaml::to_string(&wants)?;
    let hash = format!("{:x}", Sha256::digest(body.as_bytes()));
    if last_hash.as_deref() == Some(hash.as_str()) {
        return Ok(false);
    }

    let doc = MemoryDoc {
        timestamp: Utc::now(),
        execution_id: state.execution_id.clone(),
        wants,
    };
    let serialized = serde_yaml::to_string(&doc)?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, serialized)?;
    std::fs::rename(&tmp, path)?;

    debug!(path = %path.display(), hash = reach_core::short(&hash, 12), "memory file written");
    *last_hash = Some(hash);
    Ok(true)
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
