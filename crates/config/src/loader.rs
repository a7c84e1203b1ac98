// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desired-state config loading and validation

use crate::error::ConfigError;
use reach_core::Config;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Parse and validate a raw config document.
///
/// This is the validation gate the engine runs before Compile accepts a
/// document, both for file reloads and for submitted batches that came in
/// as bytes.
pub fn parse_config(bytes: &[u8]) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_slice(bytes)?;
    validate(&config)?;
    Ok(config)
}

/// Load a config document from a YAML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let bytes = std::fs::read(path)?;
    parse_config(&bytes)
}

/// Structural validation of a config document.
///
/// Rejects empty names/types and duplicated explicit ids. Duplicate names
/// are tolerated (they occur transiently while adds are in flight); the
/// engine keeps the first and drops the rest, so we only warn here.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut ids: HashMap<&str, &str> = HashMap::new();
    let mut names: HashMap<&str, usize> = HashMap::new();

    for (index, want) in config.wants.iter().enumerate() {
        if want.name().is_empty() {
            return Err(ConfigError::EmptyWantName { index });
        }
        if want.metadata.type_name.is_empty() {
            return Err(ConfigError::EmptyWantType { want: want.name().to_string() });
        }
        if let Some(id) = want.id() {
            if let Some(first) = ids.insert(id.as_str(), want.name()) {
                return Err(ConfigError::DuplicateId {
                    id: id.as_str().to_string(),
                    first: first.to_string(),
                    second: want.name().to_string(),
                });
            }
        }
        *names.entry(want.name()).or_insert(0) += 1;
    }

    for (name, count) in names {
        if count > 1 {
            warn!(want = name, count, "duplicate want name in config, keeping first");
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
