// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types.
//!
//! The reconcile loop recovers locally and surfaces failures as want state
//! (`status = failed`, `state.error`); these types carry the messages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown want type '{0}'")]
    UnknownType(String),

    #[error("factory for want '{want}' failed: {message}")]
    Factory { want: String, message: String },

    #[error("duplicate want id '{0}'")]
    DuplicateId(String),

    #[error("child type '{child}' collides with parent type of '{parent}'")]
    ChildTypeCollision { parent: String, child: String },

    #[error("recipe error: {0}")]
    Recipe(String),

    #[error("want '{0}' not found")]
    WantNotFound(String),

    #[error("config error: {0}")]
    Config(#[from] reach_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure surfaced by a `Progressable`. The progression loop records the
/// message under `state.error` and marks the want Failed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProgressError {
    pub message: String,
}

impl ProgressError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<&str> for ProgressError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ProgressError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<EngineError> for ProgressError {
    fn from(e: EngineError) -> Self {
        Self { message: e.to_string() }
    }
}
