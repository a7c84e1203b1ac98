// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config and recipe error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("want at index {index} has an empty name")]
    EmptyWantName { index: usize },

    #[error("want '{want}' has an empty type")]
    EmptyWantType { want: String },

    #[error("duplicate want id '{id}' (wants '{first}' and '{second}')")]
    DuplicateId { id: String, first: String, second: String },

    #[error("recipe '{path}': {message}")]
    BadRecipe { path: String, message: String },
}
