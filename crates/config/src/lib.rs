// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! reach-config: desired-state config files and recipe expansion

mod error;
mod loader;
mod recipe;

pub use error::ConfigError;
pub use loader::{load_config, parse_config, validate};
pub use recipe::{FileRecipeLoader, ResultSpec};
