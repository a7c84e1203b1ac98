// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Label and selector matching.
//!
//! Wants carry string labels; consumers declare selectors (`using`) that
//! identify their providers. Both sides are ordered maps so iteration and
//! serialization stay deterministic across reconcile cycles.

use std::collections::BTreeMap;

/// Labels attached to a want's metadata.
pub type Labels = BTreeMap<String, String>;

/// A selector: every entry must match a label for the selector to match.
pub type Selector = BTreeMap<String, String>;

/// True when every `(key, value)` pair of the selector is present in the
/// labels. An empty selector matches any label set.
pub fn selector_matches(labels: &Labels, selector: &Selector) -> bool {
    selector.iter().all(|(k, v)| labels.get(k).is_some_and(|lv| lv == v))
}

/// Canonical `key=value` form, used as the key of the label-to-users
/// reverse index.
pub fn label_key(key: &str, value: &str) -> String {
    format!("{}={}", key, value)
}

#[cfg(test)]
#[path = "label_tests.rs"]
mod tests;
