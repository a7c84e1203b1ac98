// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Want configuration: metadata, desired-state spec, and lifecycle status

use crate::id::WantId;
use crate::label::{Labels, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameters of a want, keyed by name. Ordered so serialization is
/// deterministic and config diffs never trip on map ordering.
pub type Params = BTreeMap<String, Value>;

/// Reference from a child want to the parent that created it.
///
/// Parent/child linkage is by ID, never by pointer: a target looks its
/// children up in the registry through these references, and cascade
/// delete walks them in reverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub id: WantId,
    pub name: String,
    /// True when the owner controls the child's lifecycle (recipe children).
    #[serde(default)]
    pub controller: bool,
    #[serde(default)]
    pub kind: String,
}

/// Identity and wiring labels of a want.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Metadata {
    /// Unique runtime ID. Assigned during compile when the config omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WantId>,
    /// Name, unique within the live registry.
    pub name: String,
    /// Factory key selecting the want type implementation.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

/// Desired-state spec of a want.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WantSpec {
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
    /// Ordered label selectors identifying this want's providers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub using: Vec<Selector>,
    /// Provider want name -> state keys this want observes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state_subscriptions: BTreeMap<String, Vec<String>>,
    /// Event kinds this want accepts on its notification inbox (empty = all).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notification_filters: Vec<String>,
    /// Agent capabilities the want needs before it can run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

/// One declarative execution unit as submitted by a user or a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WantConfig {
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: WantSpec,
}

impl WantConfig {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The want's ID, if one has been assigned or configured.
    pub fn id(&self) -> Option<&WantId> {
        self.metadata.id.as_ref()
    }

    /// True when `owner` appears in this want's owner references.
    pub fn owned_by(&self, owner: &WantId) -> bool {
        self.metadata.owner_references.iter().any(|r| &r.id == owner)
    }
}

/// A full desired-state document: the set of wants to reconcile against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub wants: Vec<WantConfig>,
}

impl Config {
    pub fn is_empty(&self) -> bool {
        self.wants.is_empty()
    }

    /// Name-indexed view. The first occurrence of a duplicated name wins;
    /// later duplicates are transitional and dropped by the differ.
    pub fn by_name(&self) -> BTreeMap<&str, &WantConfig> {
        let mut map = BTreeMap::new();
        for want in &self.wants {
            map.entry(want.name()).or_insert(want);
        }
        map
    }

    pub fn find_by_id(&self, id: &WantId) -> Option<&WantConfig> {
        self.wants.iter().find(|w| w.id() == Some(id))
    }
}

/// Lifecycle status of a runtime want.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WantStatus {
    #[default]
    Idle,
    Reaching,
    Achieved,
    Failed,
    Terminated,
}

impl WantStatus {
    /// Terminal states: the progression loop will not run again without an
    /// explicit retrigger or update.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WantStatus::Achieved | WantStatus::Failed | WantStatus::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WantStatus::Idle => "idle",
            WantStatus::Reaching => "reaching",
            WantStatus::Achieved => "achieved",
            WantStatus::Failed => "failed",
            WantStatus::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for WantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[path = "want_tests.rs"]
mod tests;
