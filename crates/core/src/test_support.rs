// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared by the engine crate and the workspace spec suite.

use crate::id::WantId;
use crate::want::{Metadata, OwnerReference, WantConfig, WantSpec};
use serde_json::Value;

/// Fluent builder for [`WantConfig`] fixtures.
pub struct WantConfigBuilder {
    config: WantConfig,
}

/// Start building a want with the given name and type.
pub fn want(name: &str, type_name: &str) -> WantConfigBuilder {
    WantConfigBuilder {
        config: WantConfig {
            metadata: Metadata {
                id: None,
                name: name.to_string(),
                type_name: type_name.to_string(),
                labels: Default::default(),
                owner_references: Vec::new(),
            },
            spec: WantSpec::default(),
        },
    }
}

impl WantConfigBuilder {
    pub fn id(mut self, id: &str) -> Self {
        self.config.metadata.id = Some(WantId::from_string(id));
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.config.metadata.labels.insert(key.to_string(), value.to_string());
        self
    }

    /// Append one `using` selector from key/value pairs.
    pub fn using(mut self, pairs: &[(&str, &str)]) -> Self {
        self.config
            .spec
            .using
            .push(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.spec.params.insert(key.to_string(), value.into());
        self
    }

    pub fn owner(mut self, id: &WantId, name: &str) -> Self {
        self.config.metadata.owner_references.push(OwnerReference {
            id: id.clone(),
            name: name.to_string(),
            controller: true,
            kind: "Target".to_string(),
        });
        self
    }

    pub fn notification_filters(mut self, kinds: &[&str]) -> Self {
        self.config.spec.notification_filters =
            kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn build(self) -> WantConfig {
        self.config
    }
}
