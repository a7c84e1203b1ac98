// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe loading and template parameter expansion.
//!
//! A recipe is a YAML document describing the children a target want
//! spawns. `${name}` placeholders anywhere in the document substitute
//! from the recipe's default parameters merged with the caller's. A
//! string that consists of exactly one placeholder takes the parameter's
//! typed value, so numeric params survive expansion as numbers.

use crate::error::ConfigError;
use reach_core::{Params, WantConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// Regex pattern for ${parameter_name}
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// A result declared by a recipe: which child's state key carries the
/// recipe's outcome. Consumed by target wants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSpec {
    pub want_name: String,
    pub state_key: String,
}

#[derive(Deserialize)]
struct RecipeDoc {
    recipe: RecipeBody,
}

#[derive(Deserialize)]
struct RecipeBody {
    #[serde(default)]
    parameters: Params,
    #[serde(default)]
    result: Vec<serde_yaml::Value>,
    wants: Vec<serde_yaml::Value>,
}

/// Loads recipes from YAML files on disk.
#[derive(Debug, Clone, Default)]
pub struct FileRecipeLoader;

impl FileRecipeLoader {
    pub fn new() -> Self {
        Self
    }

    /// Expand the recipe at `path` with the caller's params layered over
    /// the recipe defaults, returning the child want configs.
    pub fn load(&self, path: &Path, params: &Params) -> Result<Vec<WantConfig>, ConfigError> {
        let doc = read_recipe(path)?;
        let mut merged = doc.recipe.parameters.clone();
        for (k, v) in params {
            merged.insert(k.clone(), v.clone());
        }

        let mut children = Vec::with_capacity(doc.recipe.wants.len());
        for node in doc.recipe.wants {
            let expanded = substitute(node, &merged);
            let want: WantConfig = serde_yaml::from_value(expanded).map_err(|e| bad(path, e))?;
            if want.name().is_empty() {
                return Err(ConfigError::BadRecipe {
                    path: path.display().to_string(),
                    message: "recipe want has an empty name after expansion".to_string(),
                });
            }
            children.push(want);
        }
        Ok(children)
    }

    /// The result specs declared by the recipe, expanded with defaults only.
    pub fn result_specs(&self, path: &Path) -> Result<Vec<ResultSpec>, ConfigError> {
        let doc = read_recipe(path)?;
        let defaults = doc.recipe.parameters;
        doc.recipe
            .result
            .into_iter()
            .map(|node| {
                serde_yaml::from_value(substitute(node, &defaults)).map_err(|e| bad(path, e))
            })
            .collect()
    }
}

fn read_recipe(path: &Path) -> Result<RecipeDoc, ConfigError> {
    let bytes = std::fs::read(path)?;
    serde_yaml::from_slice(&bytes).map_err(|e| bad(path, e))
}

fn bad(path: &Path, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::BadRecipe { path: path.display().to_string(), message: e.to_string() }
}

/// Recursively substitute `${name}` placeholders in a YAML tree.
fn substitute(node: serde_yaml::Value, params: &Params) -> serde_yaml::Value {
    match node {
        serde_yaml::Value::String(s) => substitute_string(s, params),
        serde_yaml::Value::Sequence(seq) => serde_yaml::Value::Sequence(
            seq.into_iter().map(|v| substitute(v, params)).collect(),
        ),
        serde_yaml::Value::Mapping(map) => serde_yaml::Value::Mapping(
            map.into_iter().map(|(k, v)| (k, substitute(v, params))).collect(),
        ),
        other => other,
    }
}

fn substitute_string(s: String, params: &Params) -> serde_yaml::Value {
    // A lone placeholder takes the parameter's typed value.
    if let Some(caps) = VAR_PATTERN.captures(&s) {
        if caps.get(0).is_some_and(|m| m.len() == s.len()) {
            if let Some(value) = params.get(&caps[1]) {
                if let Ok(yaml) = serde_yaml::to_value(value) {
                    return yaml;
                }
            }
        }
    }

    // Otherwise interpolate each occurrence. Unknown parameters are left as-is.
    let replaced = VAR_PATTERN.replace_all(&s, |caps: &regex::Captures| {
        match params.get(&caps[1]) {
            Some(serde_json::Value::String(v)) => v.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        }
    });
    serde_yaml::Value::String(replaced.into_owned())
}

#[cfg(test)]
#[path = "recipe_tests.rs"]
mod tests;
