// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target wants: recipe-driven parent/child orchestration.
//!
//! A target expands a recipe into children stamped with an owner
//! reference back to itself, tracks their completions through its
//! notification inbox, and achieves once every declared child achieved.
//! Parameter pushes on a target cascade to its children through a name
//! translation (`primary_<k>` on the parent maps to `<k>` on a child).

use crate::error::{EngineError, ProgressError};
use crate::factory::{Connectivity, ProgressCtx, Progressable, TypeRegistry, WantType};
use crate::reconciler::EngineState;
use async_trait::async_trait;
use reach_core::{Event, OwnerReference, Params, WantConfig, WantId};
use reach_config::ResultSpec;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Type key of the built-in target controller.
pub const TARGET_TYPE: &str = "target";

/// Recipe loading contract consumed by target wants.
pub trait RecipeLoader: Send + Sync {
    /// Expand the recipe into child configs, parameterized by the
    /// target's params.
    fn load(&self, path: &str, params: &Params) -> Result<Vec<WantConfig>, EngineError>;

    /// Result declarations of the recipe.
    fn result_specs(&self, path: &str) -> Result<Vec<ResultSpec>, EngineError>;
}

impl RecipeLoader for reach_config::FileRecipeLoader {
    fn load(&self, path: &str, params: &Params) -> Result<Vec<WantConfig>, EngineError> {
        Ok(self.load(Path::new(path), params)?)
    }

    fn result_specs(&self, path: &str) -> Result<Vec<ResultSpec>, EngineError> {
        Ok(self.result_specs(Path::new(path))?)
    }
}

/// Register the built-in `target` type into a registry.
pub(crate) fn register_target_type(types: &mut TypeRegistry, recipes: Arc<dyn RecipeLoader>) {
    types.register(
        TARGET_TYPE,
        WantType::new(Connectivity::default(), move |_, _| {
            Ok(Box::new(TargetWant::new(Arc::clone(&recipes))))
        }),
    );
}

struct TargetWant {
    recipes: Arc<dyn RecipeLoader>,
    recipe_path: Option<String>,
    children_created: bool,
    results_collected: bool,
    expected: BTreeSet<String>,
    completed: BTreeSet<String>,
}

impl TargetWant {
    fn new(recipes: Arc<dyn RecipeLoader>) -> Self {
        Self {
            recipes,
            recipe_path: None,
            children_created: false,
            results_collected: false,
            expected: BTreeSet::new(),
            completed: BTreeSet::new(),
        }
    }

    fn spawn_children(&mut self, ctx: &ProgressCtx) -> Result<(), ProgressError> {
        let Some(recipe) = ctx.param("recipe").and_then(|v| v.as_str().map(String::from)) else {
            return Err(ProgressError::new("target requires a string 'recipe' param"));
        };

        let mut params = ctx.params();
        params.remove("recipe");
        let mut children = self.recipes.load(&recipe, &params)?;

        // Type safety: a child of the parent's own type would recurse
        // without bound. Hard config error.
        let own_type = ctx.type_name();
        if let Some(bad) = children.iter().find(|c| c.metadata.type_name == own_type) {
            return Err(EngineError::ChildTypeCollision {
                parent: ctx.name(),
                child: bad.name().to_string(),
            }
            .into());
        }

        let owner = OwnerReference {
            id: ctx.id(),
            name: ctx.name(),
            controller: true,
            kind: "Target".to_string(),
        };
        for child in &mut children {
            child.metadata.owner_references.push(owner.clone());
            self.expected.insert(child.name().to_string());
        }

        info!(
            target = %ctx.name(),
            recipe = %recipe,
            children = children.len(),
            "spawning recipe children"
        );
        ctx.orchestrator().submit_add(children);
        self.recipe_path = Some(recipe);
        self.children_created = true;
        ctx.store_state("children_created", true);
        ctx.store_state("total_children", self.expected.len());
        Ok(())
    }

    fn observe_completions(&mut self, ctx: &ProgressCtx) {
        let own_id = ctx.id();
        for event in ctx.take_notifications() {
            if let Event::OwnerCompleted { owner, child_name, .. } = event {
                if owner == own_id && self.expected.contains(&child_name) {
                    self.completed.insert(child_name);
                }
            }
        }
        let percentage = if self.expected.is_empty() {
            100
        } else {
            100 * self.completed.len() / self.expected.len()
        };
        ctx.store_state("achieving_percentage", percentage);
    }

    /// Once every child completed, copy the recipe's declared result keys
    /// from the children's state into the target's own.
    fn collect_results(&mut self, ctx: &ProgressCtx) {
        if self.results_collected || self.completed.len() != self.expected.len() {
            return;
        }
        self.results_collected = true;
        let Some(path) = &self.recipe_path else {
            return;
        };
        let specs = match self.recipes.result_specs(path) {
            Ok(specs) => specs,
            Err(e) => {
                warn!(target = %ctx.name(), error = %e, "recipe result lookup failed");
                return;
            }
        };
        if specs.is_empty() {
            return;
        }
        let mut results = serde_json::Map::new();
        for spec in specs {
            let Some(child) = ctx.orchestrator().get(&spec.want_name) else {
                continue;
            };
            if let Some(value) = child.state.get(&spec.state_key) {
                results.insert(spec.want_name, value);
            }
        }
        ctx.store_state("results", Value::Object(results));
    }
}

#[async_trait]
impl Progressable for TargetWant {
    async fn progress(&mut self, ctx: &ProgressCtx) -> Result<(), ProgressError> {
        if !self.children_created {
            self.spawn_children(ctx)?;
        }
        self.observe_completions(ctx);
        self.collect_results(ctx);
        Ok(())
    }

    fn is_achieved(&self, _ctx: &ProgressCtx) -> bool {
        self.children_created && self.completed.len() == self.expected.len()
    }
}

/// Translate a parent parameter name for a child: `primary_<k>` maps to
/// `<k>` when the child declares it; otherwise exact names pass through
/// to children that declare them.
pub(crate) fn translate_param(parent_key: &str, child_params: &Params) -> Option<String> {
    if let Some(stripped) = parent_key.strip_prefix("primary_") {
        if child_params.contains_key(stripped) {
            return Some(stripped.to_string());
        }
    }
    if child_params.contains_key(parent_key) {
        return Some(parent_key.to_string());
    }
    None
}

/// Apply a parameter to a want and cascade it to controlled children.
pub(crate) fn push_parameter(
    state: &Arc<EngineState>,
    id: &WantId,
    key: &str,
    value: Value,
    now_ms: u64,
) {
    let Some((want, name)) = state.registry.read().find_by_id(id) else {
        warn!(id = %id.short(12), "parameter push target not found");
        return;
    };
    want.update_parameter(key, value.clone(), now_ms);
    state.hub.emit(&Event::ParameterUpdated {
        id: id.clone(),
        name,
        key: key.to_string(),
    });

    let children = state.param_routes.lock().get(id).cloned().unwrap_or_default();
    for child_name in children {
        let Some(child) = state.registry.read().get(&child_name) else {
            continue;
        };
        let Some(child_key) = translate_param(key, &child.params()) else {
            continue;
        };
        push_parameter(state, &child.id(), &child_key, value.clone(), now_ms);
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
