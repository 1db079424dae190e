//! Fallback engine for categories without a dedicated implementation.
//!
//! The generic engine knows nothing about its category beyond the blueprint.
//! Every flat axis other than `contexts` contributes one recorded choice unless
//! its name is a fixed application field. The obstacle table is synthesized
//! from the filter names the blueprint declares, using placeholder snippets.

use std::collections::BTreeMap;

use tracing::warn;

use crate::blueprint::{Blueprint, MutationAxis};
use crate::error::MutationError;
use crate::machine::{Application, Behavior, MachineConfig};
use crate::mutation::context::{MutationContext, VariantPlan, CONTEXTS_AXIS, FILTERS_AXIS};
use crate::mutation::obstacles::ObstacleTable;
use crate::mutation::MutationEngine;

/// Mutation engine bound to categories through manifests on disk.
pub struct GenericMutation {
    ctx: MutationContext,
}

impl GenericMutation {
    pub fn new(seed: impl Into<String>) -> Self {
        Self::with_context(MutationContext::new(seed))
    }

    pub fn with_context(ctx: MutationContext) -> Self {
        Self { ctx }
    }

    fn obstacle_table(blueprint: &Blueprint) -> ObstacleTable {
        match blueprint.axis(FILTERS_AXIS) {
            Some(axis) => ObstacleTable::synthesized(axis.all_choices()),
            None => ObstacleTable::default(),
        }
    }

    fn details(&mut self, blueprint: &Blueprint) -> Result<BTreeMap<String, String>, MutationError> {
        let mut details = BTreeMap::new();
        for (name, axis) in &blueprint.mutation_axes {
            if name == CONTEXTS_AXIS || name == FILTERS_AXIS {
                continue;
            }
            if Application::is_reserved_key(name) {
                warn!(
                    blueprint = %blueprint.blueprint_id,
                    axis = %name,
                    "Axis name collides with a fixed application field, ignoring it"
                );
                continue;
            }
            if let MutationAxis::Choices(choices) = axis {
                let choice = self
                    .ctx
                    .choose(choices)
                    .cloned()
                    .ok_or_else(|| MutationError::EmptyAxis { axis: name.clone() })?;
                details.insert(name.clone(), choice);
            }
        }
        Ok(details)
    }
}

impl MutationEngine for GenericMutation {
    fn type_name(&self) -> &'static str {
        "GenericMutation"
    }

    fn mutate(
        &mut self,
        blueprint: &Blueprint,
        difficulty: u8,
    ) -> Result<MachineConfig, MutationError> {
        let difficulty = self.ctx.effective_difficulty(blueprint, difficulty);
        let variant = self.ctx.select_variant(blueprint, difficulty)?;
        let context = self.ctx.choose_axis(blueprint, CONTEXTS_AXIS, "default_context")?;
        let details = self.details(blueprint)?;
        let entry_point = self.ctx.choose_entry_point(blueprint)?;

        let table = Self::obstacle_table(blueprint);
        let filters = self.ctx.select_filters(blueprint, difficulty, &table)?;

        let mut plan = VariantPlan::new(context, entry_point, filters)
            .with_behavior(Behavior::new("direct_echo"));
        plan.details = details;

        Ok(self.ctx.finish(blueprint, &variant, difficulty, plan))
    }
}
