//! Shared state and policies for mutation engines.
//!
//! [`MutationContext`] bundles the seed, its random source, and the helpers
//! every engine relies on: identifier derivation, variant selection, obstacle
//! tiering, hint generation and final assembly of the [`MachineConfig`].

use std::collections::BTreeMap;

use tracing::warn;

use crate::blueprint::{Blueprint, MutationAxis, Tier};
use crate::error::MutationError;
use crate::machine::{
    Application, Behavior, Constraints, FilterDescriptor, Flag, MachineConfig, Metadata,
};
use crate::mutation::obstacles::ObstacleTable;
use crate::mutation::rng::{hex_digest, SeededRng};

/// Default prefix wrapped around flag digests.
pub const DEFAULT_FLAG_PREFIX: &str = "HACKFORGE";
/// Default flag path inside the generated application.
pub const DEFAULT_FLAG_LOCATION: &str = "/var/www/html/flag.txt";
/// Name of the axis holding tiered obstacles.
pub const FILTERS_AXIS: &str = "filters";
/// Name of the axis holding injection contexts.
pub const CONTEXTS_AXIS: &str = "contexts";

/// Hex digits of the seed digest kept as the machine id.
const MACHINE_ID_LEN: usize = 16;
/// Hex digits of the flag digest kept inside the braces.
const FLAG_DIGEST_LEN: usize = 32;

/// The variant-specific part of a machine, produced by an engine before assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPlan {
    pub context: String,
    pub entry_point: String,
    pub details: BTreeMap<String, String>,
    pub filters: Vec<FilterDescriptor>,
    pub behavior: Behavior,
    /// Overrides the context's default flag location.
    pub flag_location: Option<String>,
}

impl VariantPlan {
    /// Creates a plan with direct-echo behavior and no details.
    pub fn new(context: String, entry_point: String, filters: Vec<FilterDescriptor>) -> Self {
        Self {
            context,
            entry_point,
            details: BTreeMap::new(),
            filters,
            behavior: Behavior::new("direct_echo"),
            flag_location: None,
        }
    }

    /// Records a variant-specific choice.
    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Replaces the runtime behavior.
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Places the flag somewhere other than the default location.
    pub fn with_flag_location(mut self, location: impl Into<String>) -> Self {
        self.flag_location = Some(location.into());
        self
    }
}

/// Seed, random source and shared policies owned by one engine instance.
pub struct MutationContext {
    seed: String,
    rng: SeededRng,
    flag_prefix: String,
    flag_location: String,
}

impl MutationContext {
    /// Creates a context whose random source is derived from `seed`.
    pub fn new(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        Self {
            rng: SeededRng::new(&seed),
            seed,
            flag_prefix: DEFAULT_FLAG_PREFIX.to_string(),
            flag_location: DEFAULT_FLAG_LOCATION.to_string(),
        }
    }

    /// Sets the prefix wrapped around flag digests.
    pub fn with_flag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.flag_prefix = prefix.into();
        self
    }

    /// Sets the default flag location.
    pub fn with_flag_location(mut self, location: impl Into<String>) -> Self {
        self.flag_location = location.into();
        self
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Machine identifier derived solely from the seed.
    pub fn machine_id(&self) -> String {
        hex_digest(&self.seed)[..MACHINE_ID_LEN].to_string()
    }

    /// Flag content derived solely from the seed: `PREFIX{<32 hex>}`.
    pub fn flag(&self) -> String {
        let digest = hex_digest(&format!("{}_flag", self.seed));
        format!("{}{{{}}}", self.flag_prefix, &digest[..FLAG_DIGEST_LEN])
    }

    /// Chooses one item uniformly.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        self.rng.choose(items)
    }

    /// Samples up to `count` distinct items.
    pub fn sample<T: Clone>(&mut self, items: &[T], count: usize) -> Vec<T> {
        self.rng.sample(items, count)
    }

    /// Generates a random alphanumeric string.
    pub fn random_string(&mut self, length: usize) -> String {
        self.rng.alphanumeric(length)
    }

    /// Returns a uniform integer in `low..=high`.
    pub fn number(&mut self, low: u32, high: u32) -> u32 {
        self.rng.range_inclusive(low, high)
    }

    /// Clamps a requested difficulty into the blueprint's declared range.
    pub fn effective_difficulty(&self, blueprint: &Blueprint, difficulty: u8) -> u8 {
        let effective = blueprint.difficulty_range.clamp(difficulty);
        if effective != difficulty {
            warn!(
                blueprint = %blueprint.blueprint_id,
                requested = difficulty,
                effective,
                "Difficulty outside blueprint range, clamped"
            );
        }
        effective
    }

    /// Selects a variant.
    ///
    /// At difficulty 2 or below the pool is the first half of the list when
    /// more than two variants exist; otherwise the whole list is used.
    pub fn select_variant(
        &mut self,
        blueprint: &Blueprint,
        difficulty: u8,
    ) -> Result<String, MutationError> {
        let variants = &blueprint.variants;
        let pool: &[String] = if difficulty <= 2 && variants.len() > 2 {
            &variants[..variants.len() / 2]
        } else {
            variants
        };

        self.rng
            .choose(pool)
            .cloned()
            .ok_or_else(|| MutationError::EmptyVariants {
                blueprint_id: blueprint.blueprint_id.clone(),
            })
    }

    /// Chooses from a flat axis, falling back to `default` when the axis is absent.
    pub fn choose_axis(
        &mut self,
        blueprint: &Blueprint,
        axis: &str,
        default: &str,
    ) -> Result<String, MutationError> {
        match blueprint.axis(axis) {
            None => Ok(default.to_string()),
            Some(MutationAxis::Choices(choices)) => {
                self.rng
                    .choose(choices)
                    .cloned()
                    .ok_or_else(|| MutationError::EmptyAxis {
                        axis: axis.to_string(),
                    })
            }
            Some(MutationAxis::Tiered(_)) => Err(MutationError::MalformedAxis {
                axis: axis.to_string(),
                reason: "expected a list of choices, found tiers".to_string(),
            }),
        }
    }

    /// Chooses the entry point.
    pub fn choose_entry_point(&mut self, blueprint: &Blueprint) -> Result<String, MutationError> {
        self.rng
            .choose(&blueprint.entry_points)
            .cloned()
            .ok_or_else(|| MutationError::EmptyEntryPoints {
                blueprint_id: blueprint.blueprint_id.clone(),
            })
    }

    /// Resolves the obstacles for a difficulty against an engine's table.
    ///
    /// Difficulty 1 has none; 2, 3 and 4+ draw from the basic, medium and
    /// advanced tiers of the `filters` axis. Does not consume randomness.
    pub fn select_filters(
        &self,
        blueprint: &Blueprint,
        difficulty: u8,
        table: &ObstacleTable,
    ) -> Result<Vec<FilterDescriptor>, MutationError> {
        let Some(tier) = Tier::for_difficulty(difficulty) else {
            return Ok(Vec::new());
        };

        match blueprint.axis(FILTERS_AXIS) {
            None => Ok(Vec::new()),
            Some(axis) => match axis.tier(tier) {
                Some(names) => Ok(table.resolve(names)),
                None => Err(MutationError::MalformedAxis {
                    axis: FILTERS_AXIS.to_string(),
                    reason: "expected tiers (basic/medium/advanced), found a flat list"
                        .to_string(),
                }),
            },
        }
    }

    /// Builds the ordered hint list for a machine.
    pub fn hints(filters: &[FilterDescriptor], context: &str, difficulty: u8) -> Vec<String> {
        let mut hints = vec![
            format!("Context: {}", context),
            format!("Difficulty: {}/5", difficulty),
        ];

        if filters.is_empty() {
            hints.push("No input filtering - direct attack possible".to_string());
        } else {
            let kinds: Vec<&str> = filters.iter().map(|f| f.kind.as_str()).collect();
            hints.push(format!("Filters active: {}", kinds.join(", ")));
        }

        if difficulty <= 2 {
            hints.push("Try basic payloads first".to_string());
        }

        hints
    }

    /// Estimated solve time shown to players.
    pub fn estimated_solve_time(difficulty: u8) -> String {
        let d = u32::from(difficulty);
        format!("{}-{} minutes", d * 10, d * 15)
    }

    /// Assembles the final configuration from a variant plan.
    pub fn finish(
        &self,
        blueprint: &Blueprint,
        variant: &str,
        difficulty: u8,
        plan: VariantPlan,
    ) -> MachineConfig {
        let hints = Self::hints(&plan.filters, &plan.context, difficulty);

        MachineConfig {
            machine_id: self.machine_id(),
            blueprint_id: blueprint.blueprint_id.clone(),
            variant: variant.to_string(),
            difficulty,
            seed: self.seed.clone(),
            application: Application {
                context: plan.context,
                variant: variant.to_string(),
                entry_point: plan.entry_point,
                details: plan.details,
            },
            constraints: Constraints {
                filters: plan.filters,
            },
            flag: Flag {
                content: self.flag(),
                location: plan
                    .flag_location
                    .unwrap_or_else(|| self.flag_location.clone()),
            },
            behavior: plan.behavior,
            metadata: Metadata {
                exploit_hints: hints,
                vulnerability_type: variant.to_string(),
                vuln_name: blueprint.name.clone(),
                category: blueprint.category.clone(),
                description: blueprint.description.trim().to_string(),
                estimated_solve_time: Self::estimated_solve_time(difficulty),
            },
        }
    }
}
