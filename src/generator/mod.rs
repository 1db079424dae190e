//! Generation facade for hackforge.
//!
//! This module ties the registry and the mutation engines together:
//!
//! 1. **Resolution** - Looking up the blueprint and engine for a category or blueprint id
//! 2. **Mutation** - Instantiating a freshly seeded engine per unit and running it
//! 3. **Batching** - Single machines, one machine per blueprint, and campaigns
//!
//! Every unit gets its own engine instance, so no random source is shared
//! between generations. Failures of one unit in a batch are logged and skipped.
//!
//! # Example
//!
//! ```ignore
//! use hackforge::config::ForgeConfig;
//! use hackforge::generator::Generator;
//!
//! let generator = Generator::from_config(&ForgeConfig::default());
//! let machine = generator.generate("xss_001", "alice_xss_001_1700000000", 2)?;
//! let campaign = generator.generate_campaign("alice", 3, 4)?;
//! ```

pub mod campaign;

pub use campaign::Campaign;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::blueprint::{Blueprint, DifficultyRange};
use crate::config::ForgeConfig;
use crate::error::GeneratorError;
use crate::machine::MachineConfig;
use crate::mutation::context::{DEFAULT_FLAG_LOCATION, DEFAULT_FLAG_PREFIX};
use crate::mutation::{MutationContext, SeededRng};
use crate::registry::{CategoryRegistry, SharedRegistry};

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Listing entry for one loaded blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlueprintSummary {
    pub blueprint_id: String,
    pub name: String,
    pub category: String,
    pub difficulty_range: DifficultyRange,
    pub variants: Vec<String>,
    /// Name of the engine bound to the category, if any.
    pub engine: Option<String>,
}

impl BlueprintSummary {
    fn new(blueprint: &Blueprint, registry: &CategoryRegistry) -> Self {
        Self {
            blueprint_id: blueprint.blueprint_id.clone(),
            name: blueprint.name.clone(),
            category: blueprint.category.clone(),
            difficulty_range: blueprint.difficulty_range,
            variants: blueprint.variants.clone(),
            engine: registry
                .engine(&blueprint.category)
                .ok()
                .map(|kind| kind.type_name().to_string()),
        }
    }
}

/// Seed for a single machine: `{user}_{blueprint}_{timestamp}`.
pub fn single_seed(user_id: &str, blueprint_id: &str, timestamp: i64) -> String {
    format!("{}_{}_{}", user_id, blueprint_id, timestamp)
}

/// Seed for the `ordinal`-th unit of a batch (1-based).
pub fn batch_seed(user_id: &str, blueprint_id: &str, timestamp: i64, ordinal: usize) -> String {
    format!("{}_{}_{}_{}", user_id, blueprint_id, timestamp, ordinal)
}

/// Seed driving blueprint selection for a user's request.
fn selection_seed(user_id: &str, timestamp: i64) -> String {
    format!("{}_{}", user_id, timestamp)
}

/// High-level generator over a shared category registry.
pub struct Generator {
    registry: Arc<SharedRegistry>,
    flag_prefix: String,
    flag_location: String,
}

impl Generator {
    /// Creates a generator over an existing registry handle.
    pub fn new(registry: Arc<SharedRegistry>) -> Self {
        Self {
            registry,
            flag_prefix: DEFAULT_FLAG_PREFIX.to_string(),
            flag_location: DEFAULT_FLAG_LOCATION.to_string(),
        }
    }

    /// Discovers a registry from the configured directories.
    pub fn from_config(config: &ForgeConfig) -> Self {
        let registry = SharedRegistry::discover(config.discovery_sources());
        Self::new(Arc::new(registry))
            .with_flag_prefix(config.flag_prefix.clone())
            .with_flag_location(config.flag_location.clone())
    }

    pub fn with_flag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.flag_prefix = prefix.into();
        self
    }

    pub fn with_flag_location(mut self, location: impl Into<String>) -> Self {
        self.flag_location = location.into();
        self
    }

    /// The shared registry handle, for rebuilds.
    pub fn shared_registry(&self) -> &Arc<SharedRegistry> {
        &self.registry
    }

    /// The currently published registry.
    pub fn registry(&self) -> Arc<CategoryRegistry> {
        self.registry.snapshot()
    }

    fn context(&self, seed: &str) -> MutationContext {
        MutationContext::new(seed)
            .with_flag_prefix(self.flag_prefix.clone())
            .with_flag_location(self.flag_location.clone())
    }

    /// Generates one machine from a category or blueprint id.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::Registry` when the blueprint or its engine is
    /// missing, and `GeneratorError::Mutation` when the engine fails.
    pub fn generate(&self, key: &str, seed: &str, difficulty: u8) -> Result<MachineConfig> {
        let registry = self.registry.snapshot();
        self.generate_with(&registry, key, seed, difficulty)
    }

    fn generate_with(
        &self,
        registry: &CategoryRegistry,
        key: &str,
        seed: &str,
        difficulty: u8,
    ) -> Result<MachineConfig> {
        let (blueprint, kind) = registry.resolve(key)?;
        let mut engine = kind.instantiate_with(self.context(seed));

        let machine = engine
            .mutate(blueprint, difficulty)
            .map_err(|source| GeneratorError::Mutation {
                category: blueprint.category.clone(),
                seed: seed.to_string(),
                difficulty,
                source,
            })?;

        debug!(
            category = %blueprint.category,
            blueprint = %blueprint.blueprint_id,
            seed,
            difficulty = machine.difficulty,
            variant = %machine.variant,
            machine_id = %machine.machine_id,
            "Generated machine"
        );
        Ok(machine)
    }

    /// Generates one machine for a user at the current time.
    pub fn generate_single(
        &self,
        blueprint_id: Option<&str>,
        difficulty: u8,
        user_id: &str,
    ) -> Result<MachineConfig> {
        self.generate_single_at(blueprint_id, difficulty, user_id, Utc::now().timestamp())
    }

    /// Generates one machine for a user at a fixed timestamp.
    ///
    /// Without a blueprint id, one is picked from the generatable blueprints
    /// by a random source seeded from the user and timestamp.
    pub fn generate_single_at(
        &self,
        blueprint_id: Option<&str>,
        difficulty: u8,
        user_id: &str,
        timestamp: i64,
    ) -> Result<MachineConfig> {
        let registry = self.registry.snapshot();

        let blueprint_id = match blueprint_id {
            Some(id) => id.to_string(),
            None => {
                let ids = registry.generatable_ids();
                let mut rng = SeededRng::new(&selection_seed(user_id, timestamp));
                rng.choose(&ids)
                    .map(|id| id.to_string())
                    .ok_or(GeneratorError::NoBlueprints)?
            }
        };

        let seed = single_seed(user_id, &blueprint_id, timestamp);
        self.generate_with(&registry, &blueprint_id, &seed, difficulty)
    }

    /// Generates one machine for every blueprint at the current time.
    pub fn generate_all(&self, difficulty: u8, user_id: &str) -> Vec<MachineConfig> {
        self.generate_all_at(difficulty, user_id, Utc::now().timestamp())
    }

    /// Generates one machine for every loaded blueprint, skipping failures.
    pub fn generate_all_at(&self, difficulty: u8, user_id: &str, timestamp: i64) -> Vec<MachineConfig> {
        let registry = self.registry.snapshot();
        let ids: Vec<String> = registry
            .blueprints()
            .map(|b| b.blueprint_id.clone())
            .collect();

        let machines = self.generate_batch(&registry, &ids, difficulty, user_id, timestamp);
        info!(
            requested = ids.len(),
            generated = machines.len(),
            "Generated one machine per blueprint"
        );
        machines
    }

    /// Generates a campaign for a user at the current time.
    pub fn generate_campaign(&self, user_id: &str, difficulty: u8, count: usize) -> Result<Campaign> {
        self.generate_campaign_at(user_id, difficulty, count, Utc::now())
    }

    /// Generates a campaign of `min(count, available)` distinct blueprints.
    ///
    /// Selection is drawn without replacement from the id-sorted generatable
    /// blueprints by a random source seeded from the user and timestamp.
    /// Failing units are skipped, so the campaign may be shorter than asked.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::NoBlueprints` if no blueprint has an engine.
    pub fn generate_campaign_at(
        &self,
        user_id: &str,
        difficulty: u8,
        count: usize,
        created_at: DateTime<Utc>,
    ) -> Result<Campaign> {
        let registry = self.registry.snapshot();
        let available = registry.generatable_ids();
        if available.is_empty() {
            return Err(GeneratorError::NoBlueprints);
        }

        let timestamp = created_at.timestamp();
        let mut rng = SeededRng::new(&selection_seed(user_id, timestamp));
        let selected: Vec<String> = rng
            .sample(&available, count)
            .into_iter()
            .map(str::to_string)
            .collect();

        if selected.len() < count {
            warn!(
                requested = count,
                available = available.len(),
                "Campaign larger than available blueprints, truncated"
            );
        }

        let mut campaign = Campaign::new(user_id, created_at, difficulty, count);
        campaign.machines = self.generate_batch(&registry, &selected, difficulty, user_id, timestamp);

        info!(
            campaign = %campaign.campaign_id,
            user = user_id,
            requested = count,
            generated = campaign.len(),
            "Campaign generated"
        );
        Ok(campaign)
    }

    fn generate_batch(
        &self,
        registry: &CategoryRegistry,
        blueprint_ids: &[String],
        difficulty: u8,
        user_id: &str,
        timestamp: i64,
    ) -> Vec<MachineConfig> {
        let mut machines = Vec::with_capacity(blueprint_ids.len());

        for (i, blueprint_id) in blueprint_ids.iter().enumerate() {
            let seed = batch_seed(user_id, blueprint_id, timestamp, i + 1);
            match self.generate_with(registry, blueprint_id, &seed, difficulty) {
                Ok(machine) => machines.push(machine),
                Err(e) if e.is_not_found() => {
                    warn!(blueprint = %blueprint_id, error = %e, "Skipping unit");
                }
                Err(e) => {
                    error!(blueprint = %blueprint_id, seed = %seed, difficulty, error = %e, "Skipping failed unit");
                }
            }
        }

        machines
    }

    /// Summaries of every loaded blueprint in id order.
    pub fn list_blueprints(&self) -> Vec<BlueprintSummary> {
        let registry = self.registry.snapshot();
        registry
            .blueprints()
            .map(|b| BlueprintSummary::new(b, &registry))
            .collect()
    }
}
