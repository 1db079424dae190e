//! Category registry.
//!
//! This module provides functionality for:
//! - Discovering blueprint declarations and engine manifests on disk
//! - Binding each category to one blueprint and one compiled engine
//! - Publishing rebuilt registries to concurrent readers
//!
//! A registry is built in one pass and never mutated afterwards; a rebuild
//! produces a fresh registry that replaces the old one as a whole.

pub mod discovery;
pub mod shared;

pub use discovery::{
    DiscoveryReport, DiscoverySources, EngineManifest, SkippedArtifact, BLUEPRINT_FILE_SUFFIX,
    ENGINE_FILE_SUFFIX,
};
pub use shared::SharedRegistry;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::blueprint::Blueprint;
use crate::error::RegistryError;
use crate::machine::MachineConfig;
use crate::mutation::EngineKind;

/// One usable category: its blueprint and the engine that mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    pub category: String,
    pub blueprint: Blueprint,
    pub engine: EngineKind,
}

/// Immutable lookup from category and blueprint id to engines and blueprints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRegistry {
    blueprints: BTreeMap<String, Blueprint>,
    engines: BTreeMap<String, EngineKind>,
    entries: BTreeMap<String, RegistryEntry>,
    report: DiscoveryReport,
}

impl CategoryRegistry {
    /// Scans the configured directories and builds a registry.
    ///
    /// Individual bad files are logged and skipped; an empty registry is a
    /// valid result.
    pub fn discover(sources: &DiscoverySources) -> Self {
        let mut report = DiscoveryReport::default();
        let blueprints = discovery::discover_blueprints(&sources.blueprints_dir, &mut report);
        let manifests = discovery::discover_manifests(sources.engines_dir.as_deref(), &mut report);

        let registry = Self::build(blueprints, manifests, report);
        info!(
            blueprints = registry.blueprints.len(),
            engines = registry.engines.len(),
            categories = registry.entries.len(),
            skipped = registry.report.skipped.len(),
            "Registry discovery complete"
        );
        registry
    }

    /// Builds a registry from already-loaded parts.
    pub fn from_parts(blueprints: Vec<Blueprint>, manifests: Vec<EngineManifest>) -> Self {
        Self::build(blueprints, manifests, DiscoveryReport::default())
    }

    fn build(
        blueprints: Vec<Blueprint>,
        manifests: Vec<EngineManifest>,
        mut report: DiscoveryReport,
    ) -> Self {
        let mut engines = BTreeMap::new();
        for manifest in manifests {
            let Some(category) = manifest.category() else {
                report.skip(
                    manifest.stem.clone(),
                    format!("file stem does not end in '{}'", discovery::ENGINE_STEM_SUFFIX),
                );
                continue;
            };
            match manifest.engine_type() {
                Ok(kind) => {
                    info!(category, engine = %kind, "Registered mutation engine");
                    engines.insert(category.to_string(), kind);
                }
                Err(reason) => report.skip(manifest.stem.clone(), reason),
            }
        }

        let mut by_id = BTreeMap::new();
        let mut entries = BTreeMap::new();
        for blueprint in blueprints {
            if by_id.contains_key(&blueprint.blueprint_id) {
                report.skip(
                    blueprint.blueprint_id.clone(),
                    "duplicate blueprint id".to_string(),
                );
                continue;
            }

            match engines.get(&blueprint.category) {
                Some(&engine) => {
                    entries
                        .entry(blueprint.category.clone())
                        .or_insert_with(|| RegistryEntry {
                            category: blueprint.category.clone(),
                            blueprint: blueprint.clone(),
                            engine,
                        });
                }
                None => warn!(
                    blueprint = %blueprint.blueprint_id,
                    category = %blueprint.category,
                    "No mutation engine for blueprint category"
                ),
            }
            by_id.insert(blueprint.blueprint_id.clone(), blueprint);
        }

        Self {
            blueprints: by_id,
            engines,
            entries,
            report,
        }
    }

    /// Looks up a blueprint by id.
    pub fn blueprint(&self, blueprint_id: &str) -> Result<&Blueprint, RegistryError> {
        self.blueprints
            .get(blueprint_id)
            .ok_or_else(|| RegistryError::BlueprintNotFound(blueprint_id.to_string()))
    }

    /// Looks up a blueprint by id, then by category.
    pub fn blueprint_for(&self, key: &str) -> Result<&Blueprint, RegistryError> {
        self.blueprints
            .get(key)
            .or_else(|| self.entries.get(key).map(|entry| &entry.blueprint))
            .ok_or_else(|| RegistryError::BlueprintNotFound(key.to_string()))
    }

    /// Returns the engine bound to a category.
    pub fn engine(&self, category: &str) -> Result<EngineKind, RegistryError> {
        self.engines
            .get(category)
            .copied()
            .ok_or_else(|| RegistryError::EngineNotFound {
                category: category.to_string(),
            })
    }

    /// Resolves a blueprint and its engine from a category or blueprint id.
    pub fn resolve(&self, key: &str) -> Result<(&Blueprint, EngineKind), RegistryError> {
        let blueprint = self.blueprint_for(key)?;
        let engine = self.engine(&blueprint.category)?;
        Ok((blueprint, engine))
    }

    /// Usable categories in key order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn categories(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Every loaded blueprint in id order.
    pub fn blueprints(&self) -> impl Iterator<Item = &Blueprint> {
        self.blueprints.values()
    }

    /// Ids of blueprints that have an engine, sorted.
    pub fn generatable_ids(&self) -> Vec<&str> {
        self.blueprints
            .values()
            .filter(|b| self.engines.contains_key(&b.category))
            .map(|b| b.blueprint_id.as_str())
            .collect()
    }

    /// Blueprints whose category has no engine.
    pub fn unmatched_blueprints(&self) -> Vec<&Blueprint> {
        self.blueprints
            .values()
            .filter(|b| !self.engines.contains_key(&b.category))
            .collect()
    }

    /// Categories with an engine but no blueprint.
    pub fn idle_engines(&self) -> Vec<&str> {
        self.engines
            .keys()
            .filter(|category| !self.entries.contains_key(*category))
            .map(String::as_str)
            .collect()
    }

    /// Resolves the category a machine was generated from.
    pub fn resolve_category(&self, machine: &MachineConfig) -> Result<&str, RegistryError> {
        self.blueprint(&machine.blueprint_id)
            .map(|blueprint| blueprint.category.as_str())
    }

    pub fn report(&self) -> &DiscoveryReport {
        &self.report
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
