//! Error types for hackforge operations.
//!
//! Defines the error taxonomy shared by every layer of the generation pipeline:
//! - Blueprint loading (schema) and semantic validation
//! - Registry lookups that miss a blueprint or an engine
//! - Engine manifests that cannot bind a category
//! - Mutation engine failures
//! - Generator facade failures wrapping the above with request context
//! - Export and render-contract failures

use thiserror::Error;

/// Errors raised while loading or validating a blueprint declaration.
#[derive(Debug, Error)]
pub enum BlueprintError {
    /// The declaration is missing a required key or has a wrongly-typed field.
    #[error("Blueprint declaration '{source_name}' does not match the schema: {message}")]
    Schema {
        source_name: String,
        message: String,
    },

    /// The declaration loaded but failed semantic validation.
    #[error("Blueprint '{blueprint_id}' failed validation: {reason}")]
    Validation {
        blueprint_id: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A lookup against the category registry that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("No blueprint registered for '{0}'")]
    BlueprintNotFound(String),

    #[error("No mutation engine registered for category '{category}'")]
    EngineNotFound { category: String },
}

/// Reasons an engine manifest cannot bind its category.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Unusable manifest file name: {0}")]
    InvalidFileName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No exported type ends in '{suffix}' (excluding '{excluded}')")]
    NoQualifyingType {
        suffix: &'static str,
        excluded: &'static str,
    },

    #[error("Unknown engine type '{0}'")]
    UnknownType(String),
}

/// Errors raised by a mutation engine while building a machine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("Blueprint '{blueprint_id}' declares no variants")]
    EmptyVariants { blueprint_id: String },

    #[error("Blueprint '{blueprint_id}' declares no entry points")]
    EmptyEntryPoints { blueprint_id: String },

    #[error("Mutation axis '{axis}' has no choices")]
    EmptyAxis { axis: String },

    #[error("Mutation axis '{axis}' is malformed: {reason}")]
    MalformedAxis { axis: String, reason: String },
}

/// Errors surfaced by the generator facade.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Mutation failed for category '{category}' (seed '{seed}', difficulty {difficulty}): {source}")]
    Mutation {
        category: String,
        seed: String,
        difficulty: u8,
        #[source]
        source: MutationError,
    },

    #[error("No blueprints available")]
    NoBlueprints,
}

impl GeneratorError {
    /// Returns true when the request named something the registry does not hold.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GeneratorError::Registry(_))
    }
}

/// Errors that can occur while exporting machines and campaigns.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No machines to export")]
    NoMachines,

    #[error("Campaign directory already holds a manifest: {0}")]
    CampaignExists(std::path::PathBuf),

    #[error("Template rendering error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised across the render contract.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Renderer failed for machine '{machine_id}': {message}")]
    Renderer { machine_id: String, message: String },
}
