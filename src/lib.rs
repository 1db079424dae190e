//! hackforge: deterministic vulnerable-machine generation.
//!
//! This library turns declarative vulnerability blueprints plus a seed string
//! into reproducible machine configurations, and exports them for the render
//! and orchestration layers.

// Core modules
pub mod blueprint;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod machine;
pub mod mutation;
pub mod registry;
pub mod render;

// Re-export commonly used types
pub use blueprint::{Blueprint, BlueprintLoader};
pub use config::ForgeConfig;
pub use error::{
    BlueprintError, ExportError, GeneratorError, ManifestError, MutationError, RegistryError,
    RenderError,
};
pub use generator::{Campaign, Generator};
pub use machine::MachineConfig;
pub use mutation::{EngineKind, MutationEngine};
pub use registry::{CategoryRegistry, SharedRegistry};
