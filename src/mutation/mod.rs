//! Mutation engines.
//!
//! A mutation engine turns a [`Blueprint`] plus a difficulty into a
//! [`MachineConfig`]. Each engine is constructed from a single seed string and
//! owns the random source derived from it, so an engine instance must never be
//! shared across concurrent `mutate` calls.
//!
//! The set of engines is closed: [`EngineKind`] enumerates every compiled
//! engine and is the factory the registry binds categories to.
//!
//! # Example
//!
//! ```ignore
//! use hackforge::mutation::EngineKind;
//!
//! let mut engine = EngineKind::CrossSiteScripting.instantiate("alice_xss_001_1700000000");
//! let machine = engine.mutate(&blueprint, 2)?;
//! ```

pub mod command_injection;
pub mod context;
pub mod cross_site_scripting;
pub mod generic;
pub mod obstacles;
pub mod path_traversal;
pub mod rng;
pub mod sql_injection;

pub use command_injection::CommandInjectionMutation;
pub use context::{MutationContext, VariantPlan};
pub use cross_site_scripting::CrossSiteScriptingMutation;
pub use generic::GenericMutation;
pub use obstacles::{ObstacleSpec, ObstacleTable};
pub use path_traversal::PathTraversalMutation;
pub use rng::SeededRng;
pub use sql_injection::SqlInjectionMutation;

use serde::{Deserialize, Serialize};

use crate::blueprint::Blueprint;
use crate::error::MutationError;
use crate::machine::MachineConfig;

/// Suffix every concrete engine type name carries.
pub const ENGINE_TYPE_SUFFIX: &str = "Mutation";
/// Name of the contract itself, never a valid export.
pub const ABSTRACT_ENGINE_TYPE: &str = "MutationEngine";

/// Contract implemented by every per-category engine.
pub trait MutationEngine: Send {
    /// Exported type name, e.g. `CrossSiteScriptingMutation`.
    fn type_name(&self) -> &'static str;

    /// Produces a fully populated machine configuration.
    ///
    /// The difficulty is clamped into the blueprint's declared range and the
    /// effective value is recorded on the result.
    fn mutate(
        &mut self,
        blueprint: &Blueprint,
        difficulty: u8,
    ) -> Result<MachineConfig, MutationError>;
}

/// Closed set of compiled mutation engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EngineKind {
    CrossSiteScripting,
    PathTraversal,
    SqlInjection,
    CommandInjection,
    Generic,
}

impl EngineKind {
    pub fn all() -> [EngineKind; 5] {
        [
            EngineKind::CrossSiteScripting,
            EngineKind::PathTraversal,
            EngineKind::SqlInjection,
            EngineKind::CommandInjection,
            EngineKind::Generic,
        ]
    }

    /// Exported type name used in engine manifests.
    pub fn type_name(&self) -> &'static str {
        match self {
            EngineKind::CrossSiteScripting => "CrossSiteScriptingMutation",
            EngineKind::PathTraversal => "PathTraversalMutation",
            EngineKind::SqlInjection => "SqlInjectionMutation",
            EngineKind::CommandInjection => "CommandInjectionMutation",
            EngineKind::Generic => "GenericMutation",
        }
    }

    /// Looks up an engine by its exported type name.
    pub fn from_type_name(name: &str) -> Option<EngineKind> {
        Self::all().into_iter().find(|kind| kind.type_name() == name)
    }

    /// File stem of the built-in manifest, or `None` for engines that are only
    /// bound through manifests on disk.
    pub fn module_stem(&self) -> Option<&'static str> {
        match self {
            EngineKind::CrossSiteScripting => Some("cross_site_scripting_mutation"),
            EngineKind::PathTraversal => Some("path_traversal_mutation"),
            EngineKind::SqlInjection => Some("sql_injection_mutation"),
            EngineKind::CommandInjection => Some("command_injection_mutation"),
            EngineKind::Generic => None,
        }
    }

    /// Creates an engine seeded with `seed` and default flag settings.
    pub fn instantiate(&self, seed: &str) -> Box<dyn MutationEngine> {
        self.instantiate_with(MutationContext::new(seed))
    }

    /// Creates an engine around a prepared context.
    pub fn instantiate_with(&self, ctx: MutationContext) -> Box<dyn MutationEngine> {
        match self {
            EngineKind::CrossSiteScripting => Box::new(CrossSiteScriptingMutation::with_context(ctx)),
            EngineKind::PathTraversal => Box::new(PathTraversalMutation::with_context(ctx)),
            EngineKind::SqlInjection => Box::new(SqlInjectionMutation::with_context(ctx)),
            EngineKind::CommandInjection => Box::new(CommandInjectionMutation::with_context(ctx)),
            EngineKind::Generic => Box::new(GenericMutation::with_context(ctx)),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
