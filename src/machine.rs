//! Machine configuration records.
//!
//! A [`MachineConfig`] is the deterministic output of one mutation: everything
//! the render layer needs to build a vulnerable application, plus provenance
//! fields that let the platform regenerate it from the seed alone. All maps are
//! ordered so serialization is byte-stable for a fixed seed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Target languages a filter descriptor carries snippets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Php,
    Python,
}

/// Where the vulnerable input flows in the generated application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub context: String,
    pub variant: String,
    pub entry_point: String,
    /// Variant-specific choices such as `sink`, `storage` or `encoding`.
    ///
    /// Serialized alongside the fixed fields, so keys must not collide with
    /// [`Application::RESERVED_KEYS`].
    #[serde(flatten)]
    pub details: BTreeMap<String, String>,
}

impl Application {
    /// Field names the flattened details may not use.
    pub const RESERVED_KEYS: [&'static str; 3] = ["context", "variant", "entry_point"];

    /// Returns true if `key` would shadow a fixed field when serialized.
    pub fn is_reserved_key(key: &str) -> bool {
        Self::RESERVED_KEYS.contains(&key)
    }
}

/// An input-sanitization obstacle placed in front of the vulnerable sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// Obstacle identifier as named in the blueprint.
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub php_code: String,
    pub python_code: String,
}

impl FilterDescriptor {
    /// Returns the code snippet for a target language.
    pub fn snippet(&self, language: Language) -> &str {
        match language {
            Language::Php => &self.php_code,
            Language::Python => &self.python_code,
        }
    }
}

/// Obstacles active on the machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub filters: Vec<FilterDescriptor>,
}

impl Constraints {
    /// Returns the obstacle identifiers in order.
    pub fn filter_types(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.kind.as_str()).collect()
    }
}

/// The secret a player must recover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub content: String,
    pub location: String,
}

/// Runtime behavior switches for the generated application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    /// How the application emits the tainted value, e.g. `direct_echo`.
    pub output: String,
    #[serde(flatten)]
    pub flags: BTreeMap<String, serde_json::Value>,
}

impl Behavior {
    /// Creates behavior with the given output mode and no extra flags.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            flags: BTreeMap::new(),
        }
    }

    /// Adds a behavior flag.
    pub fn with_flag(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.flags.insert(key.into(), value.into());
        self
    }
}

/// Human-facing metadata attached to a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub exploit_hints: Vec<String>,
    pub vulnerability_type: String,
    pub vuln_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub estimated_solve_time: String,
}

/// Complete configuration for one generated vulnerable machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// First 16 hex digits of the seed digest.
    pub machine_id: String,
    pub blueprint_id: String,
    pub variant: String,
    pub difficulty: u8,
    pub seed: String,
    pub application: Application,
    pub constraints: Constraints,
    pub flag: Flag,
    pub behavior: Behavior,
    pub metadata: Metadata,
}

impl MachineConfig {
    /// Returns the exploitation hints in order.
    pub fn hints(&self) -> &[String] {
        &self.metadata.exploit_hints
    }

    /// Returns the display name of the vulnerability family.
    pub fn display_name(&self) -> &str {
        &self.metadata.vuln_name
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a configuration previously written by [`MachineConfig::to_json_pretty`].
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}
