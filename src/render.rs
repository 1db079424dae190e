//! Contract between generation and the template layer.
//!
//! The template layer turns a machine configuration into a deployable bundle.
//! This module only defines that seam: what a renderer receives, what it must
//! hand back, and how a configuration is resolved back to its blueprint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::blueprint::Blueprint;
use crate::error::{RegistryError, RenderError};
use crate::machine::{Language, MachineConfig};
use crate::registry::CategoryRegistry;

/// Runtime the rendered application needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeEnvironment {
    pub language: Language,
    pub base_image: String,
    pub port: u16,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Deployable bundle produced for one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedArtifacts {
    /// Relative file path to file contents.
    pub source_code: BTreeMap<String, String>,
    pub environment: RuntimeEnvironment,
    pub flag: String,
    pub hints: Vec<String>,
}

/// Everything a renderer gets for one machine.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub machine: &'a MachineConfig,
    pub blueprint: &'a Blueprint,
    pub category: &'a str,
}

impl<'a> RenderRequest<'a> {
    /// Resolves the machine's blueprint and category from the registry.
    pub fn resolve(
        registry: &'a CategoryRegistry,
        machine: &'a MachineConfig,
    ) -> Result<Self, RegistryError> {
        let blueprint = registry.blueprint(&machine.blueprint_id)?;
        Ok(Self {
            machine,
            blueprint,
            category: &blueprint.category,
        })
    }

    /// Concatenated obstacle snippets for a language, in constraint order.
    pub fn filter_code(&self, language: Language) -> String {
        self.machine
            .constraints
            .filters
            .iter()
            .map(|filter| filter.snippet(language))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Implemented by the template layer.
pub trait Renderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedArtifacts, RenderError>;
}

/// Resolves a machine against the registry and renders it.
pub fn render_machine<R: Renderer + ?Sized>(
    renderer: &R,
    registry: &CategoryRegistry,
    machine: &MachineConfig,
) -> Result<RenderedArtifacts, RenderError> {
    let request = RenderRequest::resolve(registry, machine)?;
    renderer.render(&request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::BlueprintLoader;
    use crate::mutation::{MutationEngine, PathTraversalMutation};
    use crate::registry::EngineManifest;

    struct EchoRenderer;

    impl Renderer for EchoRenderer {
        fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedArtifacts, RenderError> {
            let mut source_code = BTreeMap::new();
            source_code.insert(
                "index.php".to_string(),
                format!(
                    "<?php\n$input = $_GET['{}'];\n{}\necho $input;\n",
                    request.machine.application.entry_point,
                    request.filter_code(Language::Php)
                ),
            );

            Ok(RenderedArtifacts {
                source_code,
                environment: RuntimeEnvironment {
                    language: Language::Php,
                    base_image: "php:8.2-apache".to_string(),
                    port: 80,
                    variables: BTreeMap::new(),
                },
                flag: request.machine.flag.content.clone(),
                hints: request.machine.hints().to_vec(),
            })
        }
    }

    fn registry() -> CategoryRegistry {
        let bp = BlueprintLoader::load_str(
            "blueprint_id: path_001\nname: Path Traversal\ncategory: path_traversal\ndifficulty_range: [1, 5]\nvariants: [Basic Path Traversal]\nentry_points: [file]\nmutation_axes:\n  filters:\n    medium: [dot_dot_slash, null_byte]\n",
            "render_test",
        )
        .unwrap();
        CategoryRegistry::from_parts(vec![bp], EngineManifest::builtin())
    }

    #[test]
    fn test_render_resolves_category() {
        let registry = registry();
        let bp = registry.blueprint("path_001").unwrap();
        let machine = PathTraversalMutation::new("render").mutate(bp, 3).unwrap();

        let artifacts = render_machine(&EchoRenderer, &registry, &machine).unwrap();
        let index = &artifacts.source_code["index.php"];
        assert!(index.contains("$_GET['file']"));
        assert!(index.contains("str_replace('../', '', $input);\n$input = str_replace(chr(0)"));
        assert_eq!(artifacts.flag, machine.flag.content);
        assert_eq!(registry.resolve_category(&machine).unwrap(), "path_traversal");
    }

    #[test]
    fn test_unknown_blueprint_is_registry_miss() {
        let registry = registry();
        let bp = registry.blueprint("path_001").unwrap();
        let mut machine = PathTraversalMutation::new("render").mutate(bp, 1).unwrap();
        machine.blueprint_id = "gone_001".to_string();

        let err = render_machine(&EchoRenderer, &registry, &machine).unwrap_err();
        assert!(matches!(err, RenderError::Registry(RegistryError::BlueprintNotFound(_))));
    }
}
