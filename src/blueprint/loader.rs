//! Loading and validation of blueprint declarations.
//!
//! Loading is a direct structural mapping from a YAML declaration onto
//! [`Blueprint`]; a missing required key is a schema error. Validation is a
//! separate semantic pass that callers use to decide whether to keep a
//! blueprint.

use std::fs;
use std::path::Path;

use crate::blueprint::{Blueprint, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::error::BlueprintError;

/// Loader and validator for blueprint declarations.
pub struct BlueprintLoader;

impl BlueprintLoader {
    /// Maps an already-parsed declaration onto a blueprint.
    ///
    /// # Errors
    ///
    /// Returns `BlueprintError::Schema` if a required key is missing or a field
    /// has the wrong shape.
    pub fn load(raw: serde_yaml::Value, source_name: &str) -> Result<Blueprint, BlueprintError> {
        serde_yaml::from_value(raw).map_err(|e| BlueprintError::Schema {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// Parses a YAML declaration from a string.
    pub fn load_str(content: &str, source_name: &str) -> Result<Blueprint, BlueprintError> {
        let raw: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| BlueprintError::Schema {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
        Self::load(raw, source_name)
    }

    /// Reads and parses a YAML declaration file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Blueprint, BlueprintError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::load_str(&content, &path.display().to_string())
    }

    /// Returns true if the blueprint passes semantic validation.
    ///
    /// Violations are not errors here; callers decide whether to skip or abort.
    pub fn validate(blueprint: &Blueprint) -> bool {
        Self::check(blueprint).is_ok()
    }

    /// Semantic validation reporting the first violation found.
    pub fn check(blueprint: &Blueprint) -> Result<(), BlueprintError> {
        let fail = |reason: &str| BlueprintError::Validation {
            blueprint_id: blueprint.blueprint_id.clone(),
            reason: reason.to_string(),
        };

        if blueprint.blueprint_id.is_empty() {
            return Err(fail("blueprint_id is empty"));
        }
        if blueprint.name.is_empty() {
            return Err(fail("name is empty"));
        }
        if blueprint.category.is_empty() {
            return Err(fail("category is empty"));
        }
        if blueprint.variants.is_empty() {
            return Err(fail("variants is empty"));
        }
        if blueprint.entry_points.is_empty() {
            return Err(fail("entry_points is empty"));
        }
        if blueprint.mutation_axes.is_empty() {
            return Err(fail("mutation_axes is empty"));
        }

        let range = blueprint.difficulty_range;
        if range.min > range.max
            || range.min < MIN_DIFFICULTY
            || range.max > MAX_DIFFICULTY
        {
            return Err(fail(&format!(
                "difficulty_range [{}, {}] must be ordered and within [{}, {}]",
                range.min, range.max, MIN_DIFFICULTY, MAX_DIFFICULTY
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{MutationAxis, Tier};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn xss_yaml() -> &'static str {
        r#"
blueprint_id: xss_001
name: Cross-Site Scripting
category: cross_site_scripting
difficulty_range: [1, 5]
description: |
  Untrusted input reaches an HTML sink.
variants:
  - Reflected XSS
  - Stored XSS
  - DOM-based XSS
entry_points:
  - search_parameter
  - comment_form
mutation_axes:
  contexts:
    - search_box
  filters:
    basic:
      - script_tag
    medium:
      - script_tag
      - onerror
"#
    }

    #[test]
    fn test_load_str_maps_fields() {
        let blueprint = BlueprintLoader::load_str(xss_yaml(), "inline").expect("should load");

        assert_eq!(blueprint.blueprint_id, "xss_001");
        assert_eq!(blueprint.category, "cross_site_scripting");
        assert_eq!(blueprint.variants.len(), 3);
        assert_eq!(blueprint.difficulty_range.max, 5);
        assert!(blueprint.description.starts_with("Untrusted input"));
        assert_eq!(
            blueprint.axis("contexts"),
            Some(&MutationAxis::Choices(vec!["search_box".to_string()]))
        );
        let filters = blueprint.axis("filters").expect("filters axis");
        assert_eq!(filters.tier(Tier::Medium).unwrap().len(), 2);
        assert!(BlueprintLoader::validate(&blueprint));
    }

    #[test]
    fn test_missing_required_key_is_schema_error() {
        let yaml = "blueprint_id: broken\nname: Broken\ncategory: x\n";
        let result = BlueprintLoader::load_str(yaml, "broken.yaml");
        match result {
            Err(BlueprintError::Schema {
                source_name,
                message,
            }) => {
                assert_eq!(source_name, "broken.yaml");
                assert!(message.contains("difficulty_range"));
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_axis_choices_load_as_text() {
        let yaml = xss_yaml().replace(
            "mutation_axes:\n",
            "mutation_axes:\n  delays: [2, 5]\n  ports: [80, 443]\n",
        );
        let blueprint = BlueprintLoader::load_str(&yaml, "inline").expect("should load");
        assert_eq!(blueprint.axis("delays").unwrap().choices().unwrap(), ["2", "5"]);
        assert_eq!(blueprint.axis("ports").unwrap().choices().unwrap(), ["80", "443"]);
    }

    #[test]
    fn test_malformed_axis_error_names_the_axis() {
        let yaml = xss_yaml().replace("mutation_axes:\n", "mutation_axes:\n  storage: [~]\n");
        match BlueprintLoader::load_str(&yaml, "inline") {
            Err(BlueprintError::Schema { message, .. }) => {
                assert!(message.contains("mutation axis 'storage'"), "{message}");
                assert!(message.contains("found null"), "{message}");
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_description_is_optional() {
        let yaml = xss_yaml().replace("description: |\n  Untrusted input reaches an HTML sink.\n", "");
        let blueprint = BlueprintLoader::load_str(&yaml, "inline").expect("should load");
        assert!(blueprint.description.is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_collections() {
        let mut blueprint = BlueprintLoader::load_str(xss_yaml(), "inline").unwrap();
        blueprint.variants.clear();
        assert!(!BlueprintLoader::validate(&blueprint));

        let mut blueprint = BlueprintLoader::load_str(xss_yaml(), "inline").unwrap();
        blueprint.mutation_axes.clear();
        assert!(!BlueprintLoader::validate(&blueprint));

        let mut blueprint = BlueprintLoader::load_str(xss_yaml(), "inline").unwrap();
        blueprint.entry_points.clear();
        assert!(matches!(
            BlueprintLoader::check(&blueprint),
            Err(BlueprintError::Validation { .. })
        ));

        let mut blueprint = BlueprintLoader::load_str(xss_yaml(), "inline").unwrap();
        blueprint.name.clear();
        assert!(!BlueprintLoader::validate(&blueprint));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let yaml = xss_yaml().replace("[1, 5]", "[4, 2]");
        let blueprint = BlueprintLoader::load_str(&yaml, "inline").unwrap();
        assert!(!BlueprintLoader::validate(&blueprint));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        write!(file, "{}", xss_yaml()).expect("failed to write");

        let blueprint = BlueprintLoader::load_file(file.path()).expect("should load");
        assert_eq!(blueprint.name, "Cross-Site Scripting");
    }

    #[test]
    fn test_load_file_missing_is_io_error() {
        let result = BlueprintLoader::load_file("/nonexistent/blueprint.yaml");
        assert!(matches!(result, Err(BlueprintError::Io(_))));
    }
}
