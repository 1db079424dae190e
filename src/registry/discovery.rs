//! On-disk discovery of blueprint declarations and engine manifests.
//!
//! Both collections are matched by file-name suffix in a single directory and
//! visited in file-name order, so repeated scans over the same files produce
//! the same result.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::blueprint::{Blueprint, BlueprintLoader};
use crate::error::ManifestError;
use crate::mutation::{EngineKind, ABSTRACT_ENGINE_TYPE, ENGINE_TYPE_SUFFIX};

/// File-name suffix of blueprint declarations.
pub const BLUEPRINT_FILE_SUFFIX: &str = "_blueprint.yaml";
/// File-name suffix of engine manifests.
pub const ENGINE_FILE_SUFFIX: &str = "_mutation.yaml";
/// Manifest stem suffix stripped to obtain the category key.
pub const ENGINE_STEM_SUFFIX: &str = "_mutation";

/// Directories scanned when building a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySources {
    pub blueprints_dir: PathBuf,
    /// Extra engine manifests; built-in manifests are always present.
    pub engines_dir: Option<PathBuf>,
}

impl DiscoverySources {
    pub fn new(blueprints_dir: impl Into<PathBuf>) -> Self {
        Self {
            blueprints_dir: blueprints_dir.into(),
            engines_dir: None,
        }
    }

    pub fn with_engines_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.engines_dir = Some(dir.into());
        self
    }
}

/// Declares which engine types a manifest file exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineManifest {
    /// File stem, e.g. `cross_site_scripting_mutation`.
    #[serde(skip)]
    pub stem: String,
    pub exports: Vec<String>,
}

impl EngineManifest {
    pub fn new(stem: impl Into<String>, exports: Vec<String>) -> Self {
        Self {
            stem: stem.into(),
            exports,
        }
    }

    /// Manifests contributed by every compiled engine that owns a category.
    pub fn builtin() -> Vec<EngineManifest> {
        EngineKind::all()
            .into_iter()
            .filter_map(|kind| {
                kind.module_stem()
                    .map(|stem| EngineManifest::new(stem, vec![kind.type_name().to_string()]))
            })
            .collect()
    }

    /// Parses a manifest file; the stem is taken from the file name.
    pub fn load_file(path: &Path) -> Result<EngineManifest, ManifestError> {
        let stem = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(".yaml"))
            .ok_or_else(|| ManifestError::InvalidFileName(path.display().to_string()))?;

        let content = fs::read_to_string(path)?;
        let mut manifest: EngineManifest = serde_yaml::from_str(&content)?;
        manifest.stem = stem.to_string();
        Ok(manifest)
    }

    /// Category key: the file stem without the engine suffix.
    pub fn category(&self) -> Option<&str> {
        self.stem
            .strip_suffix(ENGINE_STEM_SUFFIX)
            .filter(|category| !category.is_empty())
    }

    /// Exports that name a concrete engine type.
    pub fn qualifying_exports(&self) -> Vec<&str> {
        self.exports
            .iter()
            .map(String::as_str)
            .filter(|name| name.ends_with(ENGINE_TYPE_SUFFIX) && *name != ABSTRACT_ENGINE_TYPE)
            .collect()
    }

    /// Resolves the engine type this manifest binds its category to.
    ///
    /// With several qualifying exports the first in declared order wins.
    pub fn engine_type(&self) -> Result<EngineKind, ManifestError> {
        let candidates = self.qualifying_exports();
        let Some(first) = candidates.first() else {
            return Err(ManifestError::NoQualifyingType {
                suffix: ENGINE_TYPE_SUFFIX,
                excluded: ABSTRACT_ENGINE_TYPE,
            });
        };

        if candidates.len() > 1 {
            warn!(
                manifest = %self.stem,
                exports = ?candidates,
                chosen = %first,
                "Manifest exports several engine types, using the first"
            );
        }

        EngineKind::from_type_name(first)
            .ok_or_else(|| ManifestError::UnknownType(first.to_string()))
    }
}

/// An artifact that discovery could not use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedArtifact {
    pub source: String,
    pub reason: String,
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub blueprint_files: usize,
    pub manifest_files: usize,
    pub skipped: Vec<SkippedArtifact>,
}

impl DiscoveryReport {
    pub(crate) fn skip(&mut self, source: impl Into<String>, reason: impl fmt::Display) {
        let skipped = SkippedArtifact {
            source: source.into(),
            reason: reason.to_string(),
        };
        warn!(source = %skipped.source, reason = %skipped.reason, "Skipping artifact");
        self.skipped.push(skipped);
    }
}

/// Lists files in `dir` (not recursively) whose names end in `suffix`, sorted by name.
pub fn scan_dir(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Discovery directory does not exist");
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Failed to read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.ends_with(suffix))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Loads and validates every blueprint declaration in a directory.
///
/// Duplicate ids keep the first file in name order.
pub fn discover_blueprints(dir: &Path, report: &mut DiscoveryReport) -> Vec<Blueprint> {
    let mut blueprints: Vec<Blueprint> = Vec::new();

    for path in scan_dir(dir, BLUEPRINT_FILE_SUFFIX) {
        report.blueprint_files += 1;
        let source = path.display().to_string();

        let blueprint = match BlueprintLoader::load_file(&path) {
            Ok(blueprint) => blueprint,
            Err(e) => {
                report.skip(source, e);
                continue;
            }
        };

        if let Err(e) = BlueprintLoader::check(&blueprint) {
            report.skip(source, e);
            continue;
        }

        if blueprints
            .iter()
            .any(|b| b.blueprint_id == blueprint.blueprint_id)
        {
            report.skip(
                source,
                format!("duplicate blueprint id '{}'", blueprint.blueprint_id),
            );
            continue;
        }

        info!(
            blueprint = %blueprint.blueprint_id,
            category = %blueprint.category,
            "Loaded blueprint"
        );
        blueprints.push(blueprint);
    }

    blueprints
}

/// Collects built-in manifests plus those found in `dir`; files on disk
/// replace built-ins with the same stem.
pub fn discover_manifests(dir: Option<&Path>, report: &mut DiscoveryReport) -> Vec<EngineManifest> {
    let mut manifests: BTreeMap<String, EngineManifest> = EngineManifest::builtin()
        .into_iter()
        .map(|m| (m.stem.clone(), m))
        .collect();

    if let Some(dir) = dir {
        for path in scan_dir(dir, ENGINE_FILE_SUFFIX) {
            report.manifest_files += 1;
            match EngineManifest::load_file(&path) {
                Ok(manifest) => {
                    debug!(manifest = %manifest.stem, exports = ?manifest.exports, "Loaded engine manifest");
                    manifests.insert(manifest.stem.clone(), manifest);
                }
                Err(reason) => report.skip(path.display().to_string(), reason),
            }
        }
    }

    manifests.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BLUEPRINT: &str = r#"
blueprint_id: xss_001
name: Cross-Site Scripting
category: cross_site_scripting
difficulty_range: [1, 5]
variants: ["Reflected XSS"]
entry_points: [q]
mutation_axes:
  contexts: [search_box]
"#;

    #[test]
    fn test_builtin_manifests_resolve() {
        let manifests = EngineManifest::builtin();
        assert_eq!(manifests.len(), 4);
        for manifest in &manifests {
            assert!(manifest.category().is_some());
            assert!(manifest.engine_type().is_ok());
        }
    }

    #[test]
    fn test_engine_type_rules() {
        let abstract_only = EngineManifest::new(
            "x_mutation",
            vec!["MutationEngine".to_string(), "Helper".to_string()],
        );
        assert!(matches!(
            abstract_only.engine_type(),
            Err(ManifestError::NoQualifyingType { .. })
        ));

        let several = EngineManifest::new(
            "x_mutation",
            vec![
                "MutationEngine".to_string(),
                "GenericMutation".to_string(),
                "PathTraversalMutation".to_string(),
            ],
        );
        assert_eq!(several.engine_type().unwrap(), EngineKind::Generic);

        let unknown = EngineManifest::new("x_mutation", vec!["LdapMutation".to_string()]);
        assert!(matches!(
            unknown.engine_type(),
            Err(ManifestError::UnknownType(name)) if name == "LdapMutation"
        ));
    }

    #[test]
    fn test_category_from_stem() {
        let manifest = EngineManifest::new("open_redirect_mutation", vec![]);
        assert_eq!(manifest.category(), Some("open_redirect"));
        assert_eq!(EngineManifest::new("_mutation", vec![]).category(), None);
        assert_eq!(EngineManifest::new("helpers", vec![]).category(), None);
    }

    #[test]
    fn test_discover_blueprints_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a_xss_blueprint.yaml"), BLUEPRINT).unwrap();
        std::fs::write(dir.path().join("b_dup_blueprint.yaml"), BLUEPRINT).unwrap();
        std::fs::write(dir.path().join("c_broken_blueprint.yaml"), "name: missing fields").unwrap();
        std::fs::write(dir.path().join("notes.yaml"), BLUEPRINT).unwrap();

        let mut report = DiscoveryReport::default();
        let blueprints = discover_blueprints(dir.path(), &mut report);

        assert_eq!(blueprints.len(), 1);
        assert_eq!(report.blueprint_files, 3);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped[0].reason.contains("duplicate"));
    }

    #[test]
    fn test_directory_manifest_overrides_builtin() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("path_traversal_mutation.yaml"),
            "exports: [GenericMutation]\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken_mutation.yaml"), "exports: 3\n").unwrap();

        let mut report = DiscoveryReport::default();
        let manifests = discover_manifests(Some(dir.path()), &mut report);

        let path = manifests
            .iter()
            .find(|m| m.stem == "path_traversal_mutation")
            .unwrap();
        assert_eq!(path.engine_type().unwrap(), EngineKind::Generic);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.starts_with("Manifest is not valid YAML"));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let files = scan_dir(Path::new("/definitely/not/here"), BLUEPRINT_FILE_SUFFIX);
        assert!(files.is_empty());
    }
}
