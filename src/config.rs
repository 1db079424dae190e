//! Configuration for the hackforge generator.
//!
//! Covers where blueprint declarations and engine manifests are discovered,
//! where exported machines land, and the defaults used by generation requests.

use std::path::PathBuf;
use thiserror::Error;

use crate::registry::DiscoverySources;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for discovery, generation and export.
#[derive(Debug, Clone, PartialEq)]
pub struct ForgeConfig {
    // Discovery
    /// Directory scanned for `*_blueprint.yaml` declarations.
    pub blueprints_dir: PathBuf,
    /// Directory scanned for `*_mutation.yaml` engine manifests, if any.
    pub engines_dir: Option<PathBuf>,

    // Export
    /// Directory receiving single-machine exports.
    pub output_dir: PathBuf,
    /// Directory receiving campaign exports.
    pub campaigns_dir: PathBuf,

    // Generation defaults
    /// Difficulty used when a request does not name one (1-5).
    pub default_difficulty: u8,
    /// User identifier used when a request does not name one.
    pub default_user: String,
    /// Number of machines in a campaign when no count is given.
    pub campaign_size: usize,
    /// Prefix wrapped around every flag digest.
    pub flag_prefix: String,
    /// Default flag path inside the generated application.
    pub flag_location: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            blueprints_dir: PathBuf::from("./blueprints"),
            engines_dir: Some(PathBuf::from("./mutations")),
            output_dir: PathBuf::from("./generated_machines"),
            campaigns_dir: PathBuf::from("./campaigns"),
            default_difficulty: 2,
            default_user: "demo_user".to_string(),
            campaign_size: 5,
            flag_prefix: "HACKFORGE".to_string(),
            flag_location: "/var/www/html/flag.txt".to_string(),
        }
    }
}

impl ForgeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HACKFORGE_BLUEPRINTS_DIR`: Blueprint directory (default: ./blueprints)
    /// - `HACKFORGE_ENGINES_DIR`: Engine manifest directory (default: ./mutations, empty disables)
    /// - `HACKFORGE_OUTPUT_DIR`: Single-machine export directory (default: ./generated_machines)
    /// - `HACKFORGE_CAMPAIGNS_DIR`: Campaign export directory (default: ./campaigns)
    /// - `HACKFORGE_DIFFICULTY`: Default difficulty (default: 2)
    /// - `HACKFORGE_USER`: Default user id (default: demo_user)
    /// - `HACKFORGE_CAMPAIGN_SIZE`: Default campaign size (default: 5)
    /// - `HACKFORGE_FLAG_PREFIX`: Flag prefix (default: HACKFORGE)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HACKFORGE_BLUEPRINTS_DIR") {
            config.blueprints_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HACKFORGE_ENGINES_DIR") {
            config.engines_dir = if val.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        if let Ok(val) = std::env::var("HACKFORGE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HACKFORGE_CAMPAIGNS_DIR") {
            config.campaigns_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HACKFORGE_DIFFICULTY") {
            config.default_difficulty = parse_env_value(&val, "HACKFORGE_DIFFICULTY")?;
        }

        if let Ok(val) = std::env::var("HACKFORGE_USER") {
            config.default_user = val;
        }

        if let Ok(val) = std::env::var("HACKFORGE_CAMPAIGN_SIZE") {
            config.campaign_size = parse_env_value(&val, "HACKFORGE_CAMPAIGN_SIZE")?;
        }

        if let Ok(val) = std::env::var("HACKFORGE_FLAG_PREFIX") {
            config.flag_prefix = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=5).contains(&self.default_difficulty) {
            return Err(ConfigError::ValidationFailed(format!(
                "default_difficulty must be between 1 and 5, got {}",
                self.default_difficulty
            )));
        }

        if self.campaign_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "campaign_size must be greater than 0".to_string(),
            ));
        }

        if self.default_user.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "default_user cannot be empty".to_string(),
            ));
        }

        if self.flag_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "flag_prefix cannot be empty".to_string(),
            ));
        }

        if self.flag_prefix.contains(['{', '}']) {
            return Err(ConfigError::ValidationFailed(
                "flag_prefix cannot contain braces".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the directories the category registry is discovered from.
    pub fn discovery_sources(&self) -> DiscoverySources {
        DiscoverySources {
            blueprints_dir: self.blueprints_dir.clone(),
            engines_dir: self.engines_dir.clone(),
        }
    }

    /// Builder method to set the blueprint directory.
    pub fn with_blueprints_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.blueprints_dir = dir.into();
        self
    }

    /// Builder method to set the engine manifest directory.
    pub fn with_engines_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.engines_dir = dir;
        self
    }

    /// Builder method to set the single-machine export directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method to set the campaign export directory.
    pub fn with_campaigns_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.campaigns_dir = dir.into();
        self
    }

    /// Builder method to set the default difficulty.
    pub fn with_default_difficulty(mut self, difficulty: u8) -> Self {
        self.default_difficulty = difficulty;
        self
    }

    /// Builder method to set the flag prefix.
    pub fn with_flag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.flag_prefix = prefix.into();
        self
    }
}

/// Parses an environment variable value into the target type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ForgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_difficulty, 2);
        assert_eq!(config.flag_prefix, "HACKFORGE");
    }

    #[test]
    fn test_validate_rejects_out_of_range_difficulty() {
        let config = ForgeConfig::default().with_default_difficulty(6);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));

        let config = ForgeConfig::default().with_default_difficulty(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_flag_prefix() {
        assert!(ForgeConfig::default()
            .with_flag_prefix("")
            .validate()
            .is_err());
        assert!(ForgeConfig::default()
            .with_flag_prefix("CTF{")
            .validate()
            .is_err());
    }

    #[test]
    fn test_parse_env_value_reports_key() {
        let err = parse_env_value::<u8>("seven", "HACKFORGE_DIFFICULTY").unwrap_err();
        assert!(err.to_string().contains("HACKFORGE_DIFFICULTY"));
        assert_eq!(parse_env_value::<usize>(" 3 ", "X").unwrap(), 3);
    }

    #[test]
    fn test_discovery_sources_follow_config() {
        let config = ForgeConfig::default()
            .with_blueprints_dir("/tmp/bp")
            .with_engines_dir(None);
        let sources = config.discovery_sources();
        assert_eq!(sources.blueprints_dir, PathBuf::from("/tmp/bp"));
        assert!(sources.engines_dir.is_none());
    }
}
