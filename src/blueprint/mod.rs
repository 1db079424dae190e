//! Blueprint records for vulnerability families.
//!
//! A blueprint is the immutable declaration of one vulnerability family: its
//! variants, where user input enters the generated application, and the
//! mutation axes an engine draws from. Blueprints are loaded once at startup
//! and shared read-only by every generation.
//!
//! # Example
//!
//! ```ignore
//! use hackforge::blueprint::BlueprintLoader;
//!
//! let blueprint = BlueprintLoader::load_file("blueprints/cross_site_scripting_blueprint.yaml")?;
//! assert!(BlueprintLoader::validate(&blueprint));
//! ```

pub mod loader;

pub use loader::BlueprintLoader;

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

/// Lowest difficulty in the difficulty domain.
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest difficulty in the difficulty domain.
pub const MAX_DIFFICULTY: u8 = 5;

/// Obstacle tiers a tiered mutation axis may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Medium,
    Advanced,
}

impl Tier {
    /// Returns all tiers from easiest to hardest.
    pub fn all() -> [Tier; 3] {
        [Tier::Basic, Tier::Medium, Tier::Advanced]
    }

    /// Returns the obstacle tier used at a difficulty, or `None` when no
    /// obstacles apply.
    pub fn for_difficulty(difficulty: u8) -> Option<Tier> {
        match difficulty {
            0 | 1 => None,
            2 => Some(Tier::Basic),
            3 => Some(Tier::Medium),
            _ => Some(Tier::Advanced),
        }
    }

    /// Returns the key used for this tier in declarations.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Medium => "medium",
            Tier::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named dimension of choice within a blueprint.
///
/// Declarations use either a flat list (`contexts: [search_box, profile]`) or a
/// mapping keyed by tier name (`filters: { basic: [...], advanced: [...] }`).
/// Scalar choices of any type are kept in their text form, so `ports: [80, 443]`
/// yields `"80"` and `"443"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MutationAxis {
    Choices(Vec<String>),
    Tiered(BTreeMap<String, Vec<String>>),
}

impl<'de> Deserialize<'de> for MutationAxis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        MutationAxis::from_value(value).map_err(D::Error::custom)
    }
}

impl MutationAxis {
    /// Builds an axis from a parsed declaration value.
    ///
    /// Returns a description of the first offending item on failure.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Sequence(items) => choice_list(items).map(MutationAxis::Choices),
            Value::Mapping(mapping) => {
                let mut tiers = BTreeMap::new();
                for (key, items) in mapping {
                    let tier = scalar_choice(key)?;
                    let items = match items {
                        Value::Sequence(items) => items,
                        other => {
                            return Err(format!(
                                "tier '{tier}' must be a list, found {}",
                                value_kind(&other)
                            ))
                        }
                    };
                    let choices =
                        choice_list(items).map_err(|reason| format!("tier '{tier}': {reason}"))?;
                    tiers.insert(tier, choices);
                }
                Ok(MutationAxis::Tiered(tiers))
            }
            other => Err(format!(
                "expected a list or a tier mapping, found {}",
                value_kind(&other)
            )),
        }
    }

    /// Returns the flat choices, or `None` for a tiered axis.
    pub fn choices(&self) -> Option<&[String]> {
        match self {
            MutationAxis::Choices(choices) => Some(choices),
            MutationAxis::Tiered(_) => None,
        }
    }

    /// Returns the choices declared for a tier, or `None` for a flat axis.
    ///
    /// A tiered axis that omits the tier yields an empty slice.
    pub fn tier(&self, tier: Tier) -> Option<&[String]> {
        match self {
            MutationAxis::Choices(_) => None,
            MutationAxis::Tiered(tiers) => Some(
                tiers
                    .get(tier.as_str())
                    .map(|choices| choices.as_slice())
                    .unwrap_or(&[]),
            ),
        }
    }

    /// Returns every declared choice, tiers flattened in key order, without duplicates.
    pub fn all_choices(&self) -> Vec<&str> {
        let values: Vec<&String> = match self {
            MutationAxis::Choices(choices) => choices.iter().collect(),
            MutationAxis::Tiered(tiers) => tiers.values().flatten().collect(),
        };
        let mut seen: Vec<&str> = Vec::new();
        for value in values {
            if !seen.contains(&value.as_str()) {
                seen.push(value);
            }
        }
        seen
    }

    /// Returns true if the axis declares no choices at all.
    pub fn is_empty(&self) -> bool {
        match self {
            MutationAxis::Choices(choices) => choices.is_empty(),
            MutationAxis::Tiered(tiers) => tiers.values().all(|c| c.is_empty()),
        }
    }
}

fn choice_list(items: Vec<Value>) -> Result<Vec<String>, String> {
    items.into_iter().map(scalar_choice).collect()
}

fn scalar_choice(value: Value) -> Result<String, String> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(format!("choices must be scalars, found {}", value_kind(&other))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Deserializes `mutation_axes`, naming the axis in any error.
fn deserialize_axes<'de, D>(deserializer: D) -> Result<BTreeMap<String, MutationAxis>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    let mut axes = BTreeMap::new();
    for (name, value) in raw {
        match MutationAxis::from_value(value) {
            Ok(axis) => {
                axes.insert(name, axis);
            }
            Err(reason) => {
                return Err(D::Error::custom(format!("mutation axis '{name}': {reason}")));
            }
        }
    }
    Ok(axes)
}

/// Inclusive difficulty bounds declared by a blueprint.
///
/// Serialized as a two-element sequence, e.g. `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 2]", into = "[u8; 2]")]
pub struct DifficultyRange {
    pub min: u8,
    pub max: u8,
}

impl DifficultyRange {
    /// Creates a new difficulty range.
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// Returns true if the difficulty lies within the declared bounds.
    pub fn contains(&self, difficulty: u8) -> bool {
        (self.min..=self.max).contains(&difficulty)
    }

    /// Clamps a difficulty into the declared bounds intersected with 1-5.
    pub fn clamp(&self, difficulty: u8) -> u8 {
        let low = self.min.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        let high = self.max.clamp(low, MAX_DIFFICULTY);
        difficulty.clamp(low, high)
    }
}

impl Default for DifficultyRange {
    fn default() -> Self {
        Self::new(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }
}

impl From<[u8; 2]> for DifficultyRange {
    fn from([min, max]: [u8; 2]) -> Self {
        Self { min, max }
    }
}

impl From<DifficultyRange> for [u8; 2] {
    fn from(range: DifficultyRange) -> Self {
        [range.min, range.max]
    }
}

/// Immutable declaration of one vulnerability family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Unique key, e.g. `xss_001`.
    pub blueprint_id: String,
    /// Human-readable label.
    pub name: String,
    /// Family key used for engine lookup, e.g. `cross_site_scripting`.
    pub category: String,
    /// Inclusive difficulty bounds.
    pub difficulty_range: DifficultyRange,
    /// Ordered variant names; the first half is the "simpler" pool.
    pub variants: Vec<String>,
    /// Where user input enters the generated application. Order is significant
    /// for seeded selection.
    pub entry_points: Vec<String>,
    /// Named dimensions of choice.
    #[serde(deserialize_with = "deserialize_axes")]
    pub mutation_axes: BTreeMap<String, MutationAxis>,
    /// Free text.
    #[serde(default)]
    pub description: String,
}

impl Blueprint {
    /// Returns a mutation axis by name.
    pub fn axis(&self, name: &str) -> Option<&MutationAxis> {
        self.mutation_axes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_for_difficulty() {
        assert_eq!(Tier::for_difficulty(1), None);
        assert_eq!(Tier::for_difficulty(2), Some(Tier::Basic));
        assert_eq!(Tier::for_difficulty(3), Some(Tier::Medium));
        assert_eq!(Tier::for_difficulty(4), Some(Tier::Advanced));
        assert_eq!(Tier::for_difficulty(5), Some(Tier::Advanced));
    }

    #[test]
    fn test_axis_deserializes_flat_and_tiered() {
        let flat: MutationAxis = serde_yaml::from_str("[search_box, comments]").unwrap();
        assert_eq!(flat.choices().unwrap().len(), 2);
        assert!(flat.tier(Tier::Basic).is_none());

        let tiered: MutationAxis =
            serde_yaml::from_str("basic: [script_tag]\nadvanced: [quotes, onerror]").unwrap();
        assert!(tiered.choices().is_none());
        assert_eq!(tiered.tier(Tier::Basic).unwrap(), ["script_tag".to_string()]);
        assert!(tiered.tier(Tier::Medium).unwrap().is_empty());
        assert_eq!(tiered.tier(Tier::Advanced).unwrap().len(), 2);
    }

    #[test]
    fn test_axis_accepts_non_string_scalars() {
        let numbers: MutationAxis = serde_yaml::from_str("[80, 443, 2.5, true]").unwrap();
        assert_eq!(numbers.choices().unwrap(), ["80", "443", "2.5", "true"]);

        let tiered: MutationAxis = serde_yaml::from_str("basic: [2]\nadvanced: [5, 10]").unwrap();
        assert_eq!(tiered.tier(Tier::Advanced).unwrap(), ["5", "10"]);
    }

    #[test]
    fn test_axis_rejects_nested_items() {
        let err = serde_yaml::from_str::<MutationAxis>("[[a, b]]").unwrap_err();
        assert!(err.to_string().contains("choices must be scalars, found a list"));

        let err = serde_yaml::from_str::<MutationAxis>("basic: quotes").unwrap_err();
        assert!(err.to_string().contains("tier 'basic' must be a list"));

        let err = serde_yaml::from_str::<MutationAxis>("just_text").unwrap_err();
        assert!(err.to_string().contains("expected a list or a tier mapping"));
    }

    #[test]
    fn test_all_choices_deduplicates() {
        let tiered: MutationAxis =
            serde_yaml::from_str("basic: [quotes]\nmedium: [quotes, onerror]").unwrap();
        assert_eq!(tiered.all_choices(), vec!["quotes", "onerror"]);
    }

    #[test]
    fn test_difficulty_range_clamp() {
        let range = DifficultyRange::new(2, 4);
        assert_eq!(range.clamp(1), 2);
        assert_eq!(range.clamp(3), 3);
        assert_eq!(range.clamp(5), 4);

        // Declared bounds outside 1-5 are intersected with the domain.
        let wide = DifficultyRange::new(0, 9);
        assert_eq!(wide.clamp(0), 1);
        assert_eq!(wide.clamp(9), 5);
    }

    #[test]
    fn test_difficulty_range_serde_as_pair() {
        let range: DifficultyRange = serde_yaml::from_str("[1, 5]").unwrap();
        assert_eq!(range, DifficultyRange::new(1, 5));
        assert_eq!(serde_json::to_string(&range).unwrap(), "[1,5]");
    }
}
