//! Obstacle-code tables.
//!
//! Each engine knows a fixed set of obstacles it can emit code for. Blueprint
//! tier lists are resolved against that table; names the table does not know
//! are dropped, so blueprints may list obstacles an engine has not implemented.

use crate::machine::FilterDescriptor;

/// Static description of one obstacle an engine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub php_code: &'static str,
    pub python_code: &'static str,
}

impl ObstacleSpec {
    fn descriptor(&self) -> FilterDescriptor {
        FilterDescriptor {
            kind: self.name.to_string(),
            description: self.description.to_string(),
            php_code: self.php_code.to_string(),
            python_code: self.python_code.to_string(),
        }
    }
}

/// Lookup from obstacle name to its filter descriptor.
#[derive(Debug, Clone, Default)]
pub struct ObstacleTable {
    entries: Vec<FilterDescriptor>,
}

impl ObstacleTable {
    /// Builds a table from an engine's static obstacle list.
    pub fn new(specs: &[ObstacleSpec]) -> Self {
        Self {
            entries: specs.iter().map(ObstacleSpec::descriptor).collect(),
        }
    }

    /// Builds a placeholder table for names no engine implements.
    ///
    /// Each obstacle strips the first character of its own name from the
    /// input, which keeps the descriptor shape intact for the render layer.
    pub fn synthesized<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entries: Vec<FilterDescriptor> = Vec::new();
        for name in names {
            if name.is_empty() || entries.iter().any(|e| e.kind == name) {
                continue;
            }
            let stripped: String = name.chars().take(1).collect();
            entries.push(FilterDescriptor {
                kind: name.to_string(),
                description: format!("{} filtering", capitalize(name)),
                php_code: format!("$input = str_replace('{}', '', $input);", stripped),
                python_code: format!("input = input.replace('{}', '')", stripped),
            });
        }
        Self { entries }
    }

    /// Returns the descriptor for an obstacle name.
    pub fn get(&self, name: &str) -> Option<&FilterDescriptor> {
        self.entries.iter().find(|e| e.kind == name)
    }

    /// Resolves names in order, silently skipping unknown ones.
    pub fn resolve(&self, names: &[String]) -> Vec<FilterDescriptor> {
        names
            .iter()
            .filter_map(|name| self.get(name).cloned())
            .collect()
    }

    /// Returns the known obstacle names.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.kind.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
