//! SQL injection engine.

use crate::blueprint::Blueprint;
use crate::error::MutationError;
use crate::machine::{Behavior, MachineConfig};
use crate::mutation::context::{MutationContext, VariantPlan, CONTEXTS_AXIS};
use crate::mutation::obstacles::{ObstacleSpec, ObstacleTable};
use crate::mutation::MutationEngine;

const OBSTACLES: &[ObstacleSpec] = &[
    ObstacleSpec {
        name: "quotes",
        description: "Escapes single quotes",
        php_code: r#"$input = str_replace("'", "''", $input);"#,
        python_code: r#"input = input.replace("'", "''")"#,
    },
    ObstacleSpec {
        name: "keywords",
        description: "Removes UNION and SELECT keywords once",
        php_code: r#"$input = preg_replace('/\b(union|select)\b/i', '', $input);"#,
        python_code: r#"input = re.sub(r'\b(union|select)\b', '', input, flags=re.I)"#,
    },
    ObstacleSpec {
        name: "comments",
        description: "Removes SQL comment markers",
        php_code: r#"$input = str_replace(array('--', '#', '/*'), '', $input);"#,
        python_code: r#"input = input.replace('--', '').replace('#', '').replace('/*', '')"#,
    },
    ObstacleSpec {
        name: "spaces",
        description: "Removes spaces",
        php_code: r#"$input = str_replace(' ', '', $input);"#,
        python_code: r#"input = input.replace(' ', '')"#,
    },
    ObstacleSpec {
        name: "addslashes",
        description: "Backslash-escapes quotes",
        php_code: r#"$input = addslashes($input);"#,
        python_code: r#"input = input.replace('\\', '\\\\').replace("'", "\\'").replace('"', '\\"')"#,
    },
];

pub const ERROR_BASED: &str = "Error-based SQLi";
pub const UNION_BASED: &str = "Union-based SQLi";
pub const BLIND: &str = "Blind SQLi";
pub const TIME_BASED: &str = "Time-based Blind SQLi";

/// Mutation engine for SQL injection machines.
pub struct SqlInjectionMutation {
    ctx: MutationContext,
    obstacles: ObstacleTable,
}

impl SqlInjectionMutation {
    pub fn new(seed: impl Into<String>) -> Self {
        Self::with_context(MutationContext::new(seed))
    }

    pub fn with_context(ctx: MutationContext) -> Self {
        Self {
            ctx,
            obstacles: ObstacleTable::new(OBSTACLES),
        }
    }

    fn plan(
        &mut self,
        bp: &Blueprint,
        variant: &str,
        difficulty: u8,
    ) -> Result<VariantPlan, MutationError> {
        let context = self.ctx.choose_axis(bp, CONTEXTS_AXIS, "login_form")?;
        let database = self.ctx.choose_axis(bp, "databases", "mysql")?;
        let query_type = self.ctx.choose_axis(bp, "query_types", "select")?;
        let entry_point = self.ctx.choose_entry_point(bp)?;
        let table = format!("secrets_{}", self.ctx.random_string(6));

        let behavior = match variant {
            UNION_BASED => {
                let columns = self.ctx.number(2, 6);
                Behavior::new("query_results").with_flag("columns", columns)
            }
            BLIND => Behavior::new("boolean_response"),
            TIME_BASED => {
                let delay = self.ctx.number(2, 5);
                Behavior::new("no_output").with_flag("delay_seconds", delay)
            }
            _ => Behavior::new("error_display").with_flag("show_errors", true),
        };

        let filters = self.ctx.select_filters(bp, difficulty, &self.obstacles)?;
        let location = format!("{}://{}/flag", database, table);

        Ok(VariantPlan::new(context, entry_point, filters)
            .with_detail("database", database)
            .with_detail("query_type", query_type)
            .with_detail("flag_table", table)
            .with_behavior(behavior)
            .with_flag_location(location))
    }
}

impl MutationEngine for SqlInjectionMutation {
    fn type_name(&self) -> &'static str {
        "SqlInjectionMutation"
    }

    fn mutate(
        &mut self,
        blueprint: &Blueprint,
        difficulty: u8,
    ) -> Result<MachineConfig, MutationError> {
        let difficulty = self.ctx.effective_difficulty(blueprint, difficulty);
        let variant = self.ctx.select_variant(blueprint, difficulty)?;
        let plan = self.plan(blueprint, &variant, difficulty)?;
        Ok(self.ctx.finish(blueprint, &variant, difficulty, plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::BlueprintLoader;

    fn blueprint() -> Blueprint {
        BlueprintLoader::load_str(
            r#"
blueprint_id: sqli_001
name: SQL Injection
category: sql_injection
difficulty_range: [1, 5]
variants: ["Error-based SQLi", "Union-based SQLi", "Blind SQLi", "Time-based Blind SQLi"]
entry_points: [username, product_id]
mutation_axes:
  contexts: [login_form, product_search]
  databases: [mysql, sqlite]
  query_types: [select]
  filters:
    basic: [quotes]
    medium: [keywords, comments]
    advanced: [keywords, spaces, addslashes]
"#,
            "sqli_test",
        )
        .expect("valid blueprint")
    }

    #[test]
    fn test_easy_pool_is_first_half() {
        let bp = blueprint();
        for i in 0..30 {
            let mut engine = SqlInjectionMutation::new(format!("easy-{i}"));
            let machine = engine.mutate(&bp, 1).unwrap();
            assert!([ERROR_BASED, UNION_BASED].contains(&machine.variant.as_str()));
            assert!(machine.constraints.filters.is_empty());
        }
    }

    #[test]
    fn test_flag_lives_in_generated_table() {
        let bp = blueprint();
        let mut engine = SqlInjectionMutation::new("table");
        let machine = engine.mutate(&bp, 3).unwrap();

        let table = &machine.application.details["flag_table"];
        assert!(table.starts_with("secrets_"));
        assert_eq!(table.len(), "secrets_".len() + 6);
        assert!(machine.flag.location.contains(table.as_str()));
    }

    #[test]
    fn test_time_based_carries_delay() {
        let bp = blueprint();
        let mut seen = false;
        for i in 0..60 {
            let mut engine = SqlInjectionMutation::new(format!("time-{i}"));
            let machine = engine.mutate(&bp, 5).unwrap();
            if machine.variant == TIME_BASED {
                seen = true;
                let delay = machine.behavior.flags["delay_seconds"].as_u64().unwrap();
                assert!((2..=5).contains(&delay));
                assert_eq!(machine.behavior.output, "no_output");
            }
        }
        assert!(seen);
    }

    #[test]
    fn test_same_seed_reproduces_machine() {
        let bp = blueprint();
        let a = SqlInjectionMutation::new("repeat").mutate(&bp, 4).unwrap();
        let b = SqlInjectionMutation::new("repeat").mutate(&bp, 4).unwrap();
        assert_eq!(a, b);
    }
}
