//! OS command injection engine.

use crate::blueprint::Blueprint;
use crate::error::MutationError;
use crate::machine::{Behavior, MachineConfig};
use crate::mutation::context::{MutationContext, VariantPlan, CONTEXTS_AXIS};
use crate::mutation::obstacles::{ObstacleSpec, ObstacleTable};
use crate::mutation::MutationEngine;

const OBSTACLES: &[ObstacleSpec] = &[
    ObstacleSpec {
        name: "semicolon",
        description: "Removes semicolons",
        php_code: r#"$input = str_replace(';', '', $input);"#,
        python_code: r#"input = input.replace(';', '')"#,
    },
    ObstacleSpec {
        name: "pipe",
        description: "Removes pipe characters",
        php_code: r#"$input = str_replace('|', '', $input);"#,
        python_code: r#"input = input.replace('|', '')"#,
    },
    ObstacleSpec {
        name: "ampersand",
        description: "Removes ampersands",
        php_code: r#"$input = str_replace('&', '', $input);"#,
        python_code: r#"input = input.replace('&', '')"#,
    },
    ObstacleSpec {
        name: "backticks",
        description: "Removes backtick substitution",
        php_code: r#"$input = str_replace('`', '', $input);"#,
        python_code: r#"input = input.replace('`', '')"#,
    },
    ObstacleSpec {
        name: "subshell",
        description: "Removes $( substitution",
        php_code: r#"$input = str_replace('$(', '', $input);"#,
        python_code: r#"input = input.replace('$(', '')"#,
    },
    ObstacleSpec {
        name: "spaces",
        description: "Removes spaces",
        php_code: r#"$input = str_replace(' ', '', $input);"#,
        python_code: r#"input = input.replace(' ', '')"#,
    },
    ObstacleSpec {
        name: "keywords",
        description: "Removes common file-reading commands",
        php_code: r#"$input = preg_replace('/\b(cat|less|more|head|tail)\b/', '', $input);"#,
        python_code: r#"input = re.sub(r'\b(cat|less|more|head|tail)\b', '', input)"#,
    },
];

pub const DIRECT: &str = "Direct Command Injection";
pub const BLIND: &str = "Blind Command Injection";
pub const OUT_OF_BAND: &str = "Out-of-band Command Injection";

/// Mutation engine for command injection machines.
pub struct CommandInjectionMutation {
    ctx: MutationContext,
    obstacles: ObstacleTable,
}

impl CommandInjectionMutation {
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
        let context = self.ctx.choose_axis(bp, CONTEXTS_AXIS, "ping_utility")?;
        let command = self.ctx.choose_axis(bp, "commands", "ping -c 1")?;
        let separator = self.ctx.choose_axis(bp, "separators", ";")?;
        let entry_point = self.ctx.choose_entry_point(bp)?;
        let filters = self.ctx.select_filters(bp, difficulty, &self.obstacles)?;

        let behavior = match variant {
            BLIND => Behavior::new("no_output"),
            OUT_OF_BAND => Behavior::new("no_output").with_flag("outbound_network", true),
            _ => Behavior::new("command_output"),
        };

        Ok(VariantPlan::new(context, entry_point, filters)
            .with_detail("command", command)
            .with_detail("separator", separator)
            .with_behavior(behavior))
    }
}

impl MutationEngine for CommandInjectionMutation {
    fn type_name(&self) -> &'static str {
        "CommandInjectionMutation"
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

    fn blueprint(extra_axis: &str) -> Blueprint {
        BlueprintLoader::load_str(
            &format!(
                r#"
blueprint_id: cmdi_001
name: Command Injection
category: command_injection
difficulty_range: [1, 5]
variants: ["Direct Command Injection", "Blind Command Injection", "Out-of-band Command Injection"]
entry_points: [host]
mutation_axes:
  contexts: [ping_utility, dns_lookup]
  commands: ["ping -c 1", "nslookup"]
  filters:
    basic: [semicolon]
    medium: [semicolon, pipe, ampersand]
    advanced: [semicolon, pipe, ampersand, backticks, subshell, spaces]
{}
"#,
                extra_axis
            ),
            "cmdi_test",
        )
        .expect("valid blueprint")
    }

    #[test]
    fn test_easy_machines_are_direct() {
        let bp = blueprint("");
        let mut engine = CommandInjectionMutation::new("direct");
        let machine = engine.mutate(&bp, 2).unwrap();

        assert_eq!(machine.variant, DIRECT);
        assert_eq!(machine.behavior.output, "command_output");
        assert_eq!(machine.application.details["separator"], ";");
    }

    #[test]
    fn test_advanced_tier_only() {
        let bp = blueprint("");
        let mut engine = CommandInjectionMutation::new("advanced");
        let machine = engine.mutate(&bp, 4).unwrap();
        assert_eq!(machine.constraints.filters.len(), 6);
        assert!(machine.constraints.filter_types().contains(&"subshell"));
    }

    #[test]
    fn test_tiered_flat_axis_is_malformed() {
        let bp = blueprint("  separators:\n    basic: [';']");
        let mut engine = CommandInjectionMutation::new("broken");
        let err = engine.mutate(&bp, 3).unwrap_err();
        assert!(matches!(err, MutationError::MalformedAxis { ref axis, .. } if axis == "separators"));
    }
}
