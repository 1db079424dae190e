//! Path traversal engine.
//!
//! Variants: `Basic Path Traversal` and `Encoded Path Traversal`. The flag is
//! placed outside the served base directory so a traversal is required.

use crate::blueprint::Blueprint;
use crate::error::MutationError;
use crate::machine::{Behavior, MachineConfig};
use crate::mutation::context::{MutationContext, VariantPlan, CONTEXTS_AXIS};
use crate::mutation::obstacles::{ObstacleSpec, ObstacleTable};
use crate::mutation::MutationEngine;

const OBSTACLES: &[ObstacleSpec] = &[
    ObstacleSpec {
        name: "dot_dot_slash",
        description: "Removes ../ sequences once",
        php_code: r#"$input = str_replace('../', '', $input);"#,
        python_code: r#"input = input.replace('../', '')"#,
    },
    ObstacleSpec {
        name: "recursive_dot_dot",
        description: "Removes ../ sequences until none remain",
        php_code: r#"while (strpos($input, '../') !== false) { $input = str_replace('../', '', $input); }"#,
        python_code: r#"while '../' in input: input = input.replace('../', '')"#,
    },
    ObstacleSpec {
        name: "absolute_path",
        description: "Rejects absolute paths",
        php_code: r#"$input = ltrim($input, '/');"#,
        python_code: r#"input = input.lstrip('/')"#,
    },
    ObstacleSpec {
        name: "null_byte",
        description: "Strips null bytes",
        php_code: r#"$input = str_replace(chr(0), '', $input);"#,
        python_code: r#"input = input.replace('\x00', '')"#,
    },
    ObstacleSpec {
        name: "extension_check",
        description: "Forces a .txt extension",
        php_code: r#"if (substr($input, -4) !== '.txt') { $input .= '.txt'; }"#,
        python_code: r#"input = input if input.endswith('.txt') else input + '.txt'"#,
    },
];

pub const BASIC: &str = "Basic Path Traversal";
pub const ENCODED: &str = "Encoded Path Traversal";

const FLAG_LOCATION: &str = "/etc/hackforge/flag.txt";

/// Mutation engine for path traversal machines.
pub struct PathTraversalMutation {
    ctx: MutationContext,
    obstacles: ObstacleTable,
}

impl PathTraversalMutation {
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
        difficulty: u8,
        encoded: bool,
    ) -> Result<VariantPlan, MutationError> {
        let context = self.ctx.choose_axis(bp, CONTEXTS_AXIS, "file_viewer")?;
        let base_dir = self.ctx.choose_axis(bp, "base_dirs", "/var/www/html/files")?;
        let encoding = if encoded {
            Some(self.ctx.choose_axis(bp, "encodings", "url_encoding")?)
        } else {
            None
        };
        let entry_point = self.ctx.choose_entry_point(bp)?;
        let filters = self.ctx.select_filters(bp, difficulty, &self.obstacles)?;

        let mut behavior = Behavior::new("file_contents");
        let mut plan = VariantPlan::new(context, entry_point, filters).with_detail("base_dir", base_dir);
        if let Some(encoding) = encoding {
            // Filters run before decoding, so encoded sequences slip through.
            behavior = behavior.with_flag("decode_after_filter", true);
            plan = plan.with_detail("encoding", encoding);
        }

        Ok(plan
            .with_behavior(behavior)
            .with_flag_location(FLAG_LOCATION))
    }
}

impl MutationEngine for PathTraversalMutation {
    fn type_name(&self) -> &'static str {
        "PathTraversalMutation"
    }

    fn mutate(
        &mut self,
        blueprint: &Blueprint,
        difficulty: u8,
    ) -> Result<MachineConfig, MutationError> {
        let difficulty = self.ctx.effective_difficulty(blueprint, difficulty);
        let variant = self.ctx.select_variant(blueprint, difficulty)?;
        let plan = self.plan(blueprint, difficulty, variant == ENCODED)?;
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
blueprint_id: path_001
name: Path Traversal
category: path_traversal
difficulty_range: [2, 5]
variants: ["Basic Path Traversal", "Encoded Path Traversal"]
entry_points: [file_parameter]
mutation_axes:
  contexts: [file_viewer, image_loader]
  base_dirs: [/var/www/uploads]
  encodings: [url_encoding, double_url_encoding]
  filters:
    basic: [dot_dot_slash]
    medium: [dot_dot_slash, null_byte]
    advanced: [recursive_dot_dot, absolute_path, extension_check]
"#,
            "path_test",
        )
        .expect("valid blueprint")
    }

    #[test]
    fn test_difficulty_clamped_into_range() {
        let bp = blueprint();
        let mut engine = PathTraversalMutation::new("clamp");
        let machine = engine.mutate(&bp, 1).unwrap();

        assert_eq!(machine.difficulty, 2);
        assert_eq!(machine.constraints.filter_types(), vec!["dot_dot_slash"]);
        assert!(machine.hints().contains(&"Difficulty: 2/5".to_string()));
    }

    #[test]
    fn test_flag_outside_base_dir() {
        let bp = blueprint();
        let mut engine = PathTraversalMutation::new("flag");
        let machine = engine.mutate(&bp, 3).unwrap();

        assert_eq!(machine.flag.location, FLAG_LOCATION);
        assert_eq!(machine.application.details["base_dir"], "/var/www/uploads");
    }

    #[test]
    fn test_encoded_variant_records_encoding() {
        let bp = blueprint();
        let mut seen = false;
        for i in 0..40 {
            let mut engine = PathTraversalMutation::new(format!("enc-{i}"));
            let machine = engine.mutate(&bp, 4).unwrap();
            if machine.variant == ENCODED {
                seen = true;
                assert!(machine.application.details.contains_key("encoding"));
                assert_eq!(machine.behavior.flags["decode_after_filter"], true);
            } else {
                assert!(!machine.application.details.contains_key("encoding"));
            }
        }
        assert!(seen);
    }
}
