//! Cross-site scripting engine.
//!
//! Variants: `Reflected XSS`, `Stored XSS` and `DOM-based XSS`. Unknown variant
//! names are generated with the reflected layout but keep their own name.

use crate::blueprint::Blueprint;
use crate::error::MutationError;
use crate::machine::{Behavior, MachineConfig};
use crate::mutation::context::{MutationContext, VariantPlan, CONTEXTS_AXIS};
use crate::mutation::obstacles::{ObstacleSpec, ObstacleTable};
use crate::mutation::MutationEngine;

const OBSTACLES: &[ObstacleSpec] = &[
    ObstacleSpec {
        name: "script_tag",
        description: "Removes <script> elements",
        php_code: r#"$input = preg_replace('/<script\b[^>]*>(.*?)<\/script>/is', '', $input);"#,
        python_code: r#"input = re.sub(r'<script\b[^>]*>(.*?)</script>', '', input, flags=re.I | re.S)"#,
    },
    ObstacleSpec {
        name: "onerror",
        description: "Strips onerror handlers",
        php_code: r#"$input = preg_replace('/onerror\s*=/i', '', $input);"#,
        python_code: r#"input = re.sub(r'onerror\s*=', '', input, flags=re.I)"#,
    },
    ObstacleSpec {
        name: "onclick",
        description: "Strips onclick handlers",
        php_code: r#"$input = preg_replace('/onclick\s*=/i', '', $input);"#,
        python_code: r#"input = re.sub(r'onclick\s*=', '', input, flags=re.I)"#,
    },
    ObstacleSpec {
        name: "javascript_protocol",
        description: "Removes javascript: URLs",
        php_code: r#"$input = preg_replace('/javascript\s*:/i', '', $input);"#,
        python_code: r#"input = re.sub(r'javascript\s*:', '', input, flags=re.I)"#,
    },
    ObstacleSpec {
        name: "angle_brackets",
        description: "Removes angle brackets",
        php_code: r#"$input = str_replace(array('<', '>'), '', $input);"#,
        python_code: r#"input = input.replace('<', '').replace('>', '')"#,
    },
    ObstacleSpec {
        name: "quotes",
        description: "Removes quote characters",
        php_code: r#"$input = str_replace(array('"', "'"), '', $input);"#,
        python_code: r#"input = input.replace('"', '').replace("'", '')"#,
    },
];

pub const REFLECTED: &str = "Reflected XSS";
pub const STORED: &str = "Stored XSS";
pub const DOM_BASED: &str = "DOM-based XSS";

/// Mutation engine for cross-site scripting machines.
pub struct CrossSiteScriptingMutation {
    ctx: MutationContext,
    obstacles: ObstacleTable,
}

impl CrossSiteScriptingMutation {
    pub fn new(seed: impl Into<String>) -> Self {
        Self::with_context(MutationContext::new(seed))
    }

    pub fn with_context(ctx: MutationContext) -> Self {
        Self {
            ctx,
            obstacles: ObstacleTable::new(OBSTACLES),
        }
    }

    fn reflected(&mut self, bp: &Blueprint, difficulty: u8) -> Result<VariantPlan, MutationError> {
        let context = self.ctx.choose_axis(bp, CONTEXTS_AXIS, "search_box")?;
        let sink = self.ctx.choose_axis(bp, "sinks", "innerHTML")?;
        let output_context = self.ctx.choose_axis(bp, "output_contexts", "html_body")?;
        let entry_point = self.ctx.choose_entry_point(bp)?;
        let filters = self.ctx.select_filters(bp, difficulty, &self.obstacles)?;

        Ok(VariantPlan::new(context, entry_point, filters)
            .with_detail("sink", sink)
            .with_detail("output_context", output_context)
            .with_behavior(Behavior::new("direct_echo").with_flag("persistent", false)))
    }

    fn stored(&mut self, bp: &Blueprint, difficulty: u8) -> Result<VariantPlan, MutationError> {
        let context = self.ctx.choose_axis(bp, CONTEXTS_AXIS, "comment_section")?;
        let sink = self.ctx.choose_axis(bp, "sinks", "innerHTML")?;
        let storage = self.ctx.choose_axis(bp, "storage_types", "database")?;
        let entry_point = self.ctx.choose_entry_point(bp)?;
        let filters = self.ctx.select_filters(bp, difficulty, &self.obstacles)?;

        Ok(VariantPlan::new(context, entry_point, filters)
            .with_detail("sink", sink)
            .with_detail("storage", storage)
            .with_behavior(Behavior::new("stored_render").with_flag("persistent", true)))
    }

    fn dom_based(&mut self, bp: &Blueprint, difficulty: u8) -> Result<VariantPlan, MutationError> {
        let context = self.ctx.choose_axis(bp, CONTEXTS_AXIS, "user_profile")?;
        let sink = self.ctx.choose_axis(bp, "sinks", "location_href")?;
        let entry_point = self.ctx.choose_entry_point(bp)?;
        let filters = self.ctx.select_filters(bp, difficulty, &self.obstacles)?;

        // The payload never reaches the server; the page script reads it from the URL.
        Ok(VariantPlan::new(context, entry_point, filters)
            .with_detail("sink", sink)
            .with_behavior(Behavior::new("client_side").with_flag("server_reflects", false)))
    }
}

impl MutationEngine for CrossSiteScriptingMutation {
    fn type_name(&self) -> &'static str {
        "CrossSiteScriptingMutation"
    }

    fn mutate(
        &mut self,
        blueprint: &Blueprint,
        difficulty: u8,
    ) -> Result<MachineConfig, MutationError> {
        let difficulty = self.ctx.effective_difficulty(blueprint, difficulty);
        let variant = self.ctx.select_variant(blueprint, difficulty)?;

        let plan = match variant.as_str() {
            STORED => self.stored(blueprint, difficulty)?,
            DOM_BASED => self.dom_based(blueprint, difficulty)?,
            _ => self.reflected(blueprint, difficulty)?,
        };

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
blueprint_id: xss_001
name: Cross-Site Scripting
category: cross_site_scripting
difficulty_range: [1, 5]
variants: ["Reflected XSS", "Stored XSS", "DOM-based XSS"]
entry_points: [search_parameter, comment_field]
mutation_axes:
  contexts: [search_box, comment_section]
  sinks: [innerHTML, document_write]
  storage_types: [database, session]
  filters:
    basic: [script_tag]
    medium: [script_tag, onerror, not_yet_supported]
    advanced: [angle_brackets, quotes, javascript_protocol]
"#,
            "xss_test",
        )
        .expect("valid blueprint")
    }

    #[test]
    fn test_easy_machines_are_reflected() {
        let bp = blueprint();
        for i in 0..20 {
            let mut engine = CrossSiteScriptingMutation::new(format!("easy-{i}"));
            let machine = engine.mutate(&bp, 2).unwrap();
            assert_eq!(machine.variant, REFLECTED);
            assert_eq!(machine.application.variant, REFLECTED);
            assert_eq!(machine.behavior.output, "direct_echo");
            assert_eq!(machine.constraints.filter_types(), vec!["script_tag"]);
        }
    }

    #[test]
    fn test_variant_layouts() {
        let bp = blueprint();
        let mut seen_stored = false;
        let mut seen_dom = false;

        for i in 0..60 {
            let mut engine = CrossSiteScriptingMutation::new(format!("hard-{i}"));
            let machine = engine.mutate(&bp, 4).unwrap();
            match machine.variant.as_str() {
                STORED => {
                    seen_stored = true;
                    assert!(machine.application.details.contains_key("storage"));
                    assert_eq!(machine.behavior.flags["persistent"], true);
                }
                DOM_BASED => {
                    seen_dom = true;
                    assert_eq!(machine.behavior.output, "client_side");
                }
                other => assert_eq!(other, REFLECTED),
            }
        }

        assert!(seen_stored && seen_dom);
    }

    #[test]
    fn test_unknown_obstacle_is_dropped() {
        let bp = blueprint();
        let mut engine = CrossSiteScriptingMutation::new("medium");
        let machine = engine.mutate(&bp, 3).unwrap();
        assert_eq!(machine.constraints.filter_types(), vec!["script_tag", "onerror"]);
    }

    #[test]
    fn test_obstacles_carry_real_transforms() {
        let bp = blueprint();
        let mut engine = CrossSiteScriptingMutation::new("advanced");
        let machine = engine.mutate(&bp, 5).unwrap();

        let brackets = &machine.constraints.filters[0];
        assert_eq!(brackets.kind, "angle_brackets");
        assert!(brackets.php_code.contains("'<', '>'"));
        assert!(machine
            .hints()
            .contains(&"Filters active: angle_brackets, quotes, javascript_protocol".to_string()));
    }
}
