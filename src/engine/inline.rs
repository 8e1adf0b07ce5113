// ABOUTME: Inline self-render pass over environment variables
// ABOUTME: Values that are a whole template expression are rendered and replace themselves

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::error::{EntrypointError, Result};
use crate::resolver::{is_control_variable, VariableSnapshot};
use crate::template::{TemplateContext, TemplateEngine};

/// Result of the pass: the environment to forward and which names changed
#[derive(Debug, Clone, Default)]
pub struct InlineOutcome {
    pub environment: BTreeMap<String, String>,
    pub rendered: Vec<String>,
}

/// A single line that opens with `{{` and closes with `}}`
pub fn is_inline_template(value: &str) -> bool {
    value.len() >= 4 && value.starts_with("{{") && value.ends_with("}}") && !value.contains('\n')
}

/// Render every candidate against one context built before any candidate
/// is rendered. Reserved control variables are withheld from the result.
pub fn render_inline(
    engine: &TemplateEngine,
    snapshot: &VariableSnapshot,
    vars: Option<&JsonValue>,
) -> Result<InlineOutcome> {
    let context = TemplateContext::new(snapshot.as_map().clone()).with_vars(vars.cloned());
    let mut outcome = InlineOutcome::default();

    for (name, value) in snapshot.iter() {
        if is_control_variable(name) {
            debug!("Withholding control variable {} from child environment", name);
            continue;
        }

        if is_inline_template(value) {
            let rendered = engine
                .render_str(name, value, &context)
                .map_err(|e| EntrypointError::Render {
                    job: format!("environment variable {}", name),
                    source: e,
                })?;
            outcome.environment.insert(name.clone(), rendered);
            outcome.rendered.push(name.clone());
        } else {
            outcome.environment.insert(name.clone(), value.clone());
        }
    }

    if !outcome.rendered.is_empty() {
        info!(
            "Rendered {} environment variables: {}",
            outcome.rendered.len(),
            outcome.rendered.join(", ")
        );
    }
    Ok(outcome)
}

impl InlineOutcome {
    /// Environment seen by the template file pass: the forwarded values plus
    /// the control variables withheld from the workload, as in the inline pass.
    pub fn template_environment(&self, snapshot: &VariableSnapshot) -> BTreeMap<String, String> {
        let mut environment = self.environment.clone();
        environment.extend(
            snapshot
                .iter()
                .filter(|(name, _)| is_control_variable(name))
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        environment
    }
}

/// Mirror rendered values into this process's own environment
pub fn export_rendered(outcome: &InlineOutcome) {
    for name in &outcome.rendered {
        if let Some(value) = outcome.environment.get(name) {
            std::env::set_var(name, value);
        }
    }
}
