// ABOUTME: Entrypoint run orchestration from configuration to process handoff
// ABOUTME: Loads vars, renders the environment, renders template files, then builds the handoff

use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::error::Result;
use super::handoff::Handoff;
use super::inline::{export_rendered, render_inline};
use super::scheduler::TemplateScheduler;
use crate::cli::Config;
use crate::providers::Providers;
use crate::resolver::{load_vars_document, VariableSnapshot};
use crate::template::{TemplateContext, TemplateEngine};

pub struct Entrypoint {
    config: Config,
    snapshot: VariableSnapshot,
    providers: Providers,
    engine: Arc<TemplateEngine>,
}

impl Entrypoint {
    pub fn new(config: Config, snapshot: VariableSnapshot, providers: Providers) -> Self {
        let engine = Arc::new(TemplateEngine::new(config.missing_key, &providers));
        debug!("Missing key policy: {}", engine.policy());
        Self {
            config,
            snapshot,
            providers,
            engine,
        }
    }

    async fn load_vars(&self) -> Result<Option<JsonValue>> {
        let Some(location) = &self.config.vars_location else {
            debug!("No variables document configured");
            return Ok(None);
        };

        let document = load_vars_document(
            location,
            Arc::clone(&self.engine),
            &self.snapshot,
            &self.providers,
        )
        .await?;
        Ok(Some(document.into_value()))
    }

    /// Run every pass and return what the workload should be started with.
    ///
    /// Rendered environment values are also written back into this
    /// process's environment before the template file pass begins.
    #[instrument(skip_all, fields(program = %program.display()))]
    pub async fn prepare(&self, program: PathBuf, args: Vec<String>) -> Result<Handoff> {
        let vars = self.load_vars().await?;

        let engine = Arc::clone(&self.engine);
        let snapshot = self.snapshot.clone();
        let inline_vars = vars.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            render_inline(&engine, &snapshot, inline_vars.as_ref())
        })
        .await??;
        export_rendered(&outcome);

        let context = Arc::new(
            TemplateContext::new(outcome.template_environment(&self.snapshot)).with_vars(vars),
        );
        let outputs = TemplateScheduler::new(Arc::clone(&self.engine))
            .render_all(&self.config.templates, context)
            .await?;
        if !outputs.is_empty() {
            info!("Rendered {} template files", outputs.len());
        }

        Ok(Handoff {
            program,
            args,
            env: outcome.environment,
        })
    }
}
