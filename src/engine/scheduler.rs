// ABOUTME: Concurrent template file render pass
// ABOUTME: One blocking task per template, all joined before any failure is reported

use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use super::error::{EntrypointError, FileRenderFailure, Result};
use crate::template::{TemplateContext, TemplateEngine};

pub struct TemplateScheduler {
    engine: Arc<TemplateEngine>,
}

impl TemplateScheduler {
    pub fn new(engine: Arc<TemplateEngine>) -> Self {
        Self { engine }
    }

    /// Render every template to its output path.
    ///
    /// Siblings are never cancelled: a failing template is reported only
    /// after every other task has finished writing.
    pub async fn render_all(
        &self,
        templates: &[PathBuf],
        context: Arc<TemplateContext>,
    ) -> Result<Vec<PathBuf>> {
        if templates.is_empty() {
            return Ok(Vec::new());
        }

        info!("Rendering {} template files", templates.len());

        let tasks = templates.iter().cloned().map(|template| {
            let engine = Arc::clone(&self.engine);
            let context = Arc::clone(&context);
            tokio::task::spawn_blocking(move || {
                let result = engine.render_file(&template, &context);
                (template, result)
            })
        });

        let results = join_all(tasks).await;

        let mut outputs = Vec::new();
        let mut failures = Vec::new();
        let mut join_error = None;

        for result in results {
            match result {
                Ok((template, Ok(output))) => {
                    info!("Rendered {} to {}", template.display(), output.display());
                    outputs.push(output);
                }
                Ok((template, Err(e))) => {
                    error!("Failed to render {}: {}", template.display(), e);
                    failures.push(FileRenderFailure { template, error: e });
                }
                Err(e) => {
                    error!("Render task join error: {}", e);
                    join_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = join_error {
            return Err(EntrypointError::JoinError(e));
        }
        if !failures.is_empty() {
            return Err(EntrypointError::TemplatePass {
                total: templates.len(),
                failures,
            });
        }
        Ok(outputs)
    }
}
