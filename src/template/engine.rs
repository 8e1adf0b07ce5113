// ABOUTME: Template engine wrapping Handlebars with the provider function table
// ABOUTME: Renders strings and template files under a process-wide missing-key policy

use handlebars::Handlebars;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::context::TemplateContext;
use super::error::{Result, TemplateError};
use super::helpers::{self, MissingValuePlaceholder};
use crate::providers::Providers;

pub const TEMPLATE_SUFFIXES: [&str; 2] = [".tmpl", ".tpl"];

/// What a reference to an absent context field renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    #[default]
    Error,
    Zero,
    Default,
    Invalid,
}

impl MissingKeyPolicy {
    pub const NAMES: [&'static str; 4] = ["error", "zero", "default", "invalid"];

    /// Substituted text, `None` when the render must fail instead
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            MissingKeyPolicy::Error => None,
            MissingKeyPolicy::Zero => Some(""),
            MissingKeyPolicy::Default => Some("<no value>"),
            MissingKeyPolicy::Invalid => Some("<invalid>"),
        }
    }
}

impl FromStr for MissingKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "error" => Ok(MissingKeyPolicy::Error),
            "zero" => Ok(MissingKeyPolicy::Zero),
            "default" => Ok(MissingKeyPolicy::Default),
            "invalid" => Ok(MissingKeyPolicy::Invalid),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for MissingKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingKeyPolicy::Error => "error",
            MissingKeyPolicy::Zero => "zero",
            MissingKeyPolicy::Default => "default",
            MissingKeyPolicy::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    policy: MissingKeyPolicy,
}

impl TemplateEngine {
    /// Create a template engine with the built-in and provider helpers
    pub fn new(policy: MissingKeyPolicy, providers: &Providers) -> Self {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(policy == MissingKeyPolicy::Error);
        handlebars.set_dev_mode(false);

        // Output is config files and env values, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        helpers::register_helpers(&mut handlebars);
        helpers::register_provider_helpers(&mut handlebars, providers);

        if let Some(placeholder) = policy.placeholder() {
            handlebars.register_helper(
                "helperMissing",
                Box::new(MissingValuePlaceholder(placeholder)),
            );
        }

        Self { handlebars, policy }
    }

    pub fn policy(&self) -> MissingKeyPolicy {
        self.policy
    }

    /// Render a template string with the given context
    pub fn render_str(&self, name: &str, template: &str, context: &TemplateContext) -> Result<String> {
        debug!("Rendering template string {}", name);
        let json_context = context.to_json()?;
        self.handlebars
            .render_template(template, &json_context)
            .map_err(TemplateError::HandlebarsError)
    }

    /// Render a template file next to itself with its template suffix removed
    pub fn render_file(&self, path: &Path, context: &TemplateContext) -> Result<PathBuf> {
        let output_path = output_path(path)?;

        let template = fs::read_to_string(path).map_err(|e| TemplateError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let rendered = self.render_str(&path.display().to_string(), &template, context)?;
        write_atomically(&output_path, rendered.as_bytes(), fs::metadata(path).ok())?;

        debug!(
            "Template {} rendered to {} ({} bytes)",
            path.display(),
            output_path.display(),
            rendered.len()
        );
        Ok(output_path)
    }
}

/// `app.conf.tmpl` -> `app.conf`
pub fn output_path(template: &Path) -> Result<PathBuf> {
    let raw = template.to_string_lossy();
    TEMPLATE_SUFFIXES
        .iter()
        .find_map(|suffix| raw.strip_suffix(suffix))
        .filter(|stripped| !stripped.is_empty() && !stripped.ends_with('/'))
        .map(PathBuf::from)
        .ok_or_else(|| TemplateError::InvalidTemplatePath(template.to_path_buf()))
}

/// Write to a sibling temp file, fsync, then rename over the destination.
fn write_atomically(path: &Path, content: &[u8], template_meta: Option<fs::Metadata>) -> Result<()> {
    let io_error = |source: std::io::Error| TemplateError::IoError {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(io_error)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| TemplateError::InvalidTemplatePath(path.to_path_buf()))?;
    // Unique per write: two templates may share an output path
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        if let Some(meta) = &template_meta {
            file.set_permissions(meta.permissions())?;
        }
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error(e));
    }
    Ok(())
}
