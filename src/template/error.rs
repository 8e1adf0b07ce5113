// ABOUTME: Error types for template engine operations
// ABOUTME: Covers rendering, template file IO and output path derivation

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("{0}")]
    HandlebarsError(#[from] handlebars::RenderError),

    #[error("{path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} does not end with .tmpl or .tpl")]
    InvalidTemplatePath(PathBuf),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TemplateError>;
