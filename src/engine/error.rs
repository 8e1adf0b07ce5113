// ABOUTME: Error taxonomy for a single entrypoint run
// ABOUTME: Every variant is fatal and maps to a process exit code

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::providers::ProviderError;
use crate::template::TemplateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Fetch,
    Parse,
    Render,
    Handoff,
    Internal,
}

impl ErrorKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::Configuration => 2,
            ErrorKind::Fetch => 3,
            ErrorKind::Parse => 4,
            ErrorKind::Render => 5,
            ErrorKind::Handoff => 127,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Fetch => "fetch error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Render => "render error",
            ErrorKind::Handoff => "process handoff error",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// One failed job from the template file pass
#[derive(Debug)]
pub struct FileRenderFailure {
    pub template: PathBuf,
    pub error: TemplateError,
}

#[derive(Error, Debug)]
pub enum EntrypointError {
    #[error("{name} is not one of {allowed:?}")]
    UnknownControlVariable {
        name: String,
        allowed: Vec<&'static str>,
    },

    #[error("{value} is not a valid missing-key policy, expected one of {allowed:?}")]
    InvalidMissingKeyPolicy {
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("{0} is not a valid object storage path, expected s3://bucket/key")]
    InvalidObjectPath(String),

    #[error("{0} does not end with .tmpl or .tpl")]
    InvalidTemplatePath(PathBuf),

    #[error("Failed to read variables file {path}: {source}")]
    VarsFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to parse variables document {location}: {message}")]
    Parse { location: String, message: String },

    #[error("Failed to render {job}: {source}")]
    Render {
        job: String,
        #[source]
        source: TemplateError,
    },

    #[error("{} of {total} template files failed to render: {}", .failures.len(), summarize(.failures))]
    TemplatePass {
        total: usize,
        failures: Vec<FileRenderFailure>,
    },

    #[error("Process handoff failed: {0}")]
    Handoff(#[from] super::handoff::LaunchError),

    #[error("Render task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

fn summarize(failures: &[FileRenderFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.template.display(), f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl EntrypointError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EntrypointError::UnknownControlVariable { .. }
            | EntrypointError::InvalidMissingKeyPolicy { .. }
            | EntrypointError::InvalidObjectPath(_)
            | EntrypointError::InvalidTemplatePath(_) => ErrorKind::Configuration,
            EntrypointError::VarsFileRead { .. } | EntrypointError::Fetch { .. } => {
                ErrorKind::Fetch
            }
            EntrypointError::Parse { .. } => ErrorKind::Parse,
            EntrypointError::Render { .. } | EntrypointError::TemplatePass { .. } => {
                ErrorKind::Render
            }
            EntrypointError::Handoff(_) => ErrorKind::Handoff,
            EntrypointError::JoinError(_) => ErrorKind::Internal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

pub type Result<T> = std::result::Result<T, EntrypointError>;
