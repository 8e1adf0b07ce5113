// ABOUTME: Process handoff: executable lookup and exec into the workload
// ABOUTME: The launcher replaces this process image and only returns on failure

use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("exec: {0:?}: executable file not found in $PATH")]
    NotFound(String),

    #[error("exec: no command given")]
    NoCommand,

    #[error("exec {program}: {source}")]
    Exec {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything needed to become the workload process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Handoff {
    /// Environment in `KEY=VALUE` form
    pub fn env_list(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

pub trait ProcessLauncher {
    /// Replace the current process. Returns only if that failed.
    fn replace(&self, handoff: &Handoff) -> LaunchError;
}

pub struct ExecLauncher;

impl ProcessLauncher for ExecLauncher {
    fn replace(&self, handoff: &Handoff) -> LaunchError {
        let Some((arg0, rest)) = handoff.args.split_first() else {
            return LaunchError::NoCommand;
        };

        info!("Executing {} {}", handoff.program.display(), rest.join(" "));

        let source = Command::new(&handoff.program)
            .arg0(arg0)
            .args(rest)
            .env_clear()
            .envs(&handoff.env)
            .exec();

        LaunchError::Exec {
            program: handoff.program.clone(),
            source,
        }
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Resolve `name` the way a shell would: names containing `/` are used as
/// given, anything else is searched for in `search_path` entries in order.
pub fn look_path(name: &str, search_path: Option<&str>) -> Result<PathBuf, LaunchError> {
    if name.is_empty() {
        return Err(LaunchError::NoCommand);
    }

    if name.contains('/') {
        let path = PathBuf::from(name);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(LaunchError::NotFound(name.to_string()))
        };
    }

    search_path
        .unwrap_or_default()
        .split(':')
        .map(|dir| if dir.is_empty() { "." } else { dir })
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| LaunchError::NotFound(name.to_string()))
}
