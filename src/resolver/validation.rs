// ABOUTME: Validation of reserved ENTRYPOINT_ control variables
// ABOUTME: Rejects any reserved-prefix name outside the known allow-list

use super::snapshot::VariableSnapshot;
use crate::engine::error::{EntrypointError, Result};

pub const CONTROL_PREFIX: &str = "ENTRYPOINT_";

pub const VARS_FILE: &str = "ENTRYPOINT_VARS_FILE";
pub const TEMPLATES: &str = "ENTRYPOINT_TEMPLATES";
pub const TMPL_OPTION: &str = "ENTRYPOINT_TMPL_OPTION";
pub const LOG_LEVEL: &str = "ENTRYPOINT_LOG_LEVEL";
pub const LOG_FORMAT: &str = "ENTRYPOINT_LOG_FORMAT";

pub const CONTROL_VARIABLES: [&str; 5] = [VARS_FILE, TEMPLATES, TMPL_OPTION, LOG_LEVEL, LOG_FORMAT];

/// True for names in the reserved namespace, known or not
pub fn is_control_variable(name: &str) -> bool {
    name.starts_with(CONTROL_PREFIX)
}

/// Fail on the first unknown reserved name, in sorted order
pub fn validate_control_variables(snapshot: &VariableSnapshot) -> Result<()> {
    match snapshot
        .names()
        .filter(|name| is_control_variable(name))
        .find(|name| !CONTROL_VARIABLES.contains(name))
    {
        Some(name) => Err(EntrypointError::UnknownControlVariable {
            name: name.to_string(),
            allowed: CONTROL_VARIABLES.to_vec(),
        }),
        None => Ok(()),
    }
}
