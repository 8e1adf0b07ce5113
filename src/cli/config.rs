// ABOUTME: Run configuration derived from the reserved ENTRYPOINT_ variables
// ABOUTME: Every configuration problem is reported here, before anything is fetched

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::error::{EntrypointError, Result};
use crate::resolver::validation::{LOG_FORMAT, LOG_LEVEL, TEMPLATES, TMPL_OPTION, VARS_FILE};
use crate::resolver::{validate_control_variables, VariableSnapshot, VarsLocation};
use crate::template::{output_path, MissingKeyPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub vars_location: Option<VarsLocation>,
    pub templates: Vec<PathBuf>,
    pub missing_key: MissingKeyPolicy,
    pub aws: AwsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AwsConfig {
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Never fails: logging has to come up before configuration errors can be reported.
    /// An unrecognised format falls back to pretty output.
    pub fn from_snapshot(snapshot: &VariableSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            level: snapshot
                .get_non_empty(LOG_LEVEL)
                .map(str::to_string)
                .unwrap_or(defaults.level),
            format: snapshot
                .get_non_empty(LOG_FORMAT)
                .and_then(|f| f.parse().ok())
                .unwrap_or(defaults.format),
        }
    }
}

impl Config {
    /// Build the run configuration from the startup snapshot
    pub fn from_snapshot(snapshot: &VariableSnapshot) -> Result<Self> {
        validate_control_variables(snapshot)?;

        let missing_key = match snapshot.get_non_empty(TMPL_OPTION) {
            Some(value) => value.parse::<MissingKeyPolicy>().map_err(|value| {
                EntrypointError::InvalidMissingKeyPolicy {
                    value,
                    allowed: MissingKeyPolicy::NAMES.to_vec(),
                }
            })?,
            None => MissingKeyPolicy::default(),
        };

        let vars_location = snapshot
            .get_non_empty(VARS_FILE)
            .map(VarsLocation::parse)
            .transpose()?;

        let templates = parse_template_list(snapshot.get(TEMPLATES).unwrap_or_default());
        for template in &templates {
            output_path(template)
                .map_err(|_| EntrypointError::InvalidTemplatePath(template.clone()))?;
        }

        Ok(Self {
            vars_location,
            templates,
            missing_key,
            aws: AwsConfig {
                region: snapshot.get_non_empty("AWS_REGION").map(str::to_string),
            },
            logging: LoggingConfig::from_snapshot(snapshot),
        })
    }
}

/// Comma separated, surrounding whitespace ignored, empty and repeated entries dropped
pub fn parse_template_list(list: &str) -> Vec<PathBuf> {
    let mut templates: Vec<PathBuf> = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let path = PathBuf::from(entry);
        if !templates.contains(&path) {
            templates.push(path);
        }
    }
    templates
}
