// ABOUTME: Template context handed to every render
// ABOUTME: Exposes the environment as EnvVars and the vars document as Vars

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::error::{Result, TemplateError};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateContext {
    #[serde(rename = "EnvVars")]
    pub env_vars: BTreeMap<String, String>,

    #[serde(rename = "Vars", skip_serializing_if = "Option::is_none")]
    pub vars: Option<JsonValue>,
}

impl TemplateContext {
    /// Context with environment values only
    pub fn new(env_vars: BTreeMap<String, String>) -> Self {
        Self {
            env_vars,
            vars: None,
        }
    }

    /// Attach the vars document, if one was loaded
    pub fn with_vars(mut self, vars: Option<JsonValue>) -> Self {
        self.vars = vars;
        self
    }

    /// Convert context to JSON for handlebars rendering
    pub fn to_json(&self) -> Result<JsonValue> {
        serde_json::to_value(self).map_err(TemplateError::JsonError)
    }
}
