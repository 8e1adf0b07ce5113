// ABOUTME: Handlebars helper functions available to every template
// ABOUTME: Provider lookups (getSecret, getRegion, ...) plus a sprig-style function library

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, Output, RenderContext, RenderError, ScopedJson,
};
use serde_json::Value as JsonValue;
use std::env;
use uuid::Uuid;

use crate::providers::Providers;

type HelperResult = std::result::Result<JsonValue, RenderError>;

/// Adapts a plain function into a helper usable both as `{{name ..}}` and as
/// a subexpression `(name ..)`.
struct FnHelper<F>(F);

impl<F> HelperDef for FnHelper<F>
where
    F: Fn(&Helper<'_, '_>) -> HelperResult + Send + Sync,
{
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        r: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> std::result::Result<ScopedJson<'reg, 'rc>, RenderError> {
        if r.strict_mode() {
            if let Some(p) = h.params().iter().find(|p| p.is_value_missing()) {
                return Err(RenderError::strict_error(p.relative_path()));
            }
        }
        (self.0)(h).map(ScopedJson::Derived)
    }
}

fn register<F>(handlebars: &mut Handlebars, name: &str, f: F)
where
    F: Fn(&Helper<'_, '_>) -> HelperResult + Send + Sync + 'static,
{
    handlebars.register_helper(name, Box::new(FnHelper(f)));
}

fn param<'a>(h: &'a Helper, index: usize) -> std::result::Result<&'a JsonValue, RenderError> {
    h.param(index).map(|p| p.value()).ok_or_else(|| {
        RenderError::new(format!("`{}` helper: missing parameter {}", h.name(), index))
    })
}

/// Absent context values get past `FnHelper` only when strict mode is off.
/// They then stand in for the zero value of whatever the helper expects.
fn is_missing(h: &Helper, index: usize) -> bool {
    h.param(index).map_or(false, |p| p.is_value_missing())
}

fn str_param<'a>(h: &'a Helper, index: usize) -> std::result::Result<&'a str, RenderError> {
    if is_missing(h, index) {
        return Ok("");
    }
    param(h, index)?.as_str().ok_or_else(|| {
        RenderError::new(format!(
            "`{}` helper: parameter {} must be a string",
            h.name(),
            index
        ))
    })
}

/// Integers arrive as JSON numbers or, when read from the environment, as strings.
fn as_int(h: &Helper, value: &JsonValue) -> std::result::Result<i64, RenderError> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        JsonValue::Bool(b) => Some(*b as i64),
        _ => None,
    };
    parsed.ok_or_else(|| {
        RenderError::new(format!("`{}` helper: {} is not an integer", h.name(), value))
    })
}

fn as_float(h: &Helper, value: &JsonValue) -> std::result::Result<f64, RenderError> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        RenderError::new(format!("`{}` helper: {} is not a number", h.name(), value))
    })
}

fn int_param(h: &Helper, index: usize) -> std::result::Result<i64, RenderError> {
    if is_missing(h, index) {
        return Ok(0);
    }
    as_int(h, param(h, index)?)
}

fn float_param(h: &Helper, index: usize) -> std::result::Result<f64, RenderError> {
    if is_missing(h, index) {
        return Ok(0.0);
    }
    as_float(h, param(h, index)?)
}

fn int_params(h: &Helper) -> std::result::Result<Vec<i64>, RenderError> {
    if h.params().is_empty() {
        return Err(RenderError::new(format!(
            "`{}` helper requires at least one parameter",
            h.name()
        )));
    }
    (0..h.params().len()).map(|i| int_param(h, i)).collect()
}

fn int_pair(h: &Helper) -> std::result::Result<(i64, i64), RenderError> {
    Ok((int_param(h, 0)?, int_param(h, 1)?))
}

/// Whole floats render without a fractional part, like `4` rather than `4.0`.
fn float_json(value: f64) -> JsonValue {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        JsonValue::from(value as i64)
    } else {
        JsonValue::from(value)
    }
}

fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
    }
}

fn checked(h: &Helper, value: Option<i64>) -> HelperResult {
    value
        .map(JsonValue::from)
        .ok_or_else(|| RenderError::new(format!("`{}` helper: arithmetic overflow", h.name())))
}

/// Register the string, arithmetic and encoding helpers
pub fn register_helpers(handlebars: &mut Handlebars) {
    // Strings
    register(handlebars, "upper", |h| {
        Ok(JsonValue::from(str_param(h, 0)?.to_uppercase()))
    });
    register(handlebars, "lower", |h| {
        Ok(JsonValue::from(str_param(h, 0)?.to_lowercase()))
    });
    register(handlebars, "title", |h| {
        let titled = str_param(h, 0)?
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        Ok(JsonValue::from(titled))
    });
    register(handlebars, "trim", |h| {
        Ok(JsonValue::from(str_param(h, 0)?.trim()))
    });
    register(handlebars, "trimPrefix", |h| {
        let prefix = str_param(h, 0)?;
        let s = str_param(h, 1)?;
        Ok(JsonValue::from(s.strip_prefix(prefix).unwrap_or(s)))
    });
    register(handlebars, "trimSuffix", |h| {
        let suffix = str_param(h, 0)?;
        let s = str_param(h, 1)?;
        Ok(JsonValue::from(s.strip_suffix(suffix).unwrap_or(s)))
    });
    register(handlebars, "quote", |h| {
        let quoted = h
            .params()
            .iter()
            .map(|p| format!("{:?}", display_value(p.value())))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(JsonValue::from(quoted))
    });
    register(handlebars, "squote", |h| {
        let quoted = h
            .params()
            .iter()
            .map(|p| format!("'{}'", display_value(p.value())))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(JsonValue::from(quoted))
    });
    register(handlebars, "replace", |h| {
        let old = str_param(h, 0)?;
        let new = str_param(h, 1)?;
        Ok(JsonValue::from(str_param(h, 2)?.replace(old, new)))
    });
    register(handlebars, "contains", |h| {
        Ok(JsonValue::from(str_param(h, 1)?.contains(str_param(h, 0)?)))
    });
    register(handlebars, "hasPrefix", |h| {
        Ok(JsonValue::from(str_param(h, 1)?.starts_with(str_param(h, 0)?)))
    });
    register(handlebars, "hasSuffix", |h| {
        Ok(JsonValue::from(str_param(h, 1)?.ends_with(str_param(h, 0)?)))
    });
    register(handlebars, "splitList", |h| {
        let separator = str_param(h, 0)?;
        let parts: Vec<&str> = str_param(h, 1)?.split(separator).collect();
        Ok(JsonValue::from(parts))
    });
    register(handlebars, "join", |h| {
        let separator = str_param(h, 0)?;
        if is_missing(h, 1) {
            return Ok(JsonValue::from(""));
        }
        let items = param(h, 1)?.as_array().ok_or_else(|| {
            RenderError::new("`join` helper: parameter 1 must be a list")
        })?;
        let joined = items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(separator);
        Ok(JsonValue::from(joined))
    });
    register(handlebars, "default", |h| {
        let fallback = param(h, 0)?;
        match h.param(1).map(|p| p.value()) {
            Some(value) if !is_empty_value(value) => Ok(value.clone()),
            _ => Ok(fallback.clone()),
        }
    });

    // Encoding
    register(handlebars, "b64enc", |h| {
        Ok(JsonValue::from(BASE64.encode(str_param(h, 0)?.as_bytes())))
    });
    register(handlebars, "b64dec", |h| {
        let bytes = BASE64
            .decode(str_param(h, 0)?)
            .map_err(|e| RenderError::new(format!("`b64dec` helper: {}", e)))?;
        let decoded = String::from_utf8(bytes)
            .map_err(|e| RenderError::new(format!("`b64dec` helper: {}", e)))?;
        Ok(JsonValue::from(decoded))
    });
    register(handlebars, "toJson", |h| {
        let encoded = serde_json::to_string(param(h, 0)?)
            .map_err(|e| RenderError::new(format!("`toJson` helper: {}", e)))?;
        Ok(JsonValue::from(encoded))
    });

    // Arithmetic
    register(handlebars, "add", |h| {
        let sum = int_params(h)?
            .into_iter()
            .try_fold(0i64, |acc, n| acc.checked_add(n));
        checked(h, sum)
    });
    register(handlebars, "add1", |h| {
        checked(h, int_param(h, 0)?.checked_add(1))
    });
    register(handlebars, "sub", |h| {
        let (a, b) = int_pair(h)?;
        checked(h, a.checked_sub(b))
    });
    register(handlebars, "mul", |h| {
        let product = int_params(h)?
            .into_iter()
            .try_fold(1i64, |acc, n| acc.checked_mul(n));
        checked(h, product)
    });
    register(handlebars, "div", |h| {
        let (a, b) = int_pair(h)?;
        if b == 0 {
            return Err(RenderError::new("`div` helper: division by zero"));
        }
        checked(h, a.checked_div(b))
    });
    register(handlebars, "mod", |h| {
        let (a, b) = int_pair(h)?;
        if b == 0 {
            return Err(RenderError::new("`mod` helper: division by zero"));
        }
        checked(h, a.checked_rem(b))
    });
    register(handlebars, "max", |h| {
        Ok(JsonValue::from(int_params(h)?.into_iter().max()))
    });
    register(handlebars, "min", |h| {
        Ok(JsonValue::from(int_params(h)?.into_iter().min()))
    });
    register(handlebars, "mulf", |h| {
        let a = float_param(h, 0)?;
        let b = float_param(h, 1)?;
        Ok(float_json(a * b))
    });

    // Environment and time
    register(handlebars, "env", |h| {
        Ok(JsonValue::from(env::var(str_param(h, 0)?).unwrap_or_default()))
    });
    register(handlebars, "now", |_| Ok(JsonValue::from(Utc::now().to_rfc3339())));
    register(handlebars, "uuidv4", |_| {
        Ok(JsonValue::from(Uuid::new_v4().to_string()))
    });
}

/// Register the provider-backed lookups
pub fn register_provider_helpers(handlebars: &mut Handlebars, providers: &Providers) {
    let p = providers.clone();
    register(handlebars, "getSecret", move |h| {
        let name = str_param(h, 0)?;
        p.secret(name)
            .map(JsonValue::from)
            .map_err(|e| RenderError::new(format!("getSecret: {}", e)))
    });

    let p = providers.clone();
    register(handlebars, "getHostname", move |_| {
        p.hostname()
            .map(JsonValue::from)
            .map_err(|e| RenderError::new(format!("getHostname: {}", e)))
    });

    let p = providers.clone();
    register(handlebars, "getNameServers", move |_| {
        p.nameservers()
            .map(JsonValue::from)
            .map_err(|e| RenderError::new(format!("getNameServers: {}", e)))
    });

    let p = providers.clone();
    register(handlebars, "getRegion", move |_| {
        p.region()
            .map(JsonValue::from)
            .map_err(|e| RenderError::new(format!("getRegion: {}", e)))
    });

    let p = providers.clone();
    register(handlebars, "getNumCPU", move |_| Ok(JsonValue::from(p.num_cpu())));
}

/// `helperMissing` hook writing a fixed placeholder for absent values.
///
/// Only data paths get the placeholder. Calls with arguments and bare names
/// such as `{{getHostnme}}` are a misspelled or unknown function and still
/// fail. Inside `#with` and `#each` blocks, relative lookups of a single
/// segment must be written as `this.name` to count as a path.
pub struct MissingValuePlaceholder(pub &'static str);

fn is_data_path(name: &str) -> bool {
    matches!(name, "EnvVars" | "Vars" | "this")
        || name.contains('.')
        || name.contains('/')
        || name.starts_with('@')
}

impl HelperDef for MissingValuePlaceholder {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> handlebars::HelperResult {
        if !h.params().is_empty() || !h.hash().is_empty() || !is_data_path(h.name()) {
            return Err(RenderError::new(format!("Helper not defined: {}", h.name())));
        }
        out.write(self.0)?;
        Ok(())
    }
}
