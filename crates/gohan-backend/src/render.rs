//! Path renderer (C4): turns a (resource path, body) pair into sync-backend
//! keys via the schema's optional `{{field}}` template.

use gohan_schemas::Schema;
use serde_json::Value;

use crate::error::RenderError;

pub const CONFIG_PREFIX: &str = "/config";
pub const STATE_PREFIX: &str = "/state";
pub const MONITORING_PREFIX: &str = "/monitoring";

/// Render the schema's `sync_key_template` against `body`, substituting each
/// `{{name}}` placeholder with the string form of the matching top-level
/// field. Returns an error naming the first missing/malformed field.
pub fn render_template(template: &str, body: &Value) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            // Unterminated placeholder: treat the rest as a malformed field name.
            return Err(RenderError {
                field: after_open.to_string(),
            });
        };
        let field = after_open[..end].trim();
        let value = field_as_string(body, field).ok_or_else(|| RenderError {
            field: field.to_string(),
        })?;
        out.push_str(&value);
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn field_as_string(body: &Value, field: &str) -> Option<String> {
    let v = body.get(field)?;
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The rendered suffix for a resource: the schema's template applied to
/// `body` if present and well-formed, otherwise the raw URL `path` (§4.4's
/// documented fallback).
pub fn render_suffix(schema: &Schema, path: &str, body: &Value) -> String {
    match &schema.sync_key_template {
        Some(template) => render_template(template, body).unwrap_or_else(|_| path.to_string()),
        None => path.to_string(),
    }
}

/// The outbound `/config/<suffix>` key for a create/update event.
pub fn config_key(schema: &Schema, path: &str, body: &Value) -> String {
    format!("{CONFIG_PREFIX}{}", render_suffix(schema, path, body))
}

/// The `/state/<suffix>` twin, synthesized for delete events.
pub fn state_key(schema: &Schema, path: &str, body: &Value) -> String {
    format!("{STATE_PREFIX}{}", render_suffix(schema, path, body))
}

/// The `/monitoring/<suffix>` twin, synthesized for delete events.
pub fn monitoring_key(schema: &Schema, path: &str, body: &Value) -> String {
    format!("{MONITORING_PREFIX}{}", render_suffix(schema, path, body))
}
