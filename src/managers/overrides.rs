use crate::model::{ParamLocation, ParameterSpec};
use crate::services::logger::Logger;
use crate::services::template;
use crate::utils::data_path::get_path_value;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The two historically-supported override formats, never explicitly
/// versioned. Classified once, structurally, by [`detect_shape`].
#[derive(Debug)]
pub enum OverrideShape {
    Structured(StructuredOverrides),
    Legacy(BTreeMap<String, LegacyOverride>),
    None,
}

#[derive(Debug, Default)]
pub struct StructuredOverrides {
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub path: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub body_format: Option<String>,
}

#[derive(Debug)]
pub struct LegacyOverride {
    pub value: String,
    pub location: ParamLocation,
}

const STRUCTURED_KEYS: &[&str] = &["query", "headers", "path", "body"];

/// Presence of any structured key wins, even when the object also carries
/// entries that look like legacy `{value, location}` pairs.
pub fn detect_shape(raw: &Value) -> OverrideShape {
    let Some(obj) = raw.as_object() else {
        return OverrideShape::None;
    };
    if obj.is_empty() {
        return OverrideShape::None;
    }
    if STRUCTURED_KEYS.iter().any(|key| obj.contains_key(*key)) {
        return OverrideShape::Structured(StructuredOverrides {
            query: template_map(obj.get("query")),
            headers: template_map(obj.get("headers")),
            path: template_map(obj.get("path")),
            body: obj.get("body").cloned(),
            body_format: obj
                .get("bodyFormat")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        });
    }

    let mut entries = BTreeMap::new();
    for (name, entry) in obj {
        let Some(value) = entry.get("value").map(value_template) else {
            continue;
        };
        let location = entry
            .get("location")
            .and_then(|v| serde_json::from_value::<ParamLocation>(v.clone()).ok())
            .unwrap_or(ParamLocation::Query);
        entries.insert(name.clone(), LegacyOverride { value, location });
    }
    if entries.is_empty() {
        OverrideShape::None
    } else {
        OverrideShape::Legacy(entries)
    }
}

fn template_map(raw: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = raw else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(k, v)| (k.clone(), value_template(v)))
        .collect()
}

fn value_template(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Rendered override values plus the parameter specs synthesized for them,
/// both merged over the descriptor's own by the caller.
#[derive(Debug, Default)]
pub struct ResolvedOverrides {
    pub params: Map<String, Value>,
    pub specs: BTreeMap<String, ParameterSpec>,
}

pub fn resolve(
    shape: &OverrideShape,
    call_params: &Map<String, Value>,
    auth_claims: &Value,
    logger: &Logger,
) -> ResolvedOverrides {
    let context = serde_json::json!({
        "toolParams": call_params,
        "auth": auth_claims,
    });
    let mut out = ResolvedOverrides::default();

    match shape {
        OverrideShape::None => {}
        OverrideShape::Legacy(entries) => {
            for (name, entry) in entries {
                let rendered = template::render_trusted(&entry.value, &context);
                out.params.insert(name.clone(), Value::String(rendered));
                let mut spec = ParameterSpec::at(entry.location);
                if entry.location == ParamLocation::Path {
                    spec = spec.required();
                }
                out.specs.insert(name.clone(), spec);
            }
        }
        OverrideShape::Structured(structured) => {
            for (name, tpl) in &structured.query {
                let rendered = template::render_trusted(tpl, &context);
                if rendered.trim().is_empty() {
                    // Omitting a query parameter is harmless.
                    continue;
                }
                out.params.insert(name.clone(), Value::String(rendered));
                out.specs
                    .insert(name.clone(), ParameterSpec::at(ParamLocation::Query));
            }
            for (name, tpl) in &structured.headers {
                let rendered = template::render_trusted(tpl, &context);
                if rendered.trim().is_empty() {
                    continue;
                }
                out.params.insert(name.clone(), Value::String(rendered));
                out.specs
                    .insert(name.clone(), ParameterSpec::at(ParamLocation::Header));
            }
            for (name, tpl) in &structured.path {
                let rendered = template::render_trusted(tpl, &context);
                if rendered.trim().is_empty() {
                    // Unlike query/header, dropping a path value leaves an
                    // unresolvable placeholder in the URL.
                    logger.warn(
                        "Path override rendered empty",
                        Some(&serde_json::json!({"param": name})),
                    );
                }
                out.params.insert(name.clone(), Value::String(rendered));
                out.specs.insert(
                    name.clone(),
                    ParameterSpec::at(ParamLocation::Path).required(),
                );
            }
            if let Some(body) = &structured.body {
                if structured.body_format.as_deref() == Some("form") {
                    resolve_form_body(body, &context, &mut out);
                } else {
                    let walked = walk_body(body, &context);
                    out.params.insert("body".to_string(), walked);
                    out.specs
                        .insert("body".to_string(), ParameterSpec::at(ParamLocation::Body));
                }
            }
        }
    }

    out
}

fn resolve_form_body(body: &Value, context: &Value, out: &mut ResolvedOverrides) {
    let Some(fields) = body.as_object() else {
        return;
    };
    for (name, field) in fields {
        let rendered = template::render_trusted(&value_template(field), context);
        out.params.insert(name.clone(), Value::String(rendered));
        out.specs
            .insert(name.clone(), ParameterSpec::at(ParamLocation::FormData));
    }
}

/// Recursive body walk. Non-string leaves pass through untouched; a leaf
/// that is exactly one variable reference substitutes the typed value from
/// the context; any other templated string substitutes its rendered form.
fn walk_body(value: &Value, context: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| walk_body(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), walk_body(v, context)))
                .collect(),
        ),
        Value::String(text) => {
            if let Some(path) = template::single_variable(text) {
                return get_path_value(context, path).unwrap_or(Value::Null);
            }
            if text.contains("{{") {
                Value::String(template::render_trusted(text, context))
            } else {
                value.clone()
            }
        }
        _ => value.clone(),
    }
}
