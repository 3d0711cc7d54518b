use crate::errors::InvokeError;
use crate::model::{ParamLocation, ParameterSpec, RequestBody, RequestConfig};
use crate::utils::text::scalar_text;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

#[derive(Debug)]
pub enum BuildOutcome {
    Ready(RequestConfig),
    /// A required parameter had neither a call value nor a declared default.
    /// Returned by name so the caller can report it without dispatching.
    MissingParam(String),
}

/// Compile a parameter spec map plus caller-supplied values into a concrete
/// request. Pure: no I/O, no clock.
pub fn build(
    method: &str,
    url_template: &str,
    base_url: &str,
    spec_params: &BTreeMap<String, ParameterSpec>,
    call_params: &Map<String, Value>,
    tool_name: &str,
) -> Result<BuildOutcome, InvokeError> {
    let method = method.to_uppercase();
    let body_capable = matches!(method.as_str(), "POST" | "PUT" | "PATCH");

    let mut path = url_template.to_string();
    let mut query: Vec<(String, String)> = Vec::new();
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    let mut cookies: Vec<(String, String)> = Vec::new();
    let mut form: Vec<(String, String)> = Vec::new();
    let mut body_fields = Map::new();
    let mut explicit_body = false;

    for (name, spec) in spec_params {
        let value = call_params
            .get(name)
            .cloned()
            .or_else(|| spec.default_value().cloned());
        let Some(value) = value else {
            if spec.required {
                return Ok(BuildOutcome::MissingParam(name.clone()));
            }
            continue;
        };

        match spec.location {
            ParamLocation::Query => match value.as_array() {
                Some(items) if spec.explode => {
                    for item in items {
                        query.push((name.clone(), scalar_text(item)));
                    }
                }
                Some(items) => {
                    let joined = items.iter().map(scalar_text).collect::<Vec<_>>().join(",");
                    query.push((name.clone(), joined));
                }
                None => query.push((name.clone(), scalar_text(&value))),
            },
            ParamLocation::Path => {
                let placeholder = format!("{{{}}}", name);
                path = path.replace(&placeholder, &encode_path_segment(&path_text(&value)));
            }
            ParamLocation::Header => {
                headers.insert(name.clone(), scalar_text(&value));
            }
            ParamLocation::Cookie => {
                cookies.push((name.clone(), scalar_text(&value)));
            }
            ParamLocation::FormData => {
                form.push((name.clone(), scalar_text(&value)));
            }
            ParamLocation::Body => {
                if body_capable {
                    if call_params.contains_key(name) {
                        explicit_body = true;
                    }
                    body_fields.insert(name.clone(), value);
                }
            }
        }
    }

    if let Some(placeholder) = unresolved_placeholder(&path) {
        return Err(InvokeError::validation(format!(
            "Unresolved path parameter '{}' in URL for tool '{}'",
            placeholder, tool_name
        )));
    }

    if !cookies.is_empty() {
        let folded = cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        headers.insert("Cookie".to_string(), folded);
    }

    // Call parameters with no declared location fall through to the JSON
    // body for body-capable methods.
    let leftovers: Map<String, Value> = call_params
        .iter()
        .filter(|(name, _)| !spec_params.contains_key(*name) && *name != "Authorization")
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let body = if explicit_body {
        Some(RequestBody::Json(Value::Object(body_fields)))
    } else if !form.is_empty() {
        Some(RequestBody::Form(form))
    } else if !body_fields.is_empty() {
        Some(RequestBody::Json(Value::Object(body_fields)))
    } else if body_capable && !leftovers.is_empty() {
        Some(RequestBody::Json(Value::Object(leftovers)))
    } else {
        None
    };

    match &body {
        Some(RequestBody::Json(_)) => {
            headers
                .entry("Content-Type".to_string())
                .or_insert_with(|| "application/json".to_string());
        }
        Some(RequestBody::Form(_)) => {
            headers
                .entry("Content-Type".to_string())
                .or_insert_with(|| "application/x-www-form-urlencoded".to_string());
        }
        None => {}
    }

    // A caller-supplied Authorization value beats whatever the declared
    // parameters placed.
    if let Some(auth) = call_params.get("Authorization").and_then(|v| v.as_str()) {
        headers.insert("Authorization".to_string(), auth.to_string());
    }

    let url = assemble_url(base_url, &path, &query)?;

    Ok(BuildOutcome::Ready(RequestConfig {
        method,
        url,
        headers,
        query,
        body,
    }))
}

fn assemble_url(
    base_url: &str,
    path: &str,
    query: &[(String, String)],
) -> Result<String, InvokeError> {
    let mut url = if path.starts_with("http://") || path.starts_with("https://") {
        Url::parse(path).map_err(|_| InvokeError::validation("Invalid tool URL"))?
    } else {
        let base =
            Url::parse(base_url).map_err(|_| InvokeError::validation("Invalid base URL"))?;
        base.join(path)
            .map_err(|_| InvokeError::validation("Invalid tool URL path"))?
    };
    for (key, value) in query {
        url.query_pairs_mut().append_pair(key, value);
    }
    Ok(url.to_string())
}

fn unresolved_placeholder(path: &str) -> Option<&str> {
    let start = path.find('{')?;
    let end = path[start..].find('}')?;
    Some(&path[start + 1..start + end])
}

fn path_text(value: &Value) -> String {
    if let Some(num) = value.as_f64() {
        if num.fract() != 0.0 || value.is_f64() {
            return format!("{}", num.floor() as i64);
        }
    }
    scalar_text(value)
}

fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
