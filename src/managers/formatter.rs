use crate::constants::formatting::ITEM_SEPARATOR;
use crate::model::{CallResult, FormattingConfig, RequestConfig};
use crate::services::template;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Everything the formatter needs from a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    pub status: u16,
    pub status_text: String,
    pub headers: Map<String, Value>,
    pub body: Value,
}

/// Schema lookup order: exact status code, then `default`, then whichever
/// entry comes first.
pub fn lookup_schema(schemas: &BTreeMap<String, Value>, status: u16) -> Value {
    if let Some(schema) = schemas.get(&status.to_string()) {
        return schema.clone();
    }
    if let Some(schema) = schemas.get("default") {
        return schema.clone();
    }
    schemas
        .values()
        .next()
        .cloned()
        .unwrap_or(Value::Null)
}

fn render(fmt: &FormattingConfig, tpl: &str, context: &Value) -> String {
    if fmt.trusted {
        template::render_trusted(tpl, context)
    } else {
        template::render_agent(tpl, context)
    }
}

pub fn format_success(
    fmt: Option<&FormattingConfig>,
    schemas: &BTreeMap<String, Value>,
    outcome: &ResponseOutcome,
    request: &RequestConfig,
    tool_params: &Map<String, Value>,
    auth: &Value,
) -> CallResult {
    let schema = lookup_schema(schemas, outcome.status);
    let response_ctx = serde_json::json!({
        "schema": schema,
        "data": {
            "headers": outcome.headers,
            "body": outcome.body,
        },
    });

    if let Some(fmt) = fmt {
        let base_ctx = serde_json::json!({
            "request": request.context_value(),
            "response": response_ctx,
            "toolParams": tool_params,
            "auth": auth,
        });

        if let Some(tpl) = &fmt.template {
            return CallResult::text(render(fmt, tpl, &base_ctx));
        }

        if let (Some(item_tpl), Some(items)) = (&fmt.item_template, outcome.body.as_array()) {
            let header = fmt
                .header
                .as_deref()
                .map(|tpl| render(fmt, tpl, &base_ctx))
                .unwrap_or_default();
            if items.is_empty() {
                if let Some(empty) = &fmt.empty_result {
                    return CallResult::text(format!("{}{}", header, empty));
                }
            }
            let separator = fmt.separator.as_deref().unwrap_or(ITEM_SEPARATOR);
            let rendered: Vec<String> = items
                .iter()
                .map(|item| {
                    let ctx = serde_json::json!({
                        "item": item,
                        "request": request.context_value(),
                        "response": response_ctx,
                        "toolParams": tool_params,
                        "auth": auth,
                    });
                    render(fmt, item_tpl, &ctx)
                })
                .collect();
            return CallResult::text(format!("{}{}", header, rendered.join(separator)));
        }
    }

    let envelope = serde_json::json!({
        "schema": schema,
        "data": {
            "headers": outcome.headers,
            "body": outcome.body,
        },
    });
    CallResult::text(pretty(&envelope))
}

pub fn format_http_error(
    fmt: Option<&FormattingConfig>,
    schemas: &BTreeMap<String, Value>,
    outcome: &ResponseOutcome,
    request: &RequestConfig,
    tool_params: &Map<String, Value>,
    auth: &Value,
) -> CallResult {
    let message = format!("Request failed with status code {}", outcome.status);

    if let Some((fmt, tpl)) = error_template(fmt) {
        let schema = lookup_schema(schemas, outcome.status);
        let ctx = serde_json::json!({
            "error": message,
            "message": message,
            "request": request.context_value(),
            "response": {
                "schema": schema,
                "data": {
                    "headers": {},
                    "body": {"error": message},
                },
            },
            "toolParams": tool_params,
            "auth": auth,
        });
        return CallResult::error(render(fmt, tpl, &ctx));
    }

    let envelope = serde_json::json!({
        "data": {
            "content": {
                "status": outcome.status,
                "statusText": outcome.status_text,
                "data": outcome.body,
            },
            "headers": outcome.headers,
        },
        "schema": lookup_schema(schemas, outcome.status),
    });
    CallResult::error(pretty(&envelope))
}

pub fn format_transport_error(
    fmt: Option<&FormattingConfig>,
    request: &RequestConfig,
    tool_params: &Map<String, Value>,
    auth: &Value,
    message: &str,
) -> CallResult {
    if let Some((fmt, tpl)) = error_template(fmt) {
        let ctx = serde_json::json!({
            "error": message,
            "message": message,
            "request": request.context_value(),
            "response": {
                "schema": null,
                "data": {
                    "headers": {},
                    "body": {"error": message},
                },
            },
            "toolParams": tool_params,
            "auth": auth,
        });
        return CallResult::error(render(fmt, tpl, &ctx));
    }
    CallResult::error(format!("API call failed: {}", message))
}

fn error_template(fmt: Option<&FormattingConfig>) -> Option<(&FormattingConfig, &str)> {
    let fmt = fmt?;
    Some((fmt, fmt.error_template.as_deref()?))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
