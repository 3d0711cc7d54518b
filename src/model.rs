use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Declarative description of one HTTP-callable operation. Produced by the
/// OpenAPI ingestion/persistence layer and treated as immutable for the
/// duration of an invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "httpMethod")]
    pub method: String,
    pub url_template: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_overrides: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_formatting: Option<FormattingConfig>,
    #[serde(default)]
    pub response_schemas: BTreeMap<String, Value>,
    #[serde(default, rename = "authRequirement")]
    pub auth: AuthRequirement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamLocation {
    Query,
    Path,
    Header,
    Cookie,
    Body,
    FormData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub location: ParamLocation,
    #[serde(default)]
    pub required: bool,
    /// Type/constraint envelope (type, min/max, enum, default). Only the
    /// declared default participates in request building; schema-level
    /// validation is out of scope.
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub explode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterSpec {
    pub fn at(location: ParamLocation) -> Self {
        Self {
            location,
            required: false,
            schema: Value::Null,
            explode: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.schema.get("default")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthRequirement {
    #[default]
    None,
    #[serde(rename_all = "camelCase")]
    ApiKey { provider_id: String },
    #[serde(rename_all = "camelCase")]
    Oauth { provider_id: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_template: Option<String>,
    /// Formatting templates are agent-authored by default and render with the
    /// restricted helper set. Only configuration written by the platform
    /// itself may opt into the trusted registry.
    #[serde(default)]
    pub trusted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    pub method: String,
    /// Final URL with path parameters substituted and query appended.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

impl RequestConfig {
    /// Echo of the built request exposed to templates as `request`.
    pub fn context_value(&self) -> Value {
        let body = match &self.body {
            Some(RequestBody::Json(value)) => value.clone(),
            Some(RequestBody::Form(pairs)) => {
                let mut map = Map::new();
                for (k, v) in pairs {
                    map.insert(k.clone(), Value::String(v.clone()));
                }
                Value::Object(map)
            }
            None => Value::Null,
        };
        serde_json::json!({
            "method": self.method,
            "url": self.url,
            "headers": self.headers,
            "query": self.query,
            "body": body,
        })
    }
}

/// Persisted OAuth credential row. Owned by the persistence layer; the auth
/// resolver only reads it and, on refresh, writes a new row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: String,
    pub owner_id: String,
    pub provider_id: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                expires_at.timestamp_millis() - crate::constants::auth::EXPIRY_SKEW_MS
                    <= now.timestamp_millis()
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentItem {
    Text { text: String },
}

/// The single payload shape the engine ever hands back to a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            is_error: true,
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|item| {
            let ContentItem::Text { text } = item;
            text.as_str()
        })
    }
}
