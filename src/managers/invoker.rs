use crate::constants;
use crate::managers::auth::{AuthResolution, AuthResolver};
use crate::managers::formatter::{self, ResponseOutcome};
use crate::managers::overrides;
use crate::managers::request::{self, BuildOutcome};
use crate::model::{CallResult, ParameterSpec, RequestBody, RequestConfig, ToolDescriptor};
use crate::services::audit::AuditService;
use crate::services::logger::Logger;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct InvokerConfig {
    pub request_timeout_ms: u64,
    pub refresh_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: env_u64(
                "TOOLCALL_REQUEST_TIMEOUT_MS",
                constants::network::TIMEOUT_TOOL_CALL_MS,
            ),
            refresh_timeout_ms: env_u64(
                "TOOLCALL_REFRESH_TIMEOUT_MS",
                constants::network::TIMEOUT_TOKEN_REFRESH_MS,
            ),
            user_agent: constants::http::USER_AGENT.to_string(),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// The execution unit. Everything is caught at this boundary: `execute`
/// always returns a `CallResult`, never an `Err`.
pub struct Invoker {
    logger: Logger,
    audit: AuditService,
    client: reqwest::Client,
    auth: AuthResolver,
    config: InvokerConfig,
}

impl Invoker {
    pub fn new(
        logger: Logger,
        audit: AuditService,
        auth: AuthResolver,
        config: InvokerConfig,
    ) -> Self {
        Self {
            logger: logger.child("invoker"),
            audit,
            client: reqwest::Client::new(),
            auth,
            config,
        }
    }

    /// Resolve the tool's auth requirement without invoking, so a caller can
    /// surface a challenge URL to the end user up front.
    pub async fn resolve_auth(&self, tool: &ToolDescriptor, owner_id: &str) -> AuthResolution {
        self.auth.resolve(&tool.auth, owner_id).await
    }

    pub async fn execute(
        &self,
        tool: &ToolDescriptor,
        base_url: &str,
        call_params: &Map<String, Value>,
        owner_id: &str,
        is_playground: bool,
    ) -> CallResult {
        let resolution = self.auth.resolve(&tool.auth, owner_id).await;
        match &resolution {
            AuthResolution::Misconfigured { message } => {
                return CallResult::error(format!(
                    "Authentication is misconfigured for this tool: {}",
                    message
                ));
            }
            AuthResolution::ChallengeRequired { authorize_url } => {
                // A challenge is a prompt, not an error.
                return CallResult::text(format!(
                    "Authorization required. Please ask the user to visit: {}",
                    authorize_url
                ));
            }
            _ => {}
        }
        let claims = resolution.claims();

        let shape = tool
            .request_overrides
            .as_ref()
            .map(overrides::detect_shape)
            .unwrap_or(overrides::OverrideShape::None);
        let resolved = overrides::resolve(&shape, call_params, &claims, &self.logger);

        let mut final_params = call_params.clone();
        for (name, value) in resolved.params {
            final_params.insert(name, value);
        }
        let mut final_specs: BTreeMap<String, ParameterSpec> = tool.parameters.clone();
        for (name, spec) in resolved.specs {
            final_specs.insert(name, spec);
        }

        let built = match request::build(
            &tool.method,
            &tool.url_template,
            base_url,
            &final_specs,
            &final_params,
            &tool.name,
        ) {
            Ok(outcome) => outcome,
            Err(err) => return CallResult::error(err.message),
        };
        let mut config = match built {
            BuildOutcome::Ready(config) => config,
            BuildOutcome::MissingParam(name) => {
                // No network attempt and no audit line for a request that was
                // never built.
                return CallResult::error(format!("Missing required parameter: {}", name));
            }
        };

        apply_auth_header(&mut config, &resolution);

        self.logger.debug(
            "Dispatching tool call",
            Some(&serde_json::json!({"tool": tool.id, "method": config.method, "url": config.url})),
        );

        let started = Instant::now();
        match self.dispatch(&config).await {
            Ok((outcome, raw_body_len)) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                self.emit_audit(
                    tool,
                    base_url,
                    &config,
                    Some((outcome.status, raw_body_len)),
                    duration_ms,
                    is_playground,
                );
                if outcome.status < 400 {
                    formatter::format_success(
                        tool.response_formatting.as_ref(),
                        &tool.response_schemas,
                        &outcome,
                        &config,
                        call_params,
                        &claims,
                    )
                } else {
                    formatter::format_http_error(
                        tool.response_formatting.as_ref(),
                        &tool.response_schemas,
                        &outcome,
                        &config,
                        call_params,
                        &claims,
                    )
                }
            }
            Err(message) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                self.emit_audit(tool, base_url, &config, None, duration_ms, is_playground);
                formatter::format_transport_error(
                    tool.response_formatting.as_ref(),
                    &config,
                    call_params,
                    &claims,
                    &message,
                )
            }
        }
    }

    // Returns the parsed outcome plus the raw body length; `bodyLen` in the
    // audit line is the payload as received, not a re-serialization.
    async fn dispatch(&self, config: &RequestConfig) -> Result<(ResponseOutcome, usize), String> {
        let method = reqwest::Method::from_str(&config.method)
            .map_err(|_| format!("Unsupported HTTP method '{}'", config.method))?;
        let mut builder = self
            .client
            .request(method, &config.url)
            .timeout(Duration::from_millis(self.config.request_timeout_ms));

        if !config.headers.contains_key("User-Agent") {
            builder = builder.header("User-Agent", &self.config.user_agent);
        }
        if !config.headers.contains_key("Accept") {
            builder = builder.header("Accept", constants::http::ACCEPT);
        }
        for (name, value) in &config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match &config.body {
            Some(RequestBody::Json(value)) => builder = builder.json(value),
            Some(RequestBody::Form(pairs)) => builder = builder.form(pairs),
            None => {}
        }

        let response = builder.send().await.map_err(|err| err.to_string())?;
        let status = response.status();
        let mut headers = Map::new();
        for (name, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                headers.insert(name.to_string(), Value::String(text.to_string()));
            }
        }
        let text = response.text().await.map_err(|err| err.to_string())?;
        let raw_body_len = text.len();
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(text),
        };
        Ok((
            ResponseOutcome {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                headers,
                body,
            },
            raw_body_len,
        ))
    }

    // Field names and the message text are a compatibility contract with
    // downstream log-based metrics. Do not rephrase.
    fn emit_audit(
        &self,
        tool: &ToolDescriptor,
        base_url: &str,
        config: &RequestConfig,
        outcome: Option<(u16, usize)>,
        duration_ms: u64,
        is_playground: bool,
    ) {
        let (status_code, body_len, failed) = match outcome {
            Some((status, body_len)) => (status, body_len, false),
            None => (0, 0, true),
        };
        self.audit.append(&serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "message": "tool invocation",
            "toolId": tool.id,
            "baseUrl": base_url,
            "url": config.url,
            "method": config.method,
            "statusCode": status_code,
            "bodyLen": body_len,
            "durationMS": duration_ms,
            "failed": failed,
            "isPlayground": is_playground,
        }));
    }
}

fn apply_auth_header(config: &mut RequestConfig, resolution: &AuthResolution) {
    match resolution {
        AuthResolution::ApiKey { key, header_name } => {
            let name = header_name.as_deref().unwrap_or("Authorization");
            config
                .headers
                .entry(name.to_string())
                .or_insert_with(|| key.clone());
        }
        AuthResolution::Valid(token) | AuthResolution::Refreshed(token) => {
            config
                .headers
                .entry("Authorization".to_string())
                .or_insert_with(|| format!("Bearer {}", token.access_token));
        }
        _ => {}
    }
}

