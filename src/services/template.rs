use crate::services::logger::Logger;
use crate::utils::text::scalar_text;
use base64::Engine;
use handlebars::{handlebars_helper, no_escape, Handlebars};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::cmp::Ordering;

// Two immutable process-wide registries. Overrides and platform-authored
// formatting render with the trusted set; agent-authored response templates
// only ever see `json` plus the built-in #if/#each blocks. The asymmetry is
// a contract: an agent template using eq/gt/lt must fail to resolve.

handlebars_helper!(json_helper: |v: Json| serde_json::to_string(v).unwrap_or_default());
handlebars_helper!(eq_helper: |a: Json, b: Json| a == b);
handlebars_helper!(ne_helper: |a: Json, b: Json| a != b);
handlebars_helper!(gt_helper: |a: Json, b: Json| json_cmp(a, b) == Some(Ordering::Greater));
handlebars_helper!(lt_helper: |a: Json, b: Json| json_cmp(a, b) == Some(Ordering::Less));
handlebars_helper!(concat_helper: |*args| {
    args.iter().map(|v| scalar_text(v)).collect::<String>()
});
handlebars_helper!(base64_helper: |s: str| {
    base64::engine::general_purpose::STANDARD.encode(s)
});

fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

fn base_registry() -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(no_escape);
    registry.register_helper("json", Box::new(json_helper));
    registry
}

static TRUSTED: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut registry = base_registry();
    registry.register_helper("eq", Box::new(eq_helper));
    registry.register_helper("ne", Box::new(ne_helper));
    registry.register_helper("gt", Box::new(gt_helper));
    registry.register_helper("lt", Box::new(lt_helper));
    registry.register_helper("concat", Box::new(concat_helper));
    registry.register_helper("base64", Box::new(base64_helper));
    registry
});

static AGENT: Lazy<Handlebars<'static>> = Lazy::new(base_registry);

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("template"));

fn render_with(registry: &Handlebars<'static>, template: &str, context: &Value) -> String {
    match registry.render_template(template, context) {
        Ok(rendered) => rendered,
        Err(err) => {
            LOGGER.warn(
                "Template render failed",
                Some(&serde_json::json!({"error": err.to_string()})),
            );
            format!("[template error: {}]", err)
        }
    }
}

/// Render with the full helper set. For overrides and platform-owned
/// formatting only; never hand agent-authored templates to this registry.
pub fn render_trusted(template: &str, context: &Value) -> String {
    render_with(&TRUSTED, template, context)
}

/// Render with the restricted helper set (`json`, `#if`, `#each`).
pub fn render_agent(template: &str, context: &Value) -> String {
    render_with(&AGENT, template, context)
}

/// `"{{a.b.c}}"` with nothing around it is a bare variable reference whose
/// typed value is substituted directly instead of its rendered string.
pub fn single_variable(template: &str) -> Option<&str> {
    let inner = template
        .trim()
        .strip_prefix("{{")?
        .strip_suffix("}}")?
        .trim();
    if inner.is_empty()
        || inner.contains(['{', '}'])
        || inner.starts_with(['#', '/', '^', '!', '>'])
        || inner.contains(char::is_whitespace)
    {
        return None;
    }
    Some(inner)
}
