use serde_json::{json, Map, Value};
use toolcall::managers::overrides::{detect_shape, resolve, OverrideShape};
use toolcall::model::ParamLocation;
use toolcall::services::logger::Logger;

fn call_params(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[test]
fn structured_keys_win_even_next_to_legacy_looking_entries() {
    let raw = json!({
        "query": {"limit": "10"},
        "apiKey": {"value": "{{auth.apiKey}}", "location": "header"},
    });
    match detect_shape(&raw) {
        OverrideShape::Structured(structured) => {
            assert_eq!(structured.query.get("limit").map(String::as_str), Some("10"));
        }
        other => panic!("expected structured shape, got {:?}", other),
    }
}

#[test]
fn legacy_entries_detect_as_legacy() {
    let raw = json!({
        "apiKey": {"value": "{{auth.apiKey}}", "location": "header"},
        "page": {"value": "1"},
    });
    match detect_shape(&raw) {
        OverrideShape::Legacy(entries) => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries["apiKey"].location, ParamLocation::Header);
            // Location defaults to query when absent.
            assert_eq!(entries["page"].location, ParamLocation::Query);
        }
        other => panic!("expected legacy shape, got {:?}", other),
    }
}

#[test]
fn empty_and_non_object_overrides_are_no_overrides() {
    assert!(matches!(detect_shape(&json!({})), OverrideShape::None));
    assert!(matches!(detect_shape(&json!("nope")), OverrideShape::None));
    assert!(matches!(detect_shape(&json!(null)), OverrideShape::None));
}

#[test]
fn full_variable_body_field_keeps_its_type() {
    let shape = detect_shape(&json!({
        "body": {
            "active": "{{toolParams.active}}",
            "count": "{{toolParams.count}}",
            "label": "todo-{{toolParams.count}}",
            "fixed": 7,
        }
    }));
    let params = call_params(&[("active", json!(true)), ("count", json!(3))]);
    let resolved = resolve(&shape, &params, &json!({}), &Logger::new("test"));

    let body = &resolved.params["body"];
    assert_eq!(body["active"], json!(true), "boolean must stay a boolean");
    assert_eq!(body["count"], json!(3), "number must stay a number");
    assert_eq!(body["label"], json!("todo-3"), "mixed template renders to text");
    assert_eq!(body["fixed"], json!(7), "non-string leaves pass through");
    assert_eq!(resolved.specs["body"].location, ParamLocation::Body);
}

#[test]
fn form_body_format_renders_each_field_as_form_data() {
    let shape = detect_shape(&json!({
        "body": {"grant": "{{toolParams.grant}}"},
        "bodyFormat": "form",
    }));
    let params = call_params(&[("grant", json!("client_credentials"))]);
    let resolved = resolve(&shape, &params, &json!({}), &Logger::new("test"));

    assert_eq!(resolved.params["grant"], json!("client_credentials"));
    assert_eq!(resolved.specs["grant"].location, ParamLocation::FormData);
    assert!(!resolved.params.contains_key("body"));
}

#[test]
fn empty_query_render_is_dropped_but_empty_path_render_is_kept() {
    let shape = detect_shape(&json!({
        "query": {"filter": "{{toolParams.missing}}"},
        "path": {"id": "{{toolParams.missing}}"},
    }));
    let resolved = resolve(&shape, &Map::new(), &json!({}), &Logger::new("test"));

    assert!(!resolved.params.contains_key("filter"));
    assert_eq!(resolved.params["id"], json!(""));
    assert!(resolved.specs["id"].required, "path params are always required");
}

#[test]
fn legacy_values_render_with_auth_context() {
    let shape = detect_shape(&json!({
        "apiKey": {"value": "{{auth.apiKey}}", "location": "header"},
    }));
    let resolved = resolve(
        &shape,
        &Map::new(),
        &json!({"type": "apiKey", "apiKey": "k-123"}),
        &Logger::new("test"),
    );
    assert_eq!(resolved.params["apiKey"], json!("k-123"));
    assert_eq!(resolved.specs["apiKey"].location, ParamLocation::Header);
}
