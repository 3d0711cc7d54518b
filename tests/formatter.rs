use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use toolcall::managers::formatter::{
    format_http_error, format_success, format_transport_error, ResponseOutcome,
};
use toolcall::model::{FormattingConfig, RequestConfig};

fn request() -> RequestConfig {
    RequestConfig {
        method: "GET".to_string(),
        url: "https://api.example.com/todos".to_string(),
        headers: BTreeMap::new(),
        query: Vec::new(),
        body: None,
    }
}

fn outcome(status: u16, body: Value) -> ResponseOutcome {
    ResponseOutcome {
        status,
        status_text: match status {
            200 => "OK".to_string(),
            404 => "Not Found".to_string(),
            other => other.to_string(),
        },
        headers: Map::new(),
        body,
    }
}

fn formatting() -> FormattingConfig {
    FormattingConfig {
        template: None,
        item_template: None,
        separator: None,
        header: None,
        empty_result: None,
        error_template: None,
        trusted: false,
    }
}

#[test]
fn empty_array_with_empty_result_short_circuits_to_header_plus_empty() {
    let fmt = FormattingConfig {
        item_template: Some("{{item.title}}".to_string()),
        header: Some("Results: ".to_string()),
        empty_result: Some("none".to_string()),
        ..formatting()
    };
    let result = format_success(
        Some(&fmt),
        &BTreeMap::new(),
        &outcome(200, json!([])),
        &request(),
        &Map::new(),
        &json!({}),
    );
    assert_eq!(result.first_text(), Some("Results: none"));
    assert!(!result.is_error);
}

#[test]
fn item_template_renders_each_element_joined_by_separator() {
    let fmt = FormattingConfig {
        item_template: Some("- {{item.title}}".to_string()),
        separator: Some("\n".to_string()),
        header: Some("Todos:\n".to_string()),
        ..formatting()
    };
    let result = format_success(
        Some(&fmt),
        &BTreeMap::new(),
        &outcome(200, json!([{"title": "a"}, {"title": "b"}])),
        &request(),
        &Map::new(),
        &json!({}),
    );
    assert_eq!(result.first_text(), Some("Todos:\n- a\n- b"));
}

#[test]
fn whole_response_template_takes_precedence_over_item_template() {
    let fmt = FormattingConfig {
        template: Some("{{response.data.body.total}} total".to_string()),
        item_template: Some("unused".to_string()),
        ..formatting()
    };
    let result = format_success(
        Some(&fmt),
        &BTreeMap::new(),
        &outcome(200, json!({"total": 5})),
        &request(),
        &Map::new(),
        &json!({}),
    );
    assert_eq!(result.first_text(), Some("5 total"));
}

#[test]
fn no_formatting_falls_back_to_pretty_json_envelope() {
    let mut schemas = BTreeMap::new();
    schemas.insert("200".to_string(), json!({"type": "array"}));
    let result = format_success(
        None,
        &schemas,
        &outcome(200, json!([1, 2])),
        &request(),
        &Map::new(),
        &json!({}),
    );
    let parsed: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
    assert_eq!(parsed["schema"], json!({"type": "array"}));
    assert_eq!(parsed["data"]["body"], json!([1, 2]));
}

#[test]
fn http_404_without_error_template_reports_status_in_envelope() {
    let result = format_http_error(
        None,
        &BTreeMap::new(),
        &outcome(404, json!({"detail": "no such todo"})),
        &request(),
        &Map::new(),
        &json!({}),
    );
    assert!(result.is_error);
    let parsed: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
    assert_eq!(parsed["data"]["content"]["status"], json!(404));
    assert_eq!(parsed["data"]["content"]["statusText"], json!("Not Found"));
    assert_eq!(parsed["data"]["content"]["data"], json!({"detail": "no such todo"}));
}

#[test]
fn error_template_sees_the_error_message() {
    let fmt = FormattingConfig {
        error_template: Some("Oops: {{message}}".to_string()),
        ..formatting()
    };
    let result = format_http_error(
        Some(&fmt),
        &BTreeMap::new(),
        &outcome(500, json!({})),
        &request(),
        &Map::new(),
        &json!({}),
    );
    assert!(result.is_error);
    assert_eq!(
        result.first_text(),
        Some("Oops: Request failed with status code 500")
    );
}

#[test]
fn transport_failure_without_template_is_the_plain_string() {
    let result =
        format_transport_error(None, &request(), &Map::new(), &json!({}), "connection refused");
    assert!(result.is_error);
    assert_eq!(
        result.first_text(),
        Some("API call failed: connection refused")
    );
}

#[test]
fn schema_lookup_prefers_exact_status_then_default() {
    let mut schemas = BTreeMap::new();
    schemas.insert("default".to_string(), json!({"kind": "fallback"}));
    schemas.insert("200".to_string(), json!({"kind": "exact"}));

    let exact = format_success(
        None,
        &schemas,
        &outcome(200, json!({})),
        &request(),
        &Map::new(),
        &json!({}),
    );
    let parsed: Value = serde_json::from_str(exact.first_text().unwrap()).unwrap();
    assert_eq!(parsed["schema"]["kind"], json!("exact"));

    let fallback = format_success(
        None,
        &schemas,
        &outcome(201, json!({})),
        &request(),
        &Map::new(),
        &json!({}),
    );
    let parsed: Value = serde_json::from_str(fallback.first_text().unwrap()).unwrap();
    assert_eq!(parsed["schema"]["kind"], json!("fallback"));
}
