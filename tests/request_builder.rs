use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use toolcall::managers::request::{build, BuildOutcome};
use toolcall::model::{ParamLocation, ParameterSpec, RequestBody};

fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn specs(entries: Vec<(&str, ParameterSpec)>) -> BTreeMap<String, ParameterSpec> {
    entries
        .into_iter()
        .map(|(name, spec)| (name.to_string(), spec))
        .collect()
}

fn ready(outcome: BuildOutcome) -> toolcall::model::RequestConfig {
    match outcome {
        BuildOutcome::Ready(config) => config,
        BuildOutcome::MissingParam(name) => panic!("unexpected missing param: {}", name),
    }
}

#[test]
fn missing_required_param_aborts_before_any_request_exists() {
    let spec_params = specs(vec![(
        "status",
        ParameterSpec::at(ParamLocation::Query).required(),
    )]);
    let outcome = build(
        "GET",
        "/todos",
        "https://api.example.com",
        &spec_params,
        &Map::new(),
        "listTodos",
    )
    .unwrap();
    match outcome {
        BuildOutcome::MissingParam(name) => assert_eq!(name, "status"),
        BuildOutcome::Ready(_) => panic!("must not build a request without a required param"),
    }
}

#[test]
fn required_param_with_declared_default_is_not_missing() {
    let mut spec = ParameterSpec::at(ParamLocation::Query).required();
    spec.schema = json!({"type": "string", "default": "open"});
    let spec_params = specs(vec![("status", spec)]);
    let config = ready(
        build(
            "GET",
            "/todos",
            "https://api.example.com",
            &spec_params,
            &Map::new(),
            "listTodos",
        )
        .unwrap(),
    );
    assert!(config.url.contains("status=open"), "{}", config.url);
}

#[test]
fn query_array_explode_repeats_the_key() {
    let mut spec = ParameterSpec::at(ParamLocation::Query);
    spec.explode = true;
    let spec_params = specs(vec![("tag", spec)]);
    let config = ready(
        build(
            "GET",
            "/todos",
            "https://api.example.com",
            &spec_params,
            &params(&[("tag", json!(["a", "b"]))]),
            "listTodos",
        )
        .unwrap(),
    );
    assert!(config.url.contains("tag=a&tag=b"), "{}", config.url);
}

#[test]
fn query_array_without_explode_joins_with_commas() {
    let spec_params = specs(vec![("tag", ParameterSpec::at(ParamLocation::Query))]);
    let config = ready(
        build(
            "GET",
            "/todos",
            "https://api.example.com",
            &spec_params,
            &params(&[("tag", json!(["a", "b"]))]),
            "listTodos",
        )
        .unwrap(),
    );
    assert!(config.url.contains("tag=a%2Cb"), "{}", config.url);
}

#[test]
fn numeric_path_param_substitutes_with_no_placeholder_left() {
    let spec_params = specs(vec![(
        "id",
        ParameterSpec::at(ParamLocation::Path).required(),
    )]);
    let config = ready(
        build(
            "GET",
            "/todos/{id}",
            "https://api.example.com",
            &spec_params,
            &params(&[("id", json!(42))]),
            "getTodo",
        )
        .unwrap(),
    );
    assert!(config.url.ends_with("/todos/42"), "{}", config.url);
    assert!(!config.url.contains("{id}"));
}

#[test]
fn leftover_path_placeholder_is_a_validation_error() {
    let err = build(
        "GET",
        "/todos/{id}",
        "https://api.example.com",
        &BTreeMap::new(),
        &Map::new(),
        "getTodo",
    )
    .unwrap_err();
    assert!(err.message.contains("id"), "{}", err.message);
}

#[test]
fn cookie_params_fold_into_one_header() {
    let spec_params = specs(vec![
        ("session", ParameterSpec::at(ParamLocation::Cookie)),
        ("theme", ParameterSpec::at(ParamLocation::Cookie)),
    ]);
    let config = ready(
        build(
            "GET",
            "/todos",
            "https://api.example.com",
            &spec_params,
            &params(&[("session", json!("s1")), ("theme", json!("dark"))]),
            "listTodos",
        )
        .unwrap(),
    );
    assert_eq!(
        config.headers.get("Cookie").map(String::as_str),
        Some("session=s1; theme=dark")
    );
}

#[test]
fn explicit_body_param_beats_form_fields() {
    let spec_params = specs(vec![
        ("payload", ParameterSpec::at(ParamLocation::Body)),
        ("field", ParameterSpec::at(ParamLocation::FormData)),
    ]);
    let config = ready(
        build(
            "POST",
            "/todos",
            "https://api.example.com",
            &spec_params,
            &params(&[("payload", json!({"a": 1})), ("field", json!("x"))]),
            "createTodo",
        )
        .unwrap(),
    );
    match config.body {
        Some(RequestBody::Json(body)) => assert_eq!(body["payload"], json!({"a": 1})),
        other => panic!("expected JSON body, got {:?}", other),
    }
    assert_eq!(
        config.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
}

#[test]
fn form_fields_without_explicit_body_become_a_form_body() {
    let spec_params = specs(vec![("field", ParameterSpec::at(ParamLocation::FormData))]);
    let config = ready(
        build(
            "POST",
            "/todos",
            "https://api.example.com",
            &spec_params,
            &params(&[("field", json!("x"))]),
            "createTodo",
        )
        .unwrap(),
    );
    match config.body {
        Some(RequestBody::Form(pairs)) => {
            assert_eq!(pairs, vec![("field".to_string(), "x".to_string())])
        }
        other => panic!("expected form body, got {:?}", other),
    }
    assert_eq!(
        config.headers.get("Content-Type").map(String::as_str),
        Some("application/x-www-form-urlencoded")
    );
}

#[test]
fn unclassified_call_params_fall_through_to_json_body_for_post() {
    let config = ready(
        build(
            "POST",
            "/todos",
            "https://api.example.com",
            &BTreeMap::new(),
            &params(&[("title", json!("write tests")), ("done", json!(false))]),
            "createTodo",
        )
        .unwrap(),
    );
    match config.body {
        Some(RequestBody::Json(body)) => {
            assert_eq!(body["title"], json!("write tests"));
            assert_eq!(body["done"], json!(false));
        }
        other => panic!("expected JSON body, got {:?}", other),
    }
}

#[test]
fn unclassified_call_params_are_ignored_for_get() {
    let config = ready(
        build(
            "GET",
            "/todos",
            "https://api.example.com",
            &BTreeMap::new(),
            &params(&[("title", json!("ignored"))]),
            "listTodos",
        )
        .unwrap(),
    );
    assert!(config.body.is_none());
}

#[test]
fn caller_authorization_always_wins() {
    let spec_params = specs(vec![("Authorization", {
        let mut spec = ParameterSpec::at(ParamLocation::Header);
        spec.schema = json!({"default": "Bearer from-spec"});
        spec
    })]);
    let config = ready(
        build(
            "GET",
            "/todos",
            "https://api.example.com",
            &spec_params,
            &params(&[("Authorization", json!("Bearer from-caller"))]),
            "listTodos",
        )
        .unwrap(),
    );
    assert_eq!(
        config.headers.get("Authorization").map(String::as_str),
        Some("Bearer from-caller")
    );
}
