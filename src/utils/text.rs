use serde_json::Value;

/// Flatten a JSON value into the text form used for query strings, headers,
/// form fields, and template helper output. Null becomes the empty string;
/// composites serialize compactly.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::scalar_text;
    use serde_json::json;

    #[test]
    fn flattens_json_scalars() {
        assert_eq!(scalar_text(&json!(true)), "true");
        assert_eq!(scalar_text(&json!(null)), "");
        assert_eq!(scalar_text(&json!(2.5)), "2.5");
        assert_eq!(scalar_text(&json!("plain")), "plain");
        assert_eq!(scalar_text(&json!([1, 2])), "[1,2]");
        assert_eq!(scalar_text(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
