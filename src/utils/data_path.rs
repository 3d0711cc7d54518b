use serde_json::Value;

/// Resolve a dotted path (`a.b.c`, with optional `[n]` index segments)
/// against a JSON value. Returns `None` when any segment is absent, which
/// callers surface however their context demands (typed `null` substitution
/// for body templates, empty string for rendered text).
pub fn get_path_value(target: &Value, path: &str) -> Option<Value> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Some(target.clone());
    }
    let mut current = target;
    for segment in split_segments(trimmed) {
        current = match segment {
            Segment::Key(key) => current.get(key)?,
            Segment::Index(index) => current.as_array()?.get(index)?,
        };
    }
    Some(current.clone())
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn split_segments(path: &str) -> impl Iterator<Item = Segment<'_>> {
    path.split(['.', '[']).filter_map(|raw| {
        let cleaned = raw.trim().trim_end_matches(']').trim_matches('"');
        if cleaned.is_empty() {
            return None;
        }
        match cleaned.parse::<usize>() {
            Ok(index) => Some(Segment::Index(index)),
            Err(_) => Some(Segment::Key(cleaned)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::get_path_value;
    use serde_json::json;

    #[test]
    fn resolves_nested_keys() {
        let target = json!({"a": {"b": {"c": true}}});
        assert_eq!(get_path_value(&target, "a.b.c"), Some(json!(true)));
    }

    #[test]
    fn resolves_array_indexes() {
        let target = json!({"items": [{"id": 7}]});
        assert_eq!(get_path_value(&target, "items[0].id"), Some(json!(7)));
        assert_eq!(get_path_value(&target, "items.0.id"), Some(json!(7)));
    }

    #[test]
    fn missing_segment_is_none() {
        let target = json!({"a": 1});
        assert_eq!(get_path_value(&target, "a.b"), None);
    }

    #[test]
    fn preserves_value_types() {
        let target = json!({"flag": false, "count": 3.5});
        assert_eq!(get_path_value(&target, "flag"), Some(json!(false)));
        assert_eq!(get_path_value(&target, "count"), Some(json!(3.5)));
    }
}
