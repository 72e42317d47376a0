//! JSON document helpers shared by constraints, the store and the engine.

use serde_json::{Map, Value};

/// Look up a top-level property. An exact name match wins over a
/// case-insensitive one.
pub fn property<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
    let object = doc.as_object()?;
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// String form of a property value. `None` for JSON null.
///
/// Strings are returned without quotes; everything else uses its JSON text.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Property value as a string; `None` when absent or null.
pub fn property_string(doc: &Value, name: &str) -> Option<String> {
    property(doc, name).and_then(value_to_string)
}

/// Set a top-level property, replacing an existing one that matches
/// case-insensitively so the stored name stays stable.
///
/// `null` is promoted to an empty object. Returns false, leaving the
/// document untouched, for arrays and other scalars.
pub fn set_property(doc: &mut Value, name: &str, value: Value) -> bool {
    if doc.is_null() {
        *doc = Value::Object(Map::new());
    }
    let Value::Object(object) = doc else {
        return false;
    };
    let existing = object
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .cloned();
    object.insert(existing.unwrap_or_else(|| name.to_string()), value);
    true
}

/// Top-level scalar properties as `(name, text)` pairs, in document order.
pub fn scalar_properties(doc: &Value) -> Vec<(String, String)> {
    doc.as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(_, value)| !value.is_object() && !value.is_array())
                .filter_map(|(key, value)| value_to_string(value).map(|v| (key.clone(), v)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_exact_then_case_insensitive() {
        let doc = json!({"Kind": "Dog", "kind": "Cat", "Age": 3});
        assert_eq!(property(&doc, "kind"), Some(&json!("Cat")));
        assert_eq!(property(&doc, "AGE"), Some(&json!(3)));
        assert_eq!(property(&doc, "Missing"), None);
        assert_eq!(property(&json!([1, 2]), "Kind"), None);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("Dog")), Some("Dog".to_string()));
        assert_eq!(value_to_string(&json!(42)), Some("42".to_string()));
        assert_eq!(value_to_string(&json!(true)), Some("true".to_string()));
        assert_eq!(value_to_string(&json!(null)), None);
    }

    #[test]
    fn test_set_property_keeps_existing_name() {
        let mut doc = json!({"Kind": "Dog"});
        set_property(&mut doc, "kind", json!("Cat"));
        assert_eq!(doc, json!({"Kind": "Cat"}));

        let mut doc = json!(null);
        assert!(set_property(&mut doc, "Kind", json!("Dog")));
        assert_eq!(doc, json!({"Kind": "Dog"}));

        let mut doc = json!(["Dog"]);
        assert!(!set_property(&mut doc, "Kind", json!("Cat")));
        assert_eq!(doc, json!(["Dog"]));
    }

    #[test]
    fn test_scalar_properties_in_order() {
        let doc = json!({"b": 1, "a": "x", "nested": {"c": 2}, "list": [1], "none": null});
        assert_eq!(
            scalar_properties(&doc),
            vec![
                ("b".to_string(), "1".to_string()),
                ("a".to_string(), "x".to_string())
            ]
        );
    }
}
