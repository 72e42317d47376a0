//! `{Name}` placeholder extraction and substitution.
//!
//! Response headers, bodies, constraint diagnostics and stored-document
//! overrides are all rendered through this module.
//!
//! # Placeholder syntax
//!
//! - `{Kind}` - a route capture, query parameter or body property
//! - `{Header:X-Tenant}` - names may contain punctuation; they are opaque
//! - `{"a": 1}` - never a placeholder (quotes and whitespace are not allowed)
//!
//! Placeholders whose name is not in the variable map are left untouched,
//! braces included, so a misconfigured template shows its own mistake in the
//! rendered output instead of failing.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Regex for matching placeholders: {Kind}, {Header:X-Tenant}, etc.
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r#"\{([^{}\s"]+)\}"#).expect("placeholder regex is valid")
    })
}

/// Case-insensitive variable map used for substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    /// Keyed by lower-cased name.
    values: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable. Names compare case-insensitively.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into().to_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut vars = Variables::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}

/// Distinct placeholder names in first-occurrence order.
pub fn variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in get_placeholder_regex().captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Replace every placeholder present in `vars`; leave the rest verbatim.
pub fn substitute(template: &str, vars: &Variables) -> String {
    get_placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_first_occurrence_order() {
        let names = variables("{B} and {A} then {B} and {C}");
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_variables_with_punctuation() {
        let names = variables("{Header:X-Tenant}/{Store:Record}");
        assert_eq!(names, vec!["Header:X-Tenant", "Store:Record"]);
    }

    #[test]
    fn test_variables_ignore_json_literals() {
        let names = variables(r#"{"kind": "{Kind}", "nested": {"a": 1}}"#);
        assert_eq!(names, vec!["Kind"]);
    }

    #[test]
    fn test_substitute_unknown_left_verbatim() {
        assert_eq!(substitute("a{Unknown}b", &Variables::new()), "a{Unknown}b");
    }

    #[test]
    fn test_substitute_case_insensitive() {
        let vars: Variables = [("owner", "Me")].into_iter().collect();
        assert_eq!(substitute("{Owner}", &vars), "Me");
    }

    #[test]
    fn test_substitute_mixed() {
        let vars: Variables = [("Kind", "Dog"), ("Header:X-Tenant", "acme")]
            .into_iter()
            .collect();
        let result = substitute(r#"{"kind": "{Kind}", "t": "{header:x-tenant}", "x": "{X}"}"#, &vars);
        assert_eq!(result, r#"{"kind": "Dog", "t": "acme", "x": "{X}"}"#);
    }

    #[test]
    fn test_variables_later_insert_wins() {
        let mut vars = Variables::new();
        vars.insert("Kind", "Cat");
        vars.insert("KIND", "Dog");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("kind"), Some("Dog"));
    }
}
