//! Request body constraints.
//!
//! A constraint is a predicate over one top-level property of a JSON request
//! body, paired with a response template describing the outcome. The set of
//! predicates is closed:
//!
//! - `IsNull` - the property is present and JSON null
//! - `IsMissing` / `IsEmpty` - the property is absent
//! - `Length` - the measured length compares against expected bounds
//!
//! Evaluation is pure: [`Constraint::evaluate`] returns a [`ConstraintOutcome`]
//! carrying the measured length, so a constraint can be shared between threads
//! and evaluated concurrently. A constraint with no property name, or a null
//! document, never passes.

mod length;
mod wire;

pub use length::{measure, LengthConstraint, LengthKind};
pub use wire::{ConstraintError, RawConstraint};

use crate::document;
use crate::template::{self, Variables};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicate applied to the named property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintRule {
    IsNull,
    IsMissing,
    IsEmpty,
    Length(LengthConstraint),
}

impl ConstraintRule {
    pub fn kind_name(&self) -> String {
        match self {
            ConstraintRule::IsNull => "IsNull".to_string(),
            ConstraintRule::IsMissing => "IsMissing".to_string(),
            ConstraintRule::IsEmpty => "IsEmpty".to_string(),
            ConstraintRule::Length(length) => format!("Length{}", length.kind.name()),
        }
    }

    pub fn description(&self) -> String {
        match self {
            ConstraintRule::IsNull => "null".to_string(),
            ConstraintRule::IsMissing => "missing".to_string(),
            ConstraintRule::IsEmpty => "empty".to_string(),
            ConstraintRule::Length(length) => length.kind.description(),
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            ConstraintRule::IsNull => "'{PropertyName}' must be null (has value: {PropertyHasValue})",
            ConstraintRule::IsMissing => {
                "'{PropertyName}' must be missing (has value: {PropertyHasValue})"
            }
            ConstraintRule::IsEmpty => "'{PropertyName}' must be empty (has value: {PropertyHasValue})",
            ConstraintRule::Length(_) => {
                "'{PropertyName}' length must be {Description} (actual length: {ActualLength})"
            }
        }
    }
}

/// Result of evaluating one constraint against one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintOutcome {
    pub passed: bool,
    /// Length measured for diagnostics; `None` when nothing was measured.
    pub actual_length: Option<usize>,
}

impl ConstraintOutcome {
    fn failed() -> Self {
        Self::default()
    }
}

/// A constraint together with its outcome and rendered state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedConstraint {
    pub constraint: Constraint,
    #[serde(flatten)]
    pub outcome: ConstraintOutcome,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConstraint", into = "RawConstraint")]
pub struct Constraint {
    pub property_name: Option<String>,
    pub rule: ConstraintRule,
    /// Overrides the rule's default template when set.
    pub response_template: Option<String>,
}

impl Constraint {
    pub fn new(property_name: impl Into<String>, rule: ConstraintRule) -> Self {
        Self {
            property_name: Some(property_name.into()),
            rule,
            response_template: None,
        }
    }

    pub fn is_null(property_name: impl Into<String>) -> Self {
        Self::new(property_name, ConstraintRule::IsNull)
    }

    pub fn is_missing(property_name: impl Into<String>) -> Self {
        Self::new(property_name, ConstraintRule::IsMissing)
    }

    pub fn is_empty(property_name: impl Into<String>) -> Self {
        Self::new(property_name, ConstraintRule::IsEmpty)
    }

    pub fn length(property_name: impl Into<String>, length: LengthConstraint) -> Self {
        Self::new(property_name, ConstraintRule::Length(length))
    }

    pub fn length_between(property_name: impl Into<String>, minimum: usize, maximum: usize) -> Self {
        Self::length(
            property_name,
            LengthConstraint::new(LengthKind::Between { minimum, maximum }),
        )
    }

    pub fn with_response_template(mut self, template: impl Into<String>) -> Self {
        self.response_template = Some(template.into());
        self
    }

    /// Property name, treating an empty name as unset.
    pub fn property_name(&self) -> Option<&str> {
        self.property_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn template(&self) -> &str {
        self.response_template
            .as_deref()
            .unwrap_or_else(|| self.rule.default_template())
    }

    pub fn evaluate(&self, doc: Option<&Value>) -> ConstraintOutcome {
        let (Some(name), Some(doc)) = (self.property_name(), doc) else {
            return ConstraintOutcome::failed();
        };
        if doc.is_null() {
            return ConstraintOutcome::failed();
        }

        let value = document::property(doc, name);
        let measured = value.filter(|v| !v.is_null()).map(measure);

        match &self.rule {
            ConstraintRule::IsMissing | ConstraintRule::IsEmpty => ConstraintOutcome {
                passed: value.is_none(),
                actual_length: measured,
            },
            ConstraintRule::IsNull => ConstraintOutcome {
                passed: matches!(value, Some(Value::Null)),
                actual_length: measured,
            },
            ConstraintRule::Length(length) => length.evaluate(value),
        }
    }

    /// Render the response template for an outcome.
    pub fn state(&self, doc: Option<&Value>, outcome: &ConstraintOutcome) -> String {
        template::substitute(self.template(), &self.state_variables(doc, outcome))
    }

    /// Evaluate and render in one step.
    pub fn check(&self, doc: Option<&Value>) -> EvaluatedConstraint {
        let outcome = self.evaluate(doc);
        EvaluatedConstraint {
            constraint: self.clone(),
            state: self.state(doc, &outcome),
            outcome,
        }
    }

    fn state_variables(&self, doc: Option<&Value>, outcome: &ConstraintOutcome) -> Variables {
        let mut vars = Variables::new();
        vars.insert("Kind", self.rule.kind_name());
        vars.insert("Description", self.rule.description());

        let value = match (self.property_name(), doc) {
            (Some(name), Some(doc)) => {
                vars.insert("PropertyName", name);
                document::property(doc, name)
            }
            (Some(name), None) => {
                vars.insert("PropertyName", name);
                None
            }
            _ => None,
        };

        let has_value = value.is_some_and(|v| !v.is_null());
        vars.insert("PropertyHasValue", has_value.to_string());
        vars.insert(
            "PropertyValue",
            match value {
                None => String::new(),
                Some(Value::Null) => "null".to_string(),
                Some(v) => document::value_to_string(v).unwrap_or_default(),
            },
        );
        vars.insert(
            "ActualLength",
            outcome
                .actual_length
                .map_or_else(|| "none".to_string(), |len| len.to_string()),
        );

        if let ConstraintRule::Length(length) = &self.rule {
            if let Some(expected) = length.kind.expected() {
                vars.insert("ExpectedLength", expected.to_string());
            }
            if let Some(minimum) = length.kind.minimum() {
                vars.insert("MinimumLength", minimum.to_string());
            }
            if let Some(maximum) = length.kind.maximum() {
                vars.insert("MaximumLength", maximum.to_string());
            }
        }

        vars
    }
}

/// Split evaluated constraints into `(satisfied, violated)`.
pub fn evaluate_all(
    constraints: &[Constraint],
    doc: Option<&Value>,
) -> (Vec<EvaluatedConstraint>, Vec<EvaluatedConstraint>) {
    constraints
        .iter()
        .map(|c| c.check(doc))
        .partition(|evaluated| evaluated.outcome.passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_kinds() -> Vec<Constraint> {
        vec![
            Constraint::is_null("Name"),
            Constraint::is_missing("Name"),
            Constraint::is_empty("Name"),
            Constraint::length_between("Name", 0, 8),
            Constraint::length(
                "Name",
                LengthConstraint::new(LengthKind::NotEquals { expected: 3 })
                    .treat_missing_as_zero(true)
                    .treat_null_as_zero(true),
            ),
        ]
    }

    #[test]
    fn test_fails_closed_on_missing_configuration() {
        let doc = json!({"Other": 1});
        for mut constraint in all_kinds() {
            assert!(!constraint.evaluate(None).passed);
            assert!(!constraint.evaluate(Some(&Value::Null)).passed);

            constraint.property_name = None;
            assert!(!constraint.evaluate(Some(&doc)).passed);
            constraint.property_name = Some(String::new());
            assert!(!constraint.evaluate(Some(&doc)).passed);
        }
    }

    #[test]
    fn test_is_missing_and_is_empty() {
        let present = json!({"Name": "Rex"});
        let absent = json!({"Other": "x"});
        let null = json!({"Name": null});

        for constraint in [Constraint::is_missing("Name"), Constraint::is_empty("Name")] {
            assert!(constraint.evaluate(Some(&absent)).passed);
            assert!(!constraint.evaluate(Some(&present)).passed);
            assert!(!constraint.evaluate(Some(&null)).passed);
        }
    }

    #[test]
    fn test_is_null() {
        let constraint = Constraint::is_null("Name");
        assert!(constraint.evaluate(Some(&json!({"Name": null}))).passed);
        assert!(!constraint.evaluate(Some(&json!({"Name": "Rex"}))).passed);
        assert!(!constraint.evaluate(Some(&json!({}))).passed);
    }

    #[test]
    fn test_length_between_missing_as_zero() {
        let doc = json!({"Other": "x"});
        let zero_min = Constraint::length(
            "Name",
            LengthConstraint::new(LengthKind::Between { minimum: 0, maximum: 8 })
                .treat_missing_as_zero(true),
        );
        assert!(zero_min.evaluate(Some(&doc)).passed);

        let five_min = Constraint::length(
            "Name",
            LengthConstraint::new(LengthKind::Between { minimum: 5, maximum: 8 })
                .treat_missing_as_zero(true),
        );
        assert!(!five_min.evaluate(Some(&doc)).passed);
    }

    #[test]
    fn test_state_renders_measurements() {
        let constraint = Constraint::length_between("Name", 5, 8);
        let doc = json!({"Name": "Rex"});
        let evaluated = constraint.check(Some(&doc));
        assert!(!evaluated.outcome.passed);
        assert_eq!(evaluated.outcome.actual_length, Some(3));
        assert_eq!(
            evaluated.state,
            "'Name' length must be between 5 and 8 (actual length: 3)"
        );
    }

    #[test]
    fn test_state_custom_template() {
        let constraint = Constraint::length_between("Name", 5, 8).with_response_template(
            "{Kind} {PropertyName}={PropertyValue} [{MinimumLength}-{MaximumLength}] {ExpectedLength}",
        );
        let evaluated = constraint.check(Some(&json!({"Name": "Rex"})));
        // ExpectedLength does not apply to Between and stays visible
        assert_eq!(evaluated.state, "LengthBetween Name=Rex [5-8] {ExpectedLength}");
    }

    #[test]
    fn test_state_for_missing_property() {
        let constraint = Constraint::is_null("Name");
        let evaluated = constraint.check(Some(&json!({})));
        assert_eq!(evaluated.state, "'Name' must be null (has value: false)");
    }

    #[test]
    fn test_concurrent_evaluation_of_shared_constraint() {
        use std::sync::Arc;
        use std::thread;

        let constraint = Arc::new(Constraint::length_between("Name", 2, 4));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let constraint = Arc::clone(&constraint);
                thread::spawn(move || {
                    let name = "x".repeat(i);
                    let outcome = constraint.evaluate(Some(&json!({ "Name": name })));
                    assert_eq!(outcome.actual_length, Some(i));
                    assert_eq!(outcome.passed, (2..=4).contains(&i));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_evaluate_all_partitions() {
        let constraints = vec![Constraint::is_missing("Id"), Constraint::is_null("Name")];
        let (satisfied, violated) = evaluate_all(&constraints, Some(&json!({"Name": "Rex"})));
        assert_eq!(satisfied.len(), 1);
        assert_eq!(violated.len(), 1);
        assert_eq!(violated[0].constraint.rule, ConstraintRule::IsNull);
    }
}
