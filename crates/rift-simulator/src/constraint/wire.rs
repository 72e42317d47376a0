//! Serialized form of constraints.
//!
//! Constraints travel as flat JSON objects:
//!
//! ```json
//! {"type": "lengthBetween", "propertyName": "Name", "minimumLength": 5,
//!  "maximumLength": 8, "treatMissingAsZero": true}
//! ```

use super::{Constraint, ConstraintRule, LengthConstraint, LengthKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Unknown constraint type: {0}")]
    UnknownType(String),
    #[error("Constraint '{kind}' requires '{parameter}'")]
    MissingParameter {
        kind: String,
        parameter: &'static str,
    },
    #[error("Constraint '{kind}' has minimumLength {minimum} greater than maximumLength {maximum}")]
    InvalidRange {
        kind: String,
        minimum: usize,
        maximum: usize,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConstraint {
    #[serde(rename = "type")]
    pub constraint_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_length: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub treat_missing_as_zero: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub treat_null_as_zero: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_template: Option<String>,
}

impl RawConstraint {
    fn required(&self, value: Option<usize>, parameter: &'static str) -> Result<usize, ConstraintError> {
        value.ok_or_else(|| ConstraintError::MissingParameter {
            kind: self.constraint_type.clone(),
            parameter,
        })
    }

    fn expected(&self) -> Result<usize, ConstraintError> {
        self.required(self.expected_length, "expectedLength")
    }

    fn range(&self) -> Result<(usize, usize), ConstraintError> {
        let minimum = self.required(self.minimum_length, "minimumLength")?;
        let maximum = self.required(self.maximum_length, "maximumLength")?;
        if minimum > maximum {
            return Err(ConstraintError::InvalidRange {
                kind: self.constraint_type.clone(),
                minimum,
                maximum,
            });
        }
        Ok((minimum, maximum))
    }
}

impl TryFrom<RawConstraint> for Constraint {
    type Error = ConstraintError;

    fn try_from(raw: RawConstraint) -> Result<Self, Self::Error> {
        let rule = match raw.constraint_type.to_lowercase().as_str() {
            "isnull" => Ok(ConstraintRule::IsNull),
            "ismissing" => Ok(ConstraintRule::IsMissing),
            "isempty" => Ok(ConstraintRule::IsEmpty),
            "lengthequals" => raw
                .expected()
                .map(|expected| LengthKind::Equals { expected })
                .map(length_rule(&raw)),
            "lengthnotequals" => raw
                .expected()
                .map(|expected| LengthKind::NotEquals { expected })
                .map(length_rule(&raw)),
            "lengthlessthan" => raw
                .expected()
                .map(|expected| LengthKind::LessThan { expected })
                .map(length_rule(&raw)),
            "lengthgreaterthan" => raw
                .expected()
                .map(|expected| LengthKind::GreaterThan { expected })
                .map(length_rule(&raw)),
            "lengthbetween" => raw
                .range()
                .map(|(minimum, maximum)| LengthKind::Between { minimum, maximum })
                .map(length_rule(&raw)),
            "lengthoutsiderange" => raw
                .range()
                .map(|(minimum, maximum)| LengthKind::OutsideRange { minimum, maximum })
                .map(length_rule(&raw)),
            _ => Err(ConstraintError::UnknownType(raw.constraint_type.clone())),
        };

        Ok(Constraint {
            rule: rule?,
            property_name: raw.property_name,
            response_template: raw.response_template,
        })
    }
}

fn length_rule(raw: &RawConstraint) -> impl Fn(LengthKind) -> ConstraintRule {
    let treat_missing_as_zero = raw.treat_missing_as_zero;
    let treat_null_as_zero = raw.treat_null_as_zero;
    move |kind| {
        ConstraintRule::Length(LengthConstraint {
            kind,
            treat_missing_as_zero,
            treat_null_as_zero,
        })
    }
}

impl From<Constraint> for RawConstraint {
    fn from(constraint: Constraint) -> Self {
        let mut raw = RawConstraint {
            property_name: constraint.property_name,
            response_template: constraint.response_template,
            ..Default::default()
        };

        raw.constraint_type = match constraint.rule {
            ConstraintRule::IsNull => "isNull".to_string(),
            ConstraintRule::IsMissing => "isMissing".to_string(),
            ConstraintRule::IsEmpty => "isEmpty".to_string(),
            ConstraintRule::Length(length) => {
                raw.treat_missing_as_zero = length.treat_missing_as_zero;
                raw.treat_null_as_zero = length.treat_null_as_zero;
                raw.expected_length = length.kind.expected();
                raw.minimum_length = length.kind.minimum();
                raw.maximum_length = length.kind.maximum();
                format!("length{}", length.kind.name())
            }
        };
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_length_between() {
        let constraint: Constraint = serde_json::from_value(json!({
            "type": "lengthBetween",
            "propertyName": "Name",
            "minimumLength": 5,
            "maximumLength": 8,
            "treatMissingAsZero": true
        }))
        .unwrap();

        assert_eq!(constraint.property_name(), Some("Name"));
        assert_eq!(
            constraint.rule,
            ConstraintRule::Length(LengthConstraint {
                kind: LengthKind::Between { minimum: 5, maximum: 8 },
                treat_missing_as_zero: true,
                treat_null_as_zero: false,
            })
        );
    }

    #[test]
    fn test_deserialize_type_case_insensitive() {
        let constraint: Constraint =
            serde_json::from_value(json!({"type": "IsNull", "propertyName": "Name"})).unwrap();
        assert_eq!(constraint.rule, ConstraintRule::IsNull);
    }

    #[test]
    fn test_deserialize_rejects_unknown_type() {
        let result: Result<Constraint, _> =
            serde_json::from_value(json!({"type": "isShiny", "propertyName": "Name"}));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Unknown constraint type"));
    }

    #[test]
    fn test_deserialize_rejects_missing_parameter() {
        let result: Result<Constraint, _> =
            serde_json::from_value(json!({"type": "lengthEquals", "propertyName": "Name"}));
        assert!(result.unwrap_err().to_string().contains("expectedLength"));

        let result: Result<Constraint, _> = serde_json::from_value(json!({
            "type": "lengthOutsideRange", "propertyName": "Name",
            "minimumLength": 9, "maximumLength": 2
        }));
        assert!(result.unwrap_err().to_string().contains("greater than"));
    }

    #[test]
    fn test_serialize_shape() {
        let constraint = Constraint::length(
            "Name",
            LengthConstraint::new(LengthKind::LessThan { expected: 4 }).treat_null_as_zero(true),
        );
        let value = serde_json::to_value(&constraint).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "lengthLessThan",
                "propertyName": "Name",
                "expectedLength": 4,
                "treatNullAsZero": true
            })
        );
    }
}
