//! Length constraints.

use super::ConstraintOutcome;
use serde_json::Value;

/// Comparison applied to a measured length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthKind {
    Equals { expected: usize },
    NotEquals { expected: usize },
    LessThan { expected: usize },
    GreaterThan { expected: usize },
    /// Inclusive on both ends.
    Between { minimum: usize, maximum: usize },
    /// Strictly below `minimum` or strictly above `maximum`.
    OutsideRange { minimum: usize, maximum: usize },
}

impl LengthKind {
    pub fn holds(&self, length: usize) -> bool {
        match *self {
            LengthKind::Equals { expected } => length == expected,
            LengthKind::NotEquals { expected } => length != expected,
            LengthKind::LessThan { expected } => length < expected,
            LengthKind::GreaterThan { expected } => length > expected,
            LengthKind::Between { minimum, maximum } => (minimum..=maximum).contains(&length),
            LengthKind::OutsideRange { minimum, maximum } => length < minimum || length > maximum,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LengthKind::Equals { .. } => "Equals",
            LengthKind::NotEquals { .. } => "NotEquals",
            LengthKind::LessThan { .. } => "LessThan",
            LengthKind::GreaterThan { .. } => "GreaterThan",
            LengthKind::Between { .. } => "Between",
            LengthKind::OutsideRange { .. } => "OutsideRange",
        }
    }

    pub fn description(&self) -> String {
        match *self {
            LengthKind::Equals { expected } => format!("equal to {expected}"),
            LengthKind::NotEquals { expected } => format!("not equal to {expected}"),
            LengthKind::LessThan { expected } => format!("less than {expected}"),
            LengthKind::GreaterThan { expected } => format!("greater than {expected}"),
            LengthKind::Between { minimum, maximum } => {
                format!("between {minimum} and {maximum}")
            }
            LengthKind::OutsideRange { minimum, maximum } => {
                format!("less than {minimum} or greater than {maximum}")
            }
        }
    }

    pub fn expected(&self) -> Option<usize> {
        match *self {
            LengthKind::Equals { expected }
            | LengthKind::NotEquals { expected }
            | LengthKind::LessThan { expected }
            | LengthKind::GreaterThan { expected } => Some(expected),
            LengthKind::Between { .. } | LengthKind::OutsideRange { .. } => None,
        }
    }

    pub fn minimum(&self) -> Option<usize> {
        match *self {
            LengthKind::Between { minimum, .. } | LengthKind::OutsideRange { minimum, .. } => {
                Some(minimum)
            }
            _ => None,
        }
    }

    pub fn maximum(&self) -> Option<usize> {
        match *self {
            LengthKind::Between { maximum, .. } | LengthKind::OutsideRange { maximum, .. } => {
                Some(maximum)
            }
            _ => None,
        }
    }
}

/// A length comparison plus the treatment of absent and null properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthConstraint {
    pub kind: LengthKind,
    pub treat_missing_as_zero: bool,
    pub treat_null_as_zero: bool,
}

impl LengthConstraint {
    pub fn new(kind: LengthKind) -> Self {
        Self {
            kind,
            treat_missing_as_zero: false,
            treat_null_as_zero: false,
        }
    }

    pub fn treat_missing_as_zero(mut self, enabled: bool) -> Self {
        self.treat_missing_as_zero = enabled;
        self
    }

    pub fn treat_null_as_zero(mut self, enabled: bool) -> Self {
        self.treat_null_as_zero = enabled;
        self
    }

    /// Evaluate against the property value (`None` when the property is absent).
    ///
    /// Without the matching zero flag an absent or null property only
    /// satisfies `NotEquals`.
    pub fn evaluate(&self, value: Option<&Value>) -> ConstraintOutcome {
        let measured = match value {
            None => self.treat_missing_as_zero.then_some(0),
            Some(Value::Null) => self.treat_null_as_zero.then_some(0),
            Some(v) => Some(measure(v)),
        };

        match measured {
            Some(length) => ConstraintOutcome {
                passed: self.kind.holds(length),
                actual_length: Some(length),
            },
            None => ConstraintOutcome {
                passed: matches!(self.kind, LengthKind::NotEquals { .. }),
                actual_length: None,
            },
        }
    }
}

/// Length of a JSON value: characters for strings, elements for arrays and
/// characters of the JSON text for anything else.
pub fn measure(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        other => other.to_string().chars().count(),
    }
}
