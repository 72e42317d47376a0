//! Simulation rule definitions.
//!
//! A simulation pairs a request [`Condition`] with a [`SimulationResponse`].
//! The serialized form is used by the control API and by configuration files:
//!
//! ```json
//! {
//!   "name": "AddDog",
//!   "condition": {
//!     "method": "POST", "pattern": "/Pet", "content": "json",
//!     "persistence": "notExists", "keyProperty": "Kind", "repeat": 1,
//!     "constraints": [{"type": "isMissing", "propertyName": "Id"}]
//!   },
//!   "response": {"statusCode": 201, "headers": {"Location": "/Pet/{Kind}"}, "addToStore": true}
//! }
//! ```

use crate::constraint::Constraint;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;

/// How the request body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    #[default]
    Json,
    /// `application/x-www-form-urlencoded` pairs, converted to a JSON object.
    #[serde(alias = "form")]
    BodyParameters,
    Binary,
    Text,
}

/// Store state a request must find for the rule to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Persistence {
    #[default]
    None,
    Exists,
    NotExists,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub method: String,
    pub pattern: String,
    #[serde(default)]
    pub content: ContentKind,
    #[serde(default)]
    pub persistence: Persistence,
    /// Identity property used for upsert and lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_property: Option<String>,
    /// Request header whose value selects the store partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_header: Option<String>,
    /// Remaining matches; `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub match_on_violations: bool,
    /// Required query parameters. A value of `*` only requires presence.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub query: HashMap<String, String>,
    /// Required headers (names compare case-insensitively).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl Condition {
    pub fn new(method: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            pattern: pattern.into(),
            content: ContentKind::default(),
            persistence: Persistence::default(),
            key_property: None,
            discriminator_header: None,
            repeat: None,
            constraints: Vec::new(),
            match_on_violations: false,
            query: HashMap::new(),
            headers: HashMap::new(),
        }
    }
}

fn default_status_code() -> u16 {
    200
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    /// Header value templates.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Body template: a string, or any JSON value rendered as its JSON text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub add_to_store: bool,
    #[serde(default)]
    pub remove_from_store: bool,
    /// Properties set on the stored document; string values are templates.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub overrides: Map<String, Value>,
}

impl Default for SimulationResponse {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: HashMap::new(),
            body: None,
            add_to_store: false,
            remove_from_store: false,
            overrides: Map::new(),
        }
    }
}

impl SimulationResponse {
    pub fn body_template(&self) -> Option<Cow<'_, str>> {
        match self.body.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s)),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

/// A registered rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    pub name: String,
    pub condition: Condition,
    #[serde(default)]
    pub response: SimulationResponse,
}

impl Simulation {
    pub fn new(name: impl Into<String>, method: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: Condition::new(method, pattern),
            response: SimulationResponse::default(),
        }
    }

    /// A rule whose repeat count has run out never matches.
    pub fn is_expired(&self) -> bool {
        self.condition.repeat == Some(0)
    }

    pub fn content(mut self, content: ContentKind) -> Self {
        self.condition.content = content;
        self
    }

    pub fn persistence(mut self, persistence: Persistence) -> Self {
        self.condition.persistence = persistence;
        self
    }

    pub fn key_property(mut self, key: impl Into<String>) -> Self {
        self.condition.key_property = Some(key.into());
        self
    }

    pub fn discriminator_header(mut self, header: impl Into<String>) -> Self {
        self.condition.discriminator_header = Some(header.into());
        self
    }

    pub fn repeat(mut self, count: u32) -> Self {
        self.condition.repeat = Some(count);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.condition.constraints.push(constraint);
        self
    }

    pub fn match_on_violations(mut self) -> Self {
        self.condition.match_on_violations = true;
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.condition.query.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.condition.headers.insert(name.into(), value.into());
        self
    }

    pub fn status(mut self, status_code: u16) -> Self {
        self.response.status_code = status_code;
        self
    }

    pub fn body(mut self, template: impl Into<String>) -> Self {
        self.response.body = Some(Value::String(template.into()));
        self
    }

    pub fn response_header(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.response.headers.insert(name.into(), template.into());
        self
    }

    pub fn add_to_store(mut self) -> Self {
        self.response.add_to_store = true;
        self
    }

    pub fn remove_from_store(mut self) -> Self {
        self.response.remove_from_store = true;
        self
    }

    pub fn override_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.response.overrides.insert(name.into(), value);
        self
    }
}
