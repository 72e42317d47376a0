//! Turn a [`MatchResult`] into status, headers and body.

use super::body_params;
use super::engine::MatchResult;
use super::types::ContentKind;
use crate::template;
use bytes::Bytes;
use serde_json::Value;

const CONTENT_TYPE: &str = "Content-Type";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RenderedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Render the matched rule's response.
///
/// A body template is rendered with the match variables. Without one the body
/// is the record (its binary payload if it has one), else the listing as a
/// JSON array, else empty. A default content type is added for JSON, form and
/// binary bodies unless the rule declares one.
pub fn render(result: &MatchResult) -> RenderedResponse {
    let response = &result.simulation.response;
    let content = result.simulation.condition.content;
    let vars = &result.variables;

    let mut headers: Vec<(String, String)> = response
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), template::substitute(value, vars)))
        .collect();

    let (body, content_type) = match response.body_template() {
        Some(body) => {
            let rendered = template::substitute(&body, vars);
            let content_type = looks_like_json(&rendered).then_some("application/json");
            (Bytes::from(rendered), content_type)
        }
        None => default_body(result, content),
    };

    if let Some(content_type) = content_type {
        if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE)) {
            headers.push((CONTENT_TYPE.to_string(), content_type.to_string()));
        }
    }

    RenderedResponse {
        status: response.status_code,
        headers,
        body,
    }
}

fn default_body(result: &MatchResult, content: ContentKind) -> (Bytes, Option<&'static str>) {
    if let Some(record) = &result.record {
        if let Some(binary) = record.binary() {
            let content_type = match content {
                ContentKind::Text => "text/plain; charset=utf-8",
                _ => "application/octet-stream",
            };
            return (binary.clone(), Some(content_type));
        }
        if content == ContentKind::BodyParameters {
            return (
                Bytes::from(body_params::json_to_body_params(record.document(), true)),
                Some("application/x-www-form-urlencoded"),
            );
        }
        return (Bytes::from(record.json().to_string()), Some("application/json"));
    }

    match &result.listing {
        Some(listing) => {
            let documents = listing.iter().map(|entry| entry.document().clone()).collect();
            (
                Bytes::from(Value::Array(documents).to_string()),
                Some("application/json"),
            )
        }
        None => (Bytes::new(), None),
    }
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<Value>(text).is_ok()
}
