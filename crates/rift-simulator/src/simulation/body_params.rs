//! Conversion between form-encoded body parameters and JSON objects.
//!
//! `A=B&C=d` converts to `{"A":"B","C":"d"}`. A bare name with no `=` maps to
//! JSON null, and a null property converts back to a bare name. Values are
//! URL-decoded on the way in and optionally URL-encoded (lowercase hex) on the
//! way out, so the two functions round-trip.

use serde_json::{Map, Value};
use std::borrow::Cow;

/// Convert `name=value&...` text into a JSON object.
pub fn body_params_to_json(text: &str) -> Value {
    let mut object = Map::new();
    for pair in text.split('&').filter(|pair| !pair.trim().is_empty()) {
        match pair.split_once('=') {
            Some((name, value)) => {
                object.insert(decode(name), Value::String(decode(value)));
            }
            None => {
                object.insert(decode(pair), Value::Null);
            }
        }
    }
    Value::Object(object)
}

/// Convert a JSON object into `name=value&...` text.
///
/// Non-string scalars use their JSON text; a non-object document yields an
/// empty string.
pub fn json_to_body_params(json: &Value, url_encode: bool) -> String {
    let Some(object) = json.as_object() else {
        return String::new();
    };

    let encode_part = |s: &str| -> String {
        if url_encode {
            encode(s)
        } else {
            s.to_string()
        }
    };

    object
        .iter()
        .map(|(name, value)| match value {
            Value::Null => encode_part(name),
            Value::String(s) => format!("{}={}", encode_part(name), encode_part(s)),
            other => format!("{}={}", encode_part(name), encode_part(&other.to_string())),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode one form or query component: `+` is a space, invalid UTF-8 after
/// percent-decoding is replaced rather than rejected.
pub(crate) fn decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned(),
    }
}

/// Percent-encode with lowercase hex digits (`/` becomes `%2f`).
fn encode(s: &str) -> String {
    let encoded: Cow<'_, str> = urlencoding::encode(s);
    let mut out = String::with_capacity(encoded.len());
    let mut hex_digits = 0;
    for c in encoded.chars() {
        if c == '%' {
            hex_digits = 2;
            out.push(c);
        } else if hex_digits > 0 {
            hex_digits -= 1;
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
