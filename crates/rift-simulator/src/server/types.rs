//! Response helpers and request parameter types shared by both listeners.

use crate::simulation::parse_query_string;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Outcome of registering one simulation
#[derive(Debug, Serialize)]
pub struct RegistrationResult {
    pub name: String,
    pub registered: bool,
}

/// Query parameters for `DELETE /simulations[/{name}]`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeleteParams {
    pub purge_data: bool,
    pub retain_simulation: bool,
}

impl DeleteParams {
    pub fn parse(query: Option<&str>) -> Self {
        let params = parse_query_string(query);
        Self {
            purge_data: flag(&params, "purgeData"),
            retain_simulation: flag(&params, "retainSimulation"),
        }
    }
}

/// Query parameters addressing the store
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StoreParams {
    pub path: Option<String>,
    pub pattern: Option<String>,
    pub key_property: Option<String>,
    pub value: Option<String>,
    pub discriminator: Option<String>,
    /// `json` (default), `text` or `binary`; only read by GET.
    pub format: Option<String>,
}

impl StoreParams {
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (name, value) in parse_query_string(query) {
            let slot = match name.as_str() {
                "path" => &mut params.path,
                "pattern" => &mut params.pattern,
                "keyProperty" => &mut params.key_property,
                "value" => &mut params.value,
                "discriminator" => &mut params.discriminator,
                "format" => &mut params.format,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }

    /// The pattern to resolve `path` against; the path itself when omitted.
    pub fn pattern_or_path(&self) -> Option<&str> {
        self.pattern.as_deref().or(self.path.as_deref())
    }
}

/// A flag is set by `name=true` or by a bare `name`.
pub fn flag(params: &[(String, String)], name: &str) -> bool {
    params
        .iter()
        .any(|(key, value)| key == name && (value.is_empty() || value.eq_ignore_ascii_case("true")))
}

// =============================================================================
// Response helper functions
// =============================================================================

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Build an HTTP response with headers.
///
/// Falls back to a bare 500 response if the builder rejects a header.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

/// Create a not found response
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}
