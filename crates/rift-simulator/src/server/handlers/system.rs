//! System handlers: health and format conversion.

use crate::server::types::*;
use crate::simulation::SimulationEngine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::warn;

/// GET /health - Health check
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}

/// POST /convert/toJson - body parameters to a JSON object
pub fn handle_to_json(body: &Bytes) -> Response<Full<Bytes>> {
    let text = String::from_utf8_lossy(body);
    json_response(StatusCode::OK, &SimulationEngine::body_params_to_json(&text))
}

/// POST /convert/toBodyParams - JSON object to body parameters
pub fn handle_to_body_params(body: &Bytes, query: Option<&str>) -> Response<Full<Bytes>> {
    let params = crate::simulation::parse_query_string(query);
    let url_encode = flag(&params, "urlEncode");
    let text = String::from_utf8_lossy(body);

    match SimulationEngine::json_to_body_params(&text, url_encode) {
        Ok(encoded) => build_response_with_headers(
            StatusCode::OK,
            [("Content-Type", "application/x-www-form-urlencoded")],
            encoded,
        ),
        Err(e) => {
            warn!("Body parameter conversion rejected: {}", e);
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_health() {
        let resp = handle_health();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_handle_to_json() {
        let resp = handle_to_json(&Bytes::from("A=B&C=d"));
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_handle_to_body_params_rejects_invalid_json() {
        let resp = handle_to_body_params(&Bytes::from("{oops"), Some("urlEncode=true"));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = handle_to_body_params(&Bytes::from(r#"{"A":"B"}"#), None);
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
