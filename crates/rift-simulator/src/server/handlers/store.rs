//! Store handlers: direct reads and writes of the resource store.

use crate::server::types::*;
use crate::simulation::SimulationEngine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::{info, warn};

fn missing_path() -> Response<Full<Bytes>> {
    error_response(StatusCode::BAD_REQUEST, "Query parameter 'path' is required")
}

/// GET /store - One entry by identity, or the documents of a resource
pub fn handle_get(query: Option<&str>, engine: &SimulationEngine) -> Response<Full<Bytes>> {
    let params = StoreParams::parse(query);
    let (Some(path), Some(pattern)) = (params.path.as_deref(), params.pattern_or_path()) else {
        return missing_path();
    };
    let discriminator = params.discriminator.as_deref();

    let Some(key) = params.key_property.as_deref() else {
        return match engine.get_resource(path, pattern, discriminator) {
            Some(documents) => json_response(StatusCode::OK, &documents),
            None => error_response(StatusCode::NOT_FOUND, "Resource not found"),
        };
    };
    let value = params.value.as_deref();

    match params.format.as_deref().unwrap_or("json") {
        "json" => match engine.get_as_json(path, pattern, key, value, discriminator) {
            Some(json) => build_response_with_headers(
                StatusCode::OK,
                [("Content-Type", "application/json")],
                json,
            ),
            None => error_response(StatusCode::NOT_FOUND, "Entry not found"),
        },
        "text" => match engine.get_as_text(path, pattern, key, value, discriminator) {
            Some(text) => build_response_with_headers(
                StatusCode::OK,
                [("Content-Type", "text/plain; charset=utf-8")],
                text,
            ),
            None => error_response(StatusCode::NOT_FOUND, "Entry not found"),
        },
        "binary" => match engine.get_binary(path, pattern, key, value, discriminator) {
            Some(payload) => build_response_with_headers(
                StatusCode::OK,
                [("Content-Type", "application/octet-stream")],
                payload,
            ),
            None => error_response(StatusCode::NOT_FOUND, "No binary payload for entry"),
        },
        other => error_response(
            StatusCode::BAD_REQUEST,
            &format!("Unknown store format '{}'", other),
        ),
    }
}

/// POST /store - Add a JSON document, or with `format=binary` a binary
/// payload whose document is `{keyProperty: value}`
pub fn handle_add(query: Option<&str>, body: &Bytes, engine: &SimulationEngine) -> Response<Full<Bytes>> {
    let params = StoreParams::parse(query);
    let (Some(path), Some(pattern)) = (params.path.as_deref(), params.pattern_or_path()) else {
        return missing_path();
    };

    let (json, binary) = match params.format.as_deref().unwrap_or("json") {
        "json" => match std::str::from_utf8(body) {
            Ok(text) => (text.to_string(), None),
            Err(e) => {
                warn!("Store add rejected: body is not UTF-8: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "Request body must be UTF-8 JSON");
            }
        },
        "binary" => {
            let mut document = serde_json::Map::new();
            if let (Some(key), Some(value)) = (params.key_property.as_deref(), params.value.as_deref()) {
                document.insert(key.to_string(), serde_json::Value::String(value.to_string()));
            }
            (serde_json::Value::Object(document).to_string(), Some(body.clone()))
        }
        other => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Unknown store format '{}'", other),
            )
        }
    };

    match engine.add_to_store(
        path,
        pattern,
        params.key_property.as_deref(),
        &json,
        binary,
        params.discriminator.as_deref(),
    ) {
        Ok(()) => {
            info!("Stored document at {}", path);
            json_response(StatusCode::CREATED, &serde_json::json!({"path": path, "stored": true}))
        }
        Err(e) => {
            warn!("Store add rejected: {}", e);
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

/// DELETE /store - Remove an entry, a resource, or everything when no path
/// is given
pub fn handle_delete(query: Option<&str>, engine: &SimulationEngine) -> Response<Full<Bytes>> {
    let params = StoreParams::parse(query);
    let (Some(path), Some(pattern)) = (params.path.as_deref(), params.pattern_or_path()) else {
        engine.clear_store();
        return json_response(StatusCode::OK, &serde_json::json!({"deleted": true}));
    };

    let deleted = engine.delete_from_store(
        path,
        pattern,
        params.key_property.as_deref(),
        params.value.as_deref(),
        params.discriminator.as_deref(),
    );
    if deleted {
        json_response(StatusCode::OK, &serde_json::json!({"path": path, "deleted": true}))
    } else {
        error_response(StatusCode::NOT_FOUND, "Nothing to delete")
    }
}
