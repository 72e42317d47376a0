//! Data listener: every request is matched against the registered
//! simulations and answered with the rendered response.

use crate::server::types::{build_response_with_headers, collect_body, error_response};
use crate::simulation::{render, RequestDescriptor, SimulationEngine};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

pub async fn handle_data_request(
    req: Request<Incoming>,
    engine: Arc<SimulationEngine>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let mut request = RequestDescriptor::new(req.method().as_str(), req.uri().path())
        .with_query(req.uri().query());
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e)),
    };

    Ok(respond(&engine, &request.with_body(body)))
}

/// Match `request`, apply its effects and build the HTTP response.
pub fn respond(engine: &SimulationEngine, request: &RequestDescriptor) -> Response<Full<Bytes>> {
    match engine.match_request(request, true) {
        Ok(Some(result)) => {
            let rendered = render(&result);
            let status = StatusCode::from_u16(rendered.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            debug!(
                "{} {} -> {} ({})",
                request.method(),
                request.path(),
                status,
                result.simulation.name
            );
            build_response_with_headers(status, rendered.headers, rendered.body)
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &format!("No simulation matched {} {}", request.method(), request.path()),
        ),
        Err(e) => {
            warn!("Rejected {} {}: {}", request.method(), request.path(), e);
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}
