//! Route dispatch logic for the control API.

use crate::server::handlers::{simulations, store, system};
use crate::server::types::{collect_body, error_response, not_found};
use crate::simulation::SimulationEngine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    engine: Arc<SimulationEngine>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());

    debug!("Control API: {} {}", method, path);

    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e)),
    };

    Ok(route_by_path(&method, &path, query.as_deref(), &body, &engine))
}

/// Route based on method and path, with the body already collected.
pub fn route_by_path(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &Bytes,
    engine: &SimulationEngine,
) -> Response<Full<Bytes>> {
    match (method, path.trim_end_matches('/')) {
        (&Method::GET, "/health") => system::handle_health(),
        (&Method::POST, "/convert/toJson") => system::handle_to_json(body),
        (&Method::POST, "/convert/toBodyParams") => system::handle_to_body_params(body, query),

        (&Method::GET, "/simulations") => simulations::handle_list(engine),
        (&Method::POST, "/simulations") => simulations::handle_register(body, engine),
        (&Method::DELETE, "/simulations") => simulations::handle_delete("*", query, engine),

        (&Method::GET, "/store") => store::handle_get(query, engine),
        (&Method::POST, "/store") => store::handle_add(query, body, engine),
        (&Method::DELETE, "/store") => store::handle_delete(query, engine),

        (method, other) => match other.strip_prefix("/simulations/").map(decode_name) {
            Some(name) if !name.is_empty() && !name.contains('/') => match *method {
                Method::GET => simulations::handle_get(&name, engine),
                Method::DELETE => simulations::handle_delete(&name, query, engine),
                _ => not_found(),
            },
            _ => not_found(),
        },
    }
}

fn decode_name(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn body_json(resp: Response<Full<Bytes>>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn call(engine: &SimulationEngine, method: Method, path: &str, query: Option<&str>, body: &str) -> Response<Full<Bytes>> {
        route_by_path(&method, path, query, &Bytes::from(body.to_string()), engine)
    }

    #[test]
    fn test_unknown_routes() {
        let engine = SimulationEngine::new();
        assert_eq!(call(&engine, Method::GET, "/nope", None, "").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            call(&engine, Method::PUT, "/simulations/A", None, "").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            call(&engine, Method::GET, "/simulations/a/b", None, "").status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_simulation_lifecycle() {
        let engine = SimulationEngine::new();
        let sim = r#"{"name":"Get Pet","condition":{"method":"GET","pattern":"/Pet/{Kind}"}}"#;

        let resp = call(&engine, Method::POST, "/simulations", None, sim);
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(resp).await, json!([{"name": "Get Pet", "registered": true}]));

        let resp = call(&engine, Method::GET, "/simulations/Get%20Pet", None, "");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["condition"]["pattern"], json!("/Pet/{Kind}"));

        let resp = call(&engine, Method::GET, "/simulations/", None, "");
        assert_eq!(body_json(resp).await.as_array().map(Vec::len), Some(1));

        let resp = call(&engine, Method::DELETE, "/simulations", Some("purgeData=true"), "");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(engine.simulations().is_empty());
    }

    #[tokio::test]
    async fn test_convert_routes() {
        let engine = SimulationEngine::new();
        let resp = call(&engine, Method::POST, "/convert/toJson", None, "A=B&C=d");
        assert_eq!(body_json(resp).await, json!({"A": "B", "C": "d"}));

        let resp = call(
            &engine,
            Method::POST,
            "/convert/toBodyParams",
            Some("urlEncode=true"),
            r#"{"Path":"a/b"}"#,
        );
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Path=a%2fb");
    }
}
