//! Simulation registry handlers.

use crate::server::types::*;
use crate::simulation::{Simulation, SimulationEngine};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

/// Request body for POST /simulations: one simulation or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegistrationRequest {
    Batch(Vec<Simulation>),
    Single(Box<Simulation>),
}

/// GET /simulations - List registered simulations in match order
pub fn handle_list(engine: &SimulationEngine) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &engine.simulations())
}

/// POST /simulations - Register one or more simulations
///
/// Every item is attempted; the response is 201 when all were registered and
/// 409 when any name was already taken.
pub fn handle_register(body: &Bytes, engine: &SimulationEngine) -> Response<Full<Bytes>> {
    let request: RegistrationRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid simulation JSON: {e}"),
            )
        }
    };

    let simulations = match request {
        RegistrationRequest::Batch(batch) => batch,
        RegistrationRequest::Single(single) => vec![*single],
    };

    let results: Vec<RegistrationResult> = simulations
        .into_iter()
        .map(|simulation| {
            let name = simulation.name.clone();
            let registered = engine.register(simulation);
            RegistrationResult { name, registered }
        })
        .collect();

    let status = if results.iter().all(|r| r.registered) {
        StatusCode::CREATED
    } else {
        warn!(
            "{} of {} simulation(s) rejected as duplicates",
            results.iter().filter(|r| !r.registered).count(),
            results.len()
        );
        StatusCode::CONFLICT
    };
    json_response(status, &results)
}

/// GET /simulations/{name}
pub fn handle_get(name: &str, engine: &SimulationEngine) -> Response<Full<Bytes>> {
    match engine.simulation(name) {
        Some(simulation) => json_response(StatusCode::OK, &simulation),
        None => error_response(
            StatusCode::NOT_FOUND,
            &format!("Simulation '{name}' not found"),
        ),
    }
}

/// DELETE /simulations/{name} and DELETE /simulations (all)
pub fn handle_delete(name: &str, query: Option<&str>, engine: &SimulationEngine) -> Response<Full<Bytes>> {
    let params = DeleteParams::parse(query);
    if engine.delete(name, params.purge_data, params.retain_simulation) {
        info!("Deleted simulation '{}' via control API", name);
        json_response(
            StatusCode::OK,
            &serde_json::json!({
                "name": name,
                "deleted": !params.retain_simulation,
                "purgedData": params.purge_data
            }),
        )
    } else {
        error_response(
            StatusCode::NOT_FOUND,
            &format!("Simulation '{name}' not found"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> Bytes {
        Bytes::from(json.to_string())
    }

    #[test]
    fn test_register_single_and_batch() {
        let engine = SimulationEngine::new();
        let single = r#"{"name":"A","condition":{"method":"GET","pattern":"/a"}}"#;
        assert_eq!(handle_register(&body(single), &engine).status(), StatusCode::CREATED);

        let batch = r#"[
            {"name":"B","condition":{"method":"GET","pattern":"/b"}},
            {"name":"a","condition":{"method":"GET","pattern":"/a2"}}
        ]"#;
        assert_eq!(handle_register(&body(batch), &engine).status(), StatusCode::CONFLICT);
        // The non-conflicting item is still registered
        assert_eq!(engine.simulations().len(), 2);
    }

    #[test]
    fn test_register_rejects_invalid_json() {
        let engine = SimulationEngine::new();
        let resp = handle_register(&body(r#"{"name":"A"}"#), &engine);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_get_and_delete() {
        let engine = SimulationEngine::new();
        engine.register(Simulation::new("A", "GET", "/a"));

        assert_eq!(handle_get("a", &engine).status(), StatusCode::OK);
        assert_eq!(handle_get("missing", &engine).status(), StatusCode::NOT_FOUND);

        assert_eq!(
            handle_delete("A", Some("retainSimulation=true"), &engine).status(),
            StatusCode::OK
        );
        assert_eq!(engine.simulations().len(), 1);
        assert_eq!(handle_delete("A", None, &engine).status(), StatusCode::OK);
        assert_eq!(handle_delete("A", None, &engine).status(), StatusCode::NOT_FOUND);
        assert_eq!(handle_list(&engine).status(), StatusCode::OK);
    }
}
