//! Integration tests for the simulator listeners.
//!
//! Both servers run in-process on ephemeral ports and are driven over HTTP.

use assert_json_diff::assert_json_include;
use reqwest::{Client, StatusCode};
use rift_simulator::{ControlServer, DataServer, SimulationEngine};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

struct Harness {
    client: Client,
    control: String,
    data: String,
}

impl Harness {
    async fn start() -> Self {
        let engine = Arc::new(SimulationEngine::new());
        let any_port: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let control = ControlServer::bind(any_port, Arc::clone(&engine)).await.unwrap();
        let data = DataServer::bind(any_port, Arc::clone(&engine)).await.unwrap();
        let control_url = format!("http://{}", control.local_addr().unwrap());
        let data_url = format!("http://{}", data.local_addr().unwrap());

        tokio::spawn(control.run());
        tokio::spawn(data.run());

        Self {
            client: Client::new(),
            control: control_url,
            data: data_url,
        }
    }

    async fn register(&self, simulations: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/simulations", self.control))
            .json(&simulations)
            .send()
            .await
            .expect("Failed to register simulations")
    }
}

fn pet_simulations() -> Value {
    json!([
        {
            "name": "AddPet",
            "condition": {
                "method": "POST",
                "pattern": "/Pet",
                "keyProperty": "Kind",
                "persistence": "notExists",
                "constraints": [
                    {"type": "lengthBetween", "propertyName": "Kind", "minimumLength": 1, "maximumLength": 10}
                ]
            },
            "response": {
                "statusCode": 201,
                "headers": {"Location": "/Pet/{Kind}"},
                "addToStore": true
            }
        },
        {
            "name": "RejectPet",
            "condition": {
                "method": "POST",
                "pattern": "/Pet",
                "matchOnViolations": true,
                "constraints": [
                    {"type": "lengthBetween", "propertyName": "Kind", "minimumLength": 1, "maximumLength": 10}
                ]
            },
            "response": {
                "statusCode": 422,
                "body": "{Constraints:Violated}"
            }
        },
        {
            "name": "GetPet",
            "condition": {
                "method": "GET",
                "pattern": "/Pet/{Kind}",
                "keyProperty": "Kind",
                "persistence": "exists"
            }
        },
        {
            "name": "ListPets",
            "condition": {"method": "GET", "pattern": "/Pet"}
        }
    ])
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::start().await;
    let response = harness
        .client
        .get(format!("{}/health", harness.control))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_register_and_match_end_to_end() {
    let harness = Harness::start().await;

    let response = harness.register(pet_simulations()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = harness
        .client
        .post(format!("{}/Pet", harness.data))
        .json(&json!({"Kind": "Dog", "Age": 3}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(created.headers()["location"], "/Pet/Dog");

    let fetched = harness
        .client
        .get(format!("{}/Pet/Dog", harness.data))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let body: Value = fetched.json().await.unwrap();
    assert_eq!(body, json!({"Kind": "Dog", "Age": 3}));

    // Duplicate identity: AddPet no longer matches and the catch-all answers
    let duplicate = harness
        .client
        .post(format!("{}/Pet", harness.data))
        .json(&json!({"Kind": "Dog"}))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let violations: Value = duplicate.json().await.unwrap();
    assert_eq!(violations, json!([]));

    let listing: Value = harness
        .client
        .get(format!("{}/Pet", harness.data))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing, json!([{"Kind": "Dog", "Age": 3}]));

    let unknown = harness
        .client
        .get(format!("{}/Owner", harness.data))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    let error: Value = unknown.json().await.unwrap();
    assert_json_include!(actual: error, expected: json!({"errors": [{"code": "404"}]}));
}

#[tokio::test]
async fn test_constraint_violation_response() {
    let harness = Harness::start().await;
    harness.register(pet_simulations()).await;

    let response = harness
        .client
        .post(format!("{}/Pet", harness.data))
        .json(&json!({"Kind": "Tyrannosaurus"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let violations: Value = response.json().await.unwrap();
    assert_eq!(
        violations,
        json!(["'Kind' length must be between 1 and 10 (actual length: 13)"])
    );
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let harness = Harness::start().await;
    harness
        .register(json!({
            "name": "Store",
            "condition": {"method": "PUT", "pattern": "/Doc/{Id}", "keyProperty": "Id"},
            "response": {"addToStore": true}
        }))
        .await;

    let response = harness
        .client
        .put(format!("{}/Doc/1", harness.data))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let store = harness
        .client
        .get(format!("{}/store?path=/Doc", harness.control))
        .send()
        .await
        .unwrap();
    assert_eq!(store.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let harness = Harness::start().await;
    let sim = json!({"name": "Ping", "condition": {"method": "GET", "pattern": "/ping"}});

    assert_eq!(harness.register(sim.clone()).await.status(), StatusCode::CREATED);
    let response = harness.register(sim).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([{"name": "Ping", "registered": false}]));
}

#[tokio::test]
async fn test_store_api_and_purge() {
    let harness = Harness::start().await;
    harness.register(pet_simulations()).await;

    let added = harness
        .client
        .post(format!("{}/store?path=/Pet&keyProperty=Kind", harness.control))
        .json(&json!({"Kind": "Cat"}))
        .send()
        .await
        .unwrap();
    assert_eq!(added.status(), StatusCode::CREATED);

    let fetched = harness
        .client
        .get(format!("{}/Pet/Cat", harness.data))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);

    let purged = harness
        .client
        .delete(format!(
            "{}/simulations/AddPet?purgeData=true&retainSimulation=true",
            harness.control
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(purged.status(), StatusCode::OK);

    let after = harness
        .client
        .get(format!("{}/store?path=/Pet&keyProperty=Kind&value=Cat", harness.control))
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::NOT_FOUND);

    let simulations: Value = harness
        .client
        .get(format!("{}/simulations", harness.control))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(simulations.as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_discriminated_tenants() {
    let harness = Harness::start().await;
    harness
        .register(json!([
            {
                "name": "AddPet",
                "condition": {
                    "method": "POST", "pattern": "/Pet", "keyProperty": "Kind",
                    "discriminatorHeader": "X-Tenant"
                },
                "response": {"statusCode": 201, "addToStore": true}
            },
            {
                "name": "GetPet",
                "condition": {
                    "method": "GET", "pattern": "/Pet/{Kind}", "keyProperty": "Kind",
                    "persistence": "exists", "discriminatorHeader": "X-Tenant"
                }
            }
        ]))
        .await;

    let created = harness
        .client
        .post(format!("{}/Pet", harness.data))
        .header("X-Tenant", "acme")
        .json(&json!({"Kind": "Dog"}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let get = |tenant: &'static str| {
        harness
            .client
            .get(format!("{}/Pet/Dog", harness.data))
            .header("X-Tenant", tenant)
            .send()
    };
    assert_eq!(get("acme").await.unwrap().status(), StatusCode::OK);
    assert_eq!(get("globex").await.unwrap().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_convert_endpoints() {
    let harness = Harness::start().await;

    let json: Value = harness
        .client
        .post(format!("{}/convert/toJson", harness.control))
        .body("A=B&C=d")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json, json!({"A": "B", "C": "d"}));

    let text = harness
        .client
        .post(format!("{}/convert/toBodyParams?urlEncode=true", harness.control))
        .body(r#"{"Path":"a/b","Flag":null}"#)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(text, "Path=a%2fb&Flag");
}
