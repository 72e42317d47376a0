//! Simulation rules and the engine that matches requests against them.
//!
//! A request is checked against registered rules in registration order. The
//! first rule whose method, route pattern, query, headers, constraints and
//! persistence policy all pass wins; its store effects are applied and its
//! response is rendered from the collected variables.

mod body_params;
mod engine;
mod render;
mod request;
mod types;


pub use body_params::{body_params_to_json, json_to_body_params};
pub use engine::{EngineError, MatchResult, SimulationEngine};
pub use render::{render, RenderedResponse};
pub use request::{parse_query_string, RequestDescriptor};
pub use types::{Condition, ContentKind, Persistence, Simulation, SimulationResponse};
