// Library exports for the simulator binary and integration tests

// ===== Core matching and storage =====
pub mod constraint;
pub mod document;
pub mod imdb;
pub mod route;
pub mod simulation;
pub mod template;

// ===== Host =====
pub mod config;
pub mod server;

pub use config::Config;
pub use imdb::{Imdb, StoreError};
pub use server::{ControlServer, DataServer};
pub use simulation::{EngineError, MatchResult, RequestDescriptor, Simulation, SimulationEngine};
