//! HTTP host for the simulation engine.
//!
//! Two listeners share one [`SimulationEngine`]:
//! - the control API (default `127.0.0.1:2525`) registers and deletes
//!   simulations, reads and writes the store directly and exposes the
//!   body-parameter conversions
//! - the data listener (default `127.0.0.1:8080`) answers every request from
//!   the first matching simulation

mod data;
mod handlers;
mod router;
mod types;

pub use data::respond;
pub use router::route_by_path;

use crate::simulation::SimulationEngine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Accept loop shared by both listeners.
async fn serve<H, F>(
    listener: TcpListener,
    engine: Arc<SimulationEngine>,
    label: &'static str,
    handler: H,
) -> Result<(), anyhow::Error>
where
    H: Fn(Request<Incoming>, Arc<SimulationEngine>) -> F + Copy + Send + Sync + 'static,
    F: Future<Output = Result<Response<Full<Bytes>>, hyper::Error>> + Send + 'static,
{
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let engine = Arc::clone(&engine);

        tokio::spawn(async move {
            let service = service_fn(move |req| handler(req, Arc::clone(&engine)));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("{} connection error: {}", label, e);
            }
        });
    }
}

/// Control API server
pub struct ControlServer {
    listener: TcpListener,
    engine: Arc<SimulationEngine>,
}

impl ControlServer {
    /// Bind the control listener. Port 0 picks an ephemeral port.
    pub async fn bind(addr: SocketAddr, engine: Arc<SimulationEngine>) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the control API server
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Rift simulator control API listening on http://{}", self.local_addr()?);
        serve(self.listener, self.engine, "Control API", router::route_request).await
    }
}

/// Data listener server
pub struct DataServer {
    listener: TcpListener,
    engine: Arc<SimulationEngine>,
}

impl DataServer {
    /// Bind the data listener. Port 0 picks an ephemeral port.
    pub async fn bind(addr: SocketAddr, engine: Arc<SimulationEngine>) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the data listener
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Rift simulator data listener on http://{}", self.local_addr()?);
        serve(self.listener, self.engine, "Data listener", data::handle_data_request).await
    }
}
