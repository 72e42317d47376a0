//! Simulator configuration.
//!
//! ```yaml
//! listen:
//!   control: 127.0.0.1:2525
//!   data: 127.0.0.1:8080
//! simulations:
//!   - name: GetPet
//!     condition:
//!       method: GET
//!       pattern: "/Pet/{Kind}"
//!       keyProperty: Kind
//!       persistence: exists
//! ```

use crate::simulation::Simulation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_control_addr")]
    pub control: SocketAddr,
    #[serde(default = "default_data_addr")]
    pub data: SocketAddr,
}

fn default_control_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 2525))
}

fn default_data_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            control: default_control_addr(),
            data: default_data_addr(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    /// Registered at startup, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub simulations: Vec<Simulation>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen.control == self.listen.data && self.listen.control.port() != 0 {
            anyhow::bail!(
                "Control and data listeners cannot share the address {}",
                self.listen.control
            );
        }

        let mut names = HashSet::new();
        for simulation in &self.simulations {
            if simulation.name.is_empty() {
                anyhow::bail!("Simulation name must not be empty");
            }
            if !names.insert(simulation.name.to_lowercase()) {
                anyhow::bail!("Duplicate simulation name '{}'", simulation.name);
            }
        }
        Ok(())
    }
}
