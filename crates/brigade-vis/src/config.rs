//! Driver configuration from environment and command line.

use std::net::SocketAddr;
use std::path::Path;

use brigade_sim::RunConfig;

use crate::error::{Result, VisError};

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SCENARIO: &str = "two-workers";

/// Where to listen and which run to load first.
#[derive(Debug, Clone, PartialEq)]
pub struct VisConfig {
    pub addr: SocketAddr,
    /// Preset name or path to a JSON run configuration
    pub scenario: String,
}

impl VisConfig {
    /// Read `BRIGADE_VIS_ADDR` and `BRIGADE_SCENARIO`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = lookup("BRIGADE_VIS_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = value
            .parse()
            .map_err(|source| VisError::InvalidAddr { value, source })?;

        let scenario = lookup("BRIGADE_SCENARIO").unwrap_or_else(|| DEFAULT_SCENARIO.to_string());

        Ok(Self { addr, scenario })
    }

    /// Apply positional arguments: `[scenario] [port]`.
    pub fn with_args<I, S>(mut self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        if let Some(scenario) = args.next() {
            self.scenario = scenario.as_ref().to_string();
        }
        if let Some(port) = args.next() {
            let port = port.as_ref();
            let port: u16 = port
                .parse()
                .map_err(|_| VisError::InvalidPort(port.to_string()))?;
            self.addr.set_port(port);
        }
        Ok(self)
    }

    pub fn load_scenario(&self) -> Result<RunConfig> {
        load_scenario(&self.scenario)
    }
}

impl Default for VisConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            scenario: DEFAULT_SCENARIO.to_string(),
        }
    }
}

/// Resolve a preset name or a JSON file into a run configuration.
pub fn load_scenario(scenario: &str) -> Result<RunConfig> {
    if let Some(config) = RunConfig::preset(scenario) {
        return Ok(config);
    }
    let path = Path::new(scenario);
    if !path.is_file() {
        return Err(VisError::UnknownScenario(scenario.to_string()));
    }
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
