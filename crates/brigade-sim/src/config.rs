//! Run configuration.
//!
//! A [`RunConfig`] is a complete, self-contained description of one run. The
//! simulator never reads ambient state: replaying a run means passing the same
//! configuration again.

use brigade_line::{
    Error, Line, PebbleEvent, PebbleSchedule, Result, WorkerId, WorkerSpec,
    DEFAULT_RETURN_VELOCITY,
};
use serde::{Deserialize, Serialize};

/// Names accepted by [`RunConfig::preset`].
pub const PRESETS: &[&str] = &["two-workers", "classic-three", "single-worker", "pebble-recovery"];

/// One worker entry of a run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub rank: u32,
    pub base_velocity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_position: Option<f64>,
}

impl WorkerConfig {
    pub fn new(rank: u32, base_velocity: f64) -> Self {
        Self {
            rank,
            base_velocity,
            return_velocity: None,
            initial_position: None,
        }
    }

    /// Resolve defaults into a worker spec.
    pub fn to_spec(&self) -> WorkerSpec {
        WorkerSpec::new(self.rank, self.base_velocity)
            .with_return_velocity(self.return_velocity.unwrap_or(DEFAULT_RETURN_VELOCITY))
            .with_initial_position(self.initial_position.unwrap_or(Line::START))
    }
}

/// When a run stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    /// Stop once this many cycles have completed
    Cycles(u64),
    /// Stop at this simulated time
    Time(f64),
}

impl Horizon {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Horizon::Cycles(0) => Err(Error::invalid_configuration(
                "cycle horizon must be at least one cycle",
            )),
            Horizon::Time(t) if !t.is_finite() || t <= 0.0 => Err(Error::invalid_configuration(
                format!("time horizon must be finite and positive, got {t}"),
            )),
            _ => Ok(()),
        }
    }
}

/// Engine limits and recording switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Steps after which the run is abandoned as diverged
    pub max_steps: u64,
    /// Record per-worker trajectories
    pub record_trajectories: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            record_trajectories: true,
        }
    }
}

/// Complete input of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub line_length: f64,
    pub workers: Vec<WorkerConfig>,
    #[serde(default)]
    pub pebbles: Vec<PebbleEvent>,
    pub horizon: Horizon,
    #[serde(default)]
    pub options: SimulationOptions,
}

impl RunConfig {
    /// An empty configuration; add workers with [`RunConfig::with_worker`].
    pub fn new(line_length: f64, horizon: Horizon) -> Self {
        Self {
            line_length,
            workers: Vec::new(),
            pebbles: Vec::new(),
            horizon,
            options: SimulationOptions::default(),
        }
    }

    pub fn with_worker(mut self, rank: u32, base_velocity: f64) -> Self {
        self.workers.push(WorkerConfig::new(rank, base_velocity));
        self
    }

    pub fn with_worker_config(mut self, worker: WorkerConfig) -> Self {
        self.workers.push(worker);
        self
    }

    /// Schedule a pebble. Parameters are validated when the run starts.
    pub fn with_pebble(mut self, worker: u32, start_time: f64, duration: f64, multiplier: f64) -> Self {
        self.pebbles.push(PebbleEvent {
            worker: WorkerId(worker),
            start_time,
            duration,
            multiplier,
        });
        self
    }

    pub fn with_options(mut self, options: SimulationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn line(&self) -> Result<Line> {
        Line::new(self.line_length)
    }

    pub fn worker_specs(&self) -> Vec<WorkerSpec> {
        self.workers.iter().map(WorkerConfig::to_spec).collect()
    }

    pub fn schedule(&self) -> Result<PebbleSchedule> {
        PebbleSchedule::from_events(self.pebbles.iter().copied())
    }

    /// Two workers on a line of length 10; the boundary settles at 10/3.
    pub fn two_workers() -> Self {
        Self::new(10.0, Horizon::Cycles(20))
            .with_worker(1, 1.0)
            .with_worker(2, 2.0)
    }

    /// Three workers on a unit line.
    pub fn classic_three() -> Self {
        Self::new(1.0, Horizon::Cycles(60))
            .with_worker(1, 0.1)
            .with_worker(2, 0.15)
            .with_worker(3, 0.75)
    }

    /// A lone worker shuttling back and forth.
    pub fn single_worker() -> Self {
        Self::new(1.0, Horizon::Cycles(5)).with_worker(1, 0.1)
    }

    /// Three workers with the fastest slowed by a quarter for a while once
    /// the line has settled. The slowed worker stays faster than its
    /// upstream neighbour, so the order is kept.
    pub fn pebble_recovery() -> Self {
        Self::new(10.0, Horizon::Cycles(150))
            .with_worker(1, 1.0)
            .with_worker(2, 2.0)
            .with_worker(3, 3.0)
            .with_pebble(3, 100.0, 10.0, 0.75)
    }

    /// Look up a built-in configuration by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "two-workers" => Some(Self::two_workers()),
            "classic-three" => Some(Self::classic_three()),
            "single-worker" => Some(Self::single_worker()),
            "pebble-recovery" => Some(Self::pebble_recovery()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_json() {
        let json = r#"{
            "line_length": 10.0,
            "workers": [
                {"rank": 1, "base_velocity": 1.0},
                {"rank": 2, "base_velocity": 2.0, "return_velocity": 50.0}
            ],
            "horizon": {"cycles": 20}
        }"#;

        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.horizon, Horizon::Cycles(20));
        assert!(config.pebbles.is_empty());
        assert_eq!(config.options, SimulationOptions::default());

        let specs = config.worker_specs();
        assert_eq!(specs[0].return_velocity, DEFAULT_RETURN_VELOCITY);
        assert_eq!(specs[1].return_velocity, 50.0);
        assert_eq!(specs[0].initial_position, 0.0);
    }

    #[test]
    fn parses_pebbles_and_time_horizon() {
        let json = r#"{
            "line_length": 5.0,
            "workers": [{"rank": 1, "base_velocity": 1.0}],
            "pebbles": [{"worker": 1, "start_time": 2.0, "duration": 1.0, "multiplier": 0.5}],
            "horizon": {"time": 30.0},
            "options": {"record_trajectories": false}
        }"#;

        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.horizon, Horizon::Time(30.0));
        assert_eq!(config.pebbles[0].worker, WorkerId(1));
        assert!(!config.options.record_trajectories);
        assert_eq!(config.options.max_steps, SimulationOptions::default().max_steps);
        assert_eq!(config.schedule().unwrap().len(), 1);
    }

    #[test]
    fn horizon_validation() {
        assert!(Horizon::Cycles(0).validate().is_err());
        assert!(Horizon::Time(0.0).validate().is_err());
        assert!(Horizon::Time(f64::INFINITY).validate().is_err());
        assert!(Horizon::Cycles(1).validate().is_ok());
        assert!(Horizon::Time(0.5).validate().is_ok());
    }

    #[test]
    fn presets_resolve() {
        for name in PRESETS {
            let config = RunConfig::preset(name).unwrap();
            assert!(config.line().is_ok(), "{name}");
            assert!(!config.workers.is_empty(), "{name}");
        }
        assert!(RunConfig::preset("nope").is_none());
    }

    #[test]
    fn invalid_pebble_surfaces_from_schedule() {
        let config = RunConfig::two_workers().with_pebble(1, 0.0, -1.0, 0.5);
        assert!(matches!(config.schedule(), Err(Error::InvalidPebble { .. })));
    }
}
