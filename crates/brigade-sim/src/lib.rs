//! Bucket Brigade Simulator
//!
//! Discrete-event simulation of a bucket brigade line, producing the ordered
//! hand-off trace that convergence analysis consumes.
//!
//! # Architecture
//!
//! - **Config**: Self-contained run description, JSON or built-in presets
//! - **Simulation**: Event-driven engine with exact event times
//! - **Events**: Hand-offs, completions, and pebble windows in time order
//! - **Trajectories**: Piecewise-linear motion of every worker
//!
//! # Usage
//!
//! ```ignore
//! let output = simulate(&RunConfig::two_workers())?;
//! for record in output.completed_handoffs() {
//!     println!("{} -> {} at {:.4}", record.from, record.to, record.position);
//! }
//! ```
//!
//! A run is a pure function of its configuration: the same [`RunConfig`]
//! always yields the same output.

mod config;
mod events;
mod simulation;
mod trajectory;

pub use config::{Horizon, RunConfig, SimulationOptions, WorkerConfig, PRESETS};
pub use events::{LineSnapshot, TraceEvent, WorkerSnapshot};
pub use simulation::{BrigadeSimulator, RunOutput, RunSummary};
pub use trajectory::{Trajectory, TrajectorySegment};

pub use brigade_line::{
    Error, HandoffKind, HandoffRecord, Line, PebbleEvent, PebbleSchedule, Phase, Result, WorkerId,
    WorkerSpec,
};

/// Run a simulation and return only the hand-off trace.
pub fn run(
    line: Line,
    workers: &[WorkerSpec],
    pebbles: PebbleSchedule,
    horizon: Horizon,
) -> Result<Vec<HandoffRecord>> {
    let options = SimulationOptions {
        record_trajectories: false,
        ..SimulationOptions::default()
    };
    let output = BrigadeSimulator::from_parts(line, workers, pebbles, horizon, options)?.run()?;
    Ok(output.handoffs)
}

/// Run a full configuration.
pub fn simulate(config: &RunConfig) -> Result<RunOutput> {
    BrigadeSimulator::new(config)?.run()
}
