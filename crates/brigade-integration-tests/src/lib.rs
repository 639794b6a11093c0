//! Shared scenarios for cross-crate tests.
//!
//! Each fixture is a complete [`RunConfig`]; the tests under `tests/` run
//! them through the simulator and the convergence analyzer.

use brigade_line::{HandoffRecord, Line, Result};
use brigade_sim::{simulate, Horizon, RunConfig, RunOutput};

/// Two workers `v = [1, 2]` on a line of length 10.
pub fn two_workers(cycles: u64) -> RunConfig {
    RunConfig::new(10.0, Horizon::Cycles(cycles))
        .with_worker(1, 1.0)
        .with_worker(2, 2.0)
}

/// Time at which [`pebble_on_fast_worker`] drops its pebble.
pub const PEBBLE_START: f64 = 60.0;

/// Two workers `v = [1, 4]`, boundary settling at 2, with worker 2 halved
/// for ten time units once the line has settled.
pub fn pebble_on_fast_worker() -> RunConfig {
    RunConfig::new(10.0, Horizon::Cycles(80))
        .with_worker(1, 1.0)
        .with_worker(2, 4.0)
        .with_pebble(2, PEBBLE_START, 10.0, 0.5)
}

/// Time at which [`inverted_order`] lifts its pebble.
pub const INVERSION_END: f64 = 101.0;

/// Worker 2 slowed below worker 1 from `t = 1` to [`INVERSION_END`], long
/// enough for the two to swap places on the line.
pub fn inverted_order() -> RunConfig {
    RunConfig::new(10.0, Horizon::Time(220.0))
        .with_worker(1, 1.0)
        .with_worker(2, 2.0)
        .with_pebble(2, 1.0, INVERSION_END - 1.0, 0.25)
}

/// Base velocities of a configuration, in rank order.
pub fn velocities(config: &RunConfig) -> Vec<f64> {
    let mut workers = config.workers.clone();
    workers.sort_by_key(|w| w.rank);
    workers.iter().map(|w| w.base_velocity).collect()
}

/// Run a configuration and keep the hand-offs of completed cycles.
pub fn completed_trace(config: &RunConfig) -> Result<(RunOutput, Vec<HandoffRecord>)> {
    let output = simulate(config)?;
    let trace = output.completed_handoffs().to_vec();
    Ok((output, trace))
}

/// Classical limiting partition for a configuration.
pub fn expected_partition(config: &RunConfig) -> Result<Vec<f64>> {
    brigade_convergence::fixed_point_partition(&Line::new(config.line_length)?, &velocities(config))
}
