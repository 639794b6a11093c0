//! Bucket Brigade Visualization Driver
//!
//! Presentation-layer driver for simulation runs. The core crates stay pure;
//! this crate owns the run currently on display, a playback cursor over it,
//! and the JSON API a frontend talks to.
//!
//! # Architecture
//!
//! - **Run**: Simulates a configuration and analyses its convergence
//! - **Playback**: Scrub through simulated time at any speed
//! - **REST API**: Submit runs, fetch traces, verdicts and hand-off statistics,
//!   control playback
//! - **WebSocket**: Streams the line snapshots published by the playback ticker
//!
//! # Usage
//!
//! ```ignore
//! let run = AnalyzedRun::compute(RunConfig::two_workers(), AnalysisConfig::default())?;
//! let server = VisServer::new(run);
//! server.serve(config.addr).await?;
//! ```

mod config;
mod error;
mod playback;
mod run;
mod server;

pub use config::{load_scenario, VisConfig, DEFAULT_ADDR, DEFAULT_SCENARIO};
pub use error::{ErrorBody, Result, VisError};
pub use playback::{Playback, PlaybackSpeed, PlaybackState, PlaybackStatus};
pub use run::{AnalyzedRun, HandoffStats, VerdictReport, WorkerIntervals, DENSITY_BINS};
pub use server::VisServer;
