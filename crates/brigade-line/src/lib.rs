//! Bucket Brigade Line Model
//!
//! Static geometry and per-worker state for a self-organizing "bucket brigade"
//! production line.
//!
//! # Protocol
//!
//! Workers are ranked `1..=n` by base velocity, slowest first. Each worker
//! carries an item toward the end of the line until it either finishes the
//! item or catches up with the worker ahead, then walks back empty-handed and
//! takes over the item of the first upstream worker it meets. The slowest
//! worker walks all the way back and starts a fresh item.
//!
//! With strictly increasing velocities the hand-off points converge to a
//! unique partition of the line, proportional to cumulative velocity.
//!
//! # Perturbations
//!
//! A [`PebbleSchedule`] slows individual workers for bounded windows of
//! simulated time so that recovery of the partition can be measured.

mod error;
mod handoff;
mod line;
mod pebble;
mod worker;

pub use error::{Error, Result};
pub use handoff::{completed_prefix_len, HandoffKind, HandoffRecord};
pub use line::{Line, CONTACT_TOLERANCE};
pub use pebble::{PebbleEvent, PebbleSchedule};
pub use worker::{
    validate_workers, Direction, Phase, WorkerId, WorkerSpec, WorkerState,
    DEFAULT_RETURN_VELOCITY,
};
