//! Workers and their kinematic state.
//!
//! A worker is always in one of two phases: carrying an item forward toward
//! the end boundary, or walking back empty-handed toward the start. Ranks run
//! `1..=n` and base velocities must be strictly increasing by rank, the
//! classical condition under which the hand-off points converge.

use crate::error::{Error, Result};
use crate::line::Line;

/// Speed used for the walk back when none is configured.
///
/// A large finite bound stands in for an instantaneous return so blocking and
/// pebble interactions stay observable without infinite arithmetic.
pub const DEFAULT_RETURN_VELOCITY: f64 = 1.0e9;

/// Worker identifier, equal to its rank (1 = slowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WorkerId(pub u32);

impl WorkerId {
    /// Rank of the worker.
    #[inline]
    pub const fn rank(&self) -> u32 {
        self.0
    }

    /// Zero-based index into rank-ordered storage.
    #[inline]
    pub const fn index(&self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    /// Identifier of the worker stored at a zero-based index.
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Direction of travel along the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Direction {
    /// Toward the end boundary
    Forward,
    /// Toward the start boundary
    Backward,
}

impl Direction {
    /// Sign of motion along the line.
    pub const fn sign(&self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

/// The two states of the per-worker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    /// Carrying an item toward the end boundary
    ForwardCarrying,
    /// Empty-handed, walking back for the next item
    BackwardEmpty,
}

impl Phase {
    pub const fn direction(&self) -> Direction {
        match self {
            Phase::ForwardCarrying => Direction::Forward,
            Phase::BackwardEmpty => Direction::Backward,
        }
    }

    pub const fn is_carrying(&self) -> bool {
        matches!(self, Phase::ForwardCarrying)
    }

    /// The opposite phase.
    pub const fn reversed(&self) -> Self {
        match self {
            Phase::ForwardCarrying => Phase::BackwardEmpty,
            Phase::BackwardEmpty => Phase::ForwardCarrying,
        }
    }
}

/// Input description of a worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerSpec {
    pub id: WorkerId,
    /// Speed while carrying, before any pebble slow-down
    pub base_velocity: f64,
    /// Speed while walking back empty-handed
    pub return_velocity: f64,
    /// Starting position; the worker starts carrying a fresh item
    pub initial_position: f64,
}

impl WorkerSpec {
    /// A worker starting at the start boundary with an effectively
    /// instantaneous return.
    pub fn new(rank: u32, base_velocity: f64) -> Self {
        Self {
            id: WorkerId(rank),
            base_velocity,
            return_velocity: DEFAULT_RETURN_VELOCITY,
            initial_position: Line::START,
        }
    }

    pub fn with_return_velocity(mut self, return_velocity: f64) -> Self {
        self.return_velocity = return_velocity;
        self
    }

    pub fn with_initial_position(mut self, position: f64) -> Self {
        self.initial_position = position;
        self
    }
}

/// Validate a set of worker specs against a line and return them sorted by
/// rank.
///
/// Ranks must be exactly `1..=n`, velocities finite and positive, base
/// velocities strictly increasing by rank, and initial positions inside
/// `[0, length)`.
pub fn validate_workers(line: &Line, specs: &[WorkerSpec]) -> Result<Vec<WorkerSpec>> {
    if specs.is_empty() {
        return Err(Error::invalid_configuration("at least one worker is required"));
    }

    let mut sorted = specs.to_vec();
    sorted.sort_by_key(|s| s.id);

    for (index, spec) in sorted.iter().enumerate() {
        if spec.id != WorkerId::from_index(index) {
            return Err(Error::invalid_configuration(format!(
                "worker ranks must be unique and cover 1..={}, found rank {} at position {}",
                sorted.len(),
                spec.id.rank(),
                index + 1
            )));
        }
        if !spec.base_velocity.is_finite() || spec.base_velocity <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "{} has non-positive base velocity {}",
                spec.id, spec.base_velocity
            )));
        }
        if !spec.return_velocity.is_finite() || spec.return_velocity <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "{} has non-positive return velocity {}",
                spec.id, spec.return_velocity
            )));
        }
        if !spec.initial_position.is_finite()
            || spec.initial_position < Line::START
            || spec.initial_position >= line.end()
        {
            return Err(Error::invalid_configuration(format!(
                "{} starts at {} outside [0, {})",
                spec.id,
                spec.initial_position,
                line.end()
            )));
        }
    }

    for pair in sorted.windows(2) {
        if pair[1].base_velocity <= pair[0].base_velocity {
            return Err(Error::invalid_configuration(format!(
                "base velocities must strictly increase by rank: {} has {} but {} has {}",
                pair[0].id, pair[0].base_velocity, pair[1].id, pair[1].base_velocity
            )));
        }
    }

    Ok(sorted)
}

/// Mutable kinematic state of a worker during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerState {
    pub id: WorkerId,
    pub base_velocity: f64,
    pub return_velocity: f64,
    pub position: f64,
    pub phase: Phase,
}

impl WorkerState {
    /// Fresh state for a validated spec: carrying forward from its start.
    pub fn from_spec(spec: &WorkerSpec) -> Self {
        Self {
            id: spec.id,
            base_velocity: spec.base_velocity,
            return_velocity: spec.return_velocity,
            position: spec.initial_position,
            phase: Phase::ForwardCarrying,
        }
    }

    #[inline]
    pub fn carrying(&self) -> bool {
        self.phase.is_carrying()
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.phase.direction()
    }

    /// Signed velocity given the pebble multiplier currently in effect.
    ///
    /// The multiplier only scales carrying motion; the walk back always uses
    /// the return velocity.
    pub fn velocity(&self, multiplier: f64) -> f64 {
        match self.phase {
            Phase::ForwardCarrying => self.base_velocity * multiplier,
            Phase::BackwardEmpty => -self.return_velocity,
        }
    }

    /// Move for `dt` at signed `velocity`, staying on the line.
    pub fn advance(&mut self, line: &Line, velocity: f64, dt: f64) {
        self.position = line.clamp(self.position + velocity * dt);
    }

    /// Flip between carrying forward and walking back.
    pub fn reverse(&mut self) {
        self.phase = self.phase.reversed();
    }
}
