//! Piecewise-linear worker trajectories.
//!
//! Each trajectory covers `[0, final_time]` without gaps. A new segment opens
//! whenever the worker's phase or effective velocity changes.

use brigade_line::{Direction, Phase, WorkerId};
use serde::{Deserialize, Serialize};

/// Constant-velocity stretch of a worker's motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySegment {
    pub phase: Phase,
    pub start_time: f64,
    pub end_time: f64,
    pub start_position: f64,
    pub end_position: f64,
    /// Signed velocity over the segment
    pub velocity: f64,
}

impl TrajectorySegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Linear interpolation inside the segment.
    pub fn position_at(&self, t: f64) -> f64 {
        let duration = self.duration();
        if duration <= 0.0 {
            return self.end_position;
        }
        let fraction = ((t - self.start_time) / duration).clamp(0.0, 1.0);
        self.start_position + (self.end_position - self.start_position) * fraction
    }
}

/// Recorded motion of one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub worker: WorkerId,
    pub base_velocity: f64,
    pub segments: Vec<TrajectorySegment>,
}

impl Trajectory {
    pub fn new(worker: WorkerId, base_velocity: f64) -> Self {
        Self {
            worker,
            base_velocity,
            segments: Vec::new(),
        }
    }

    /// Append motion over `[t0, t1]`, extending the last segment when the
    /// phase and velocity are unchanged.
    pub(crate) fn record(&mut self, phase: Phase, velocity: f64, t0: f64, t1: f64, x0: f64, x1: f64) {
        if let Some(last) = self.segments.last_mut() {
            if last.phase == phase && last.velocity == velocity && last.end_time == t0 {
                last.end_time = t1;
                last.end_position = x1;
                return;
            }
        }
        self.segments.push(TrajectorySegment {
            phase,
            start_time: t0,
            end_time: t1,
            start_position: x0,
            end_position: x1,
            velocity,
        });
    }

    /// Segment covering time `t`. At a shared endpoint the later segment wins.
    pub fn segment_at(&self, t: f64) -> Option<&TrajectorySegment> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        if t < first.start_time || t > last.end_time {
            return None;
        }
        let index = self.segments.partition_point(|s| s.end_time <= t);
        self.segments.get(index).or(Some(last))
    }

    /// Position at time `t`, if `t` lies within the recorded span.
    pub fn position_at(&self, t: f64) -> Option<f64> {
        self.segment_at(t).map(|s| s.position_at(t))
    }

    /// Total time spent travelling in `direction`.
    pub fn time_in(&self, direction: Direction) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.phase.direction() == direction)
            .map(TrajectorySegment::duration)
            .sum()
    }

    /// Length of the recorded span.
    pub fn total_time(&self) -> f64 {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => last.end_time - first.start_time,
            _ => 0.0,
        }
    }
}
