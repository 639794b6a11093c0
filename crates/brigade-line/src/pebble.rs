//! Scheduled slow-down events ("pebbles").
//!
//! A pebble scales one worker's carrying velocity by a multiplier in `(0, 1]`
//! over the half-open window `[start_time, start_time + duration)`. When
//! several windows overlap for the same worker the smallest multiplier wins.

use crate::error::{Error, Result};
use crate::worker::WorkerId;

/// A single scheduled slow-down.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PebbleEvent {
    pub worker: WorkerId,
    pub start_time: f64,
    pub duration: f64,
    /// Factor applied to the worker's base velocity while active
    pub multiplier: f64,
}

impl PebbleEvent {
    /// Create a validated pebble event.
    pub fn new(worker: WorkerId, start_time: f64, duration: f64, multiplier: f64) -> Result<Self> {
        let event = Self {
            worker,
            start_time,
            duration,
            multiplier,
        };
        event.validate()?;
        Ok(event)
    }

    /// Check the event parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(Error::invalid_pebble(format!(
                "pebble on {} starts at {}; start time must be finite and non-negative",
                self.worker, self.start_time
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(Error::invalid_pebble(format!(
                "pebble on {} has duration {}; duration must be positive",
                self.worker, self.duration
            )));
        }
        if !(self.multiplier > 0.0 && self.multiplier <= 1.0) {
            return Err(Error::invalid_pebble(format!(
                "pebble on {} has multiplier {}; expected a value in (0, 1]",
                self.worker, self.multiplier
            )));
        }
        Ok(())
    }

    /// End of the active window (exclusive).
    #[inline]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether the event is in effect at time `t`.
    #[inline]
    pub fn is_active(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time()
    }
}

/// The set of pebble events for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PebbleSchedule {
    events: Vec<PebbleEvent>,
}

impl PebbleSchedule {
    /// An empty schedule: every worker runs at its base velocity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schedule, validating every event.
    pub fn from_events(events: impl IntoIterator<Item = PebbleEvent>) -> Result<Self> {
        let mut schedule = Self::new();
        for event in events {
            schedule.schedule(event)?;
        }
        Ok(schedule)
    }

    /// Add an event to the schedule.
    pub fn schedule(&mut self, event: PebbleEvent) -> Result<()> {
        event.validate()?;
        self.events.push(event);
        Ok(())
    }

    /// Check that every event targets one of `worker_count` ranked workers.
    pub fn ensure_workers(&self, worker_count: usize) -> Result<()> {
        for event in &self.events {
            let rank = event.worker.rank() as usize;
            if rank == 0 || rank > worker_count {
                return Err(Error::invalid_pebble(format!(
                    "pebble targets {} but the line has {} workers",
                    event.worker, worker_count
                )));
            }
        }
        Ok(())
    }

    /// Velocity multiplier for `worker` at time `t`, in `(0, 1]`.
    pub fn effective_multiplier(&self, worker: WorkerId, t: f64) -> f64 {
        self.events
            .iter()
            .filter(|e| e.worker == worker && e.is_active(t))
            .map(|e| e.multiplier)
            .fold(1.0, f64::min)
    }

    /// Earliest window boundary strictly after `t`, if any.
    ///
    /// These are the instants at which some worker's velocity may change.
    pub fn next_change_after(&self, t: f64) -> Option<f64> {
        self.events
            .iter()
            .flat_map(|e| [e.start_time, e.end_time()])
            .filter(|&boundary| boundary > t)
            .fold(None, |best: Option<f64>, boundary| {
                Some(best.map_or(boundary, |b| b.min(boundary)))
            })
    }

    pub fn events(&self) -> &[PebbleEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
