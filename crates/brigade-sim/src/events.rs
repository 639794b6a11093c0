//! Trace events and line snapshots.

use brigade_line::{HandoffRecord, Phase, WorkerId};
use serde::{Deserialize, Serialize};

/// Events recorded during a run, in simulated-time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TraceEvent {
    /// An item changed hands
    Handoff(HandoffRecord),

    /// A worker delivered an item at the end boundary
    ItemCompleted {
        worker: WorkerId,
        cycle: u64,
        time: f64,
    },

    /// A worker reached the start boundary and picked up a raw item,
    /// closing `cycle`
    CycleCompleted {
        worker: WorkerId,
        cycle: u64,
        time: f64,
    },

    /// An empty-handed worker walked past a slower empty-handed worker
    Passed {
        overtaking: WorkerId,
        overtaken: WorkerId,
        position: f64,
        time: f64,
    },

    /// A pebble window opened
    PebbleStarted {
        worker: WorkerId,
        multiplier: f64,
        time: f64,
    },

    /// A pebble window closed
    PebbleEnded { worker: WorkerId, time: f64 },
}

impl TraceEvent {
    /// Simulated time at which the event happened.
    pub fn time(&self) -> f64 {
        match self {
            TraceEvent::Handoff(record) => record.time,
            TraceEvent::ItemCompleted { time, .. } => *time,
            TraceEvent::CycleCompleted { time, .. } => *time,
            TraceEvent::Passed { time, .. } => *time,
            TraceEvent::PebbleStarted { time, .. } => *time,
            TraceEvent::PebbleEnded { time, .. } => *time,
        }
    }

    pub fn as_handoff(&self) -> Option<&HandoffRecord> {
        match self {
            TraceEvent::Handoff(record) => Some(record),
            _ => None,
        }
    }
}

/// State of one worker at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub position: f64,
    pub phase: Phase,
    /// Signed effective velocity
    pub velocity: f64,
    pub base_velocity: f64,
}

/// State of the whole line at an instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub time: f64,
    /// Cycles completed up to and including `time`
    pub cycles_completed: u64,
    /// Workers in rank order
    pub workers: Vec<WorkerSnapshot>,
}

impl LineSnapshot {
    /// Count cycle completions among the events up to `time`.
    pub fn cycles_until(events: &[TraceEvent], time: f64) -> u64 {
        events
            .iter()
            .take_while(|e| e.time() <= time)
            .filter(|e| matches!(e, TraceEvent::CycleCompleted { .. }))
            .count() as u64
    }

    /// Workers ordered by position, upstream first. Ties keep rank order.
    pub fn upstream_order(&self) -> Vec<WorkerId> {
        let mut workers: Vec<_> = self.workers.iter().collect();
        workers.sort_by(|a, b| a.position.total_cmp(&b.position).then(a.id.cmp(&b.id)));
        workers.into_iter().map(|w| w.id).collect()
    }
}
