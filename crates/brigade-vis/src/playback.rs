//! Playback controls over a finished run, in simulated time.

use std::sync::Arc;

use brigade_sim::{LineSnapshot, RunOutput, TraceEvent};
use serde::{Deserialize, Serialize};

/// Playback speed, in simulated time units per wall-clock second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    /// Pause playback
    Paused,
    /// 0.25x speed
    QuarterSpeed,
    /// 0.5x speed
    HalfSpeed,
    /// Normal speed (1x)
    Normal,
    /// 2x speed
    Double,
    /// 4x speed
    Quadruple,
    /// 10x speed
    TenX,
    /// Jump straight to the end
    Maximum,
}

impl PlaybackSpeed {
    /// Get the speed multiplier.
    pub fn multiplier(&self) -> f64 {
        match self {
            PlaybackSpeed::Paused => 0.0,
            PlaybackSpeed::QuarterSpeed => 0.25,
            PlaybackSpeed::HalfSpeed => 0.5,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::Double => 2.0,
            PlaybackSpeed::Quadruple => 4.0,
            PlaybackSpeed::TenX => 10.0,
            PlaybackSpeed::Maximum => f64::INFINITY,
        }
    }
}

/// Current state of playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Playback is stopped at the beginning
    Stopped,
    /// Playback is running forward
    Playing,
    /// Playback is paused
    Paused,
    /// Playback reached the end
    Finished,
}

/// Cursor over a run's timeline.
pub struct Playback {
    output: Arc<RunOutput>,
    time: f64,
    state: PlaybackState,
    speed: PlaybackSpeed,
    loop_enabled: bool,
}

impl Playback {
    pub fn new(output: Arc<RunOutput>) -> Self {
        Self {
            output,
            time: 0.0,
            state: PlaybackState::Stopped,
            speed: PlaybackSpeed::Normal,
            loop_enabled: false,
        }
    }

    /// Current simulated time of the cursor.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Simulated length of the run.
    pub fn duration(&self) -> f64 {
        self.output.summary.final_time
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn output(&self) -> &RunOutput {
        &self.output
    }

    /// Move the cursor to simulated time `time`, clamped to the run.
    pub fn seek(&mut self, time: f64) {
        self.time = if time.is_nan() { 0.0 } else { time.clamp(0.0, self.duration()) };
        if self.time >= self.duration() && !self.loop_enabled {
            self.state = PlaybackState::Finished;
        } else if self.state == PlaybackState::Finished {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn play(&mut self) {
        if self.time >= self.duration() {
            self.time = 0.0;
        }
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        self.state = PlaybackState::Paused;
    }

    /// Stop playback and return to the beginning.
    pub fn stop(&mut self) {
        self.time = 0.0;
        self.state = PlaybackState::Stopped;
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
        if matches!(speed, PlaybackSpeed::Paused) {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    /// Advance a playing cursor by `elapsed` wall-clock seconds.
    ///
    /// Returns the number of events passed.
    pub fn advance(&mut self, elapsed: f64) -> usize {
        if self.state != PlaybackState::Playing {
            return 0;
        }
        let before = self.event_index();
        let target = self.time + elapsed * self.speed.multiplier();
        if target >= self.duration() {
            let passed = self.output.events.len() - before;
            if self.loop_enabled {
                self.time = 0.0;
            } else {
                self.time = self.duration();
                self.state = PlaybackState::Finished;
            }
            return passed;
        }
        self.time = target;
        self.event_index() - before
    }

    /// Jump to the next event after the cursor.
    pub fn step_forward(&mut self) -> Option<&TraceEvent> {
        let next = self.output.events[self.event_index()..]
            .iter()
            .position(|e| e.time() > self.time)
            .map(|offset| self.event_index() + offset)?;

        self.time = self.output.events[next].time();
        if self.time >= self.duration() {
            if self.loop_enabled {
                self.time = 0.0;
            } else {
                self.state = PlaybackState::Finished;
            }
        }
        self.output.events.get(next)
    }

    /// Jump back to the latest event strictly before the cursor.
    pub fn step_backward(&mut self) {
        let before = self.output.events.partition_point(|e| e.time() < self.time);
        self.time = before
            .checked_sub(1)
            .map_or(0.0, |i| self.output.events[i].time());
        self.state = PlaybackState::Paused;
    }

    /// Number of events at or before the cursor.
    pub fn event_index(&self) -> usize {
        self.output.events.partition_point(|e| e.time() <= self.time)
    }

    /// Events up to the cursor.
    pub fn events_to_current(&self) -> &[TraceEvent] {
        &self.output.events[..self.event_index()]
    }

    /// Line state at the cursor.
    pub fn snapshot(&self) -> LineSnapshot {
        self.output.snapshot_at(self.time)
    }

    /// Progress through the run (0.0 - 1.0).
    pub fn progress(&self) -> f64 {
        if self.duration() > 0.0 {
            self.time / self.duration()
        } else {
            0.0
        }
    }
}

/// Playback status for sending to frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub time: f64,
    pub duration: f64,
    pub event_index: usize,
    pub total_events: usize,
    pub state: PlaybackState,
    pub speed: PlaybackSpeed,
    pub progress: f64,
    pub loop_enabled: bool,
}

impl From<&Playback> for PlaybackStatus {
    fn from(playback: &Playback) -> Self {
        Self {
            time: playback.time,
            duration: playback.duration(),
            event_index: playback.event_index(),
            total_events: playback.output.events.len(),
            state: playback.state,
            speed: playback.speed,
            progress: playback.progress(),
            loop_enabled: playback.loop_enabled,
        }
    }
}
