//! Event-driven bucket brigade simulation.
//!
//! Motion is piecewise linear between events, so every event time has a
//! closed form. Each step computes the earliest of:
//!
//! - a worker reaching the end boundary (carrying) or the start boundary
//!   (walking back),
//! - two neighbouring workers meeting,
//! - a pebble window opening or closing, which changes a velocity,
//! - the time horizon,
//!
//! advances every worker to that instant and then resolves all contacts at
//! that instant before time moves again. Contacts at the same instant are
//! resolved boundaries first, then meetings, each lowest rank first. Workers
//! arriving at a boundary together each deliver or pick up their own item,
//! and a shared return to the start closes a single cycle.
//!
//! Workers are kept in a chain ordered upstream to downstream. Only chain
//! neighbours can meet, since the first meeting on a line is always between
//! neighbours.

use brigade_line::{
    completed_prefix_len, validate_workers, Error, HandoffKind, HandoffRecord, Line, Phase,
    PebbleSchedule, Result, WorkerId, WorkerSpec, WorkerState,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{Horizon, RunConfig, SimulationOptions};
use crate::events::{LineSnapshot, TraceEvent, WorkerSnapshot};
use crate::trajectory::Trajectory;

/// Contact resolutions allowed per worker at a single instant.
const CONTACTS_PER_WORKER: usize = 8;

/// What happens when two chain neighbours meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairKind {
    /// Carrying worker catches the carrying worker ahead
    Blocking,
    /// Worker walking back meets the carrying worker upstream
    Relay,
    /// Faster empty-handed worker walks past a slower one
    Passing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contact {
    /// Chain slots `slot` and `slot + 1` meet
    Pair { slot: usize, kind: PairKind },
    /// Worker (by index) reaches the end boundary
    End { worker: usize },
    /// Worker (by index) reaches the start boundary
    Start { worker: usize },
}

/// Earliest upcoming event.
#[derive(Debug, Clone, Copy)]
struct NextEvent {
    dt: f64,
    /// Exact target time when the event is a scheduled instant
    at: Option<f64>,
}

/// Aggregate numbers for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub final_time: f64,
    pub cycles_completed: u64,
    pub items_completed: u64,
    pub steps: u64,
    pub handoffs: usize,
    pub blocking_handoffs: usize,
    /// Finished items per unit of simulated time
    pub throughput: f64,
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub handoffs: Vec<HandoffRecord>,
    pub events: Vec<TraceEvent>,
    /// One per worker in rank order; empty when recording is disabled
    pub trajectories: Vec<Trajectory>,
    pub summary: RunSummary,
}

impl RunOutput {
    /// Hand-offs belonging to cycles that completed before the run stopped.
    pub fn completed_handoffs(&self) -> &[HandoffRecord] {
        let len = completed_prefix_len(&self.handoffs, self.summary.cycles_completed);
        &self.handoffs[..len]
    }

    /// Reconstruct the line at time `t` from the recorded trajectories.
    pub fn snapshot_at(&self, t: f64) -> LineSnapshot {
        let t = t.clamp(0.0, self.summary.final_time);
        let workers = self
            .trajectories
            .iter()
            .filter_map(|trajectory| {
                let segment = trajectory.segment_at(t)?;
                Some(WorkerSnapshot {
                    id: trajectory.worker,
                    position: segment.position_at(t),
                    phase: segment.phase,
                    velocity: segment.velocity,
                    base_velocity: trajectory.base_velocity,
                })
            })
            .collect();

        LineSnapshot {
            time: t,
            cycles_completed: LineSnapshot::cycles_until(&self.events, t),
            workers,
        }
    }
}

/// Tracks which pebble windows have already been announced.
#[derive(Debug, Clone, Copy, Default)]
struct PebbleProgress {
    started: bool,
    ended: bool,
}

/// The discrete-event engine for one run.
pub struct BrigadeSimulator {
    line: Line,
    /// Indexed by rank - 1
    workers: Vec<WorkerState>,
    /// Worker indices, upstream first
    chain: Vec<usize>,
    pebbles: PebbleSchedule,
    pebble_progress: Vec<PebbleProgress>,
    horizon: Horizon,
    options: SimulationOptions,
    now: f64,
    cycle: u64,
    /// Instant at which the last cycle closed
    cycle_closed_at: Option<f64>,
    items_completed: u64,
    steps: u64,
    handoffs: Vec<HandoffRecord>,
    events: Vec<TraceEvent>,
    trajectories: Vec<Trajectory>,
}

impl BrigadeSimulator {
    /// Validate a configuration and build a simulator at time zero.
    pub fn new(config: &RunConfig) -> Result<Self> {
        let line = config.line()?;
        let schedule = config.schedule()?;
        Self::from_parts(line, &config.worker_specs(), schedule, config.horizon, config.options)
    }

    /// Build a simulator from already constructed parts.
    ///
    /// Fails fast on invalid workers, pebbles targeting unknown workers, or
    /// an empty horizon.
    pub fn from_parts(
        line: Line,
        specs: &[WorkerSpec],
        pebbles: PebbleSchedule,
        horizon: Horizon,
        options: SimulationOptions,
    ) -> Result<Self> {
        horizon.validate()?;
        if options.max_steps == 0 {
            return Err(Error::invalid_configuration("max_steps must be positive"));
        }
        let specs = validate_workers(&line, specs)?;
        pebbles.ensure_workers(specs.len())?;

        let workers: Vec<WorkerState> = specs.iter().map(WorkerState::from_spec).collect();
        let mut chain: Vec<usize> = (0..workers.len()).collect();
        chain.sort_by(|&a, &b| workers[a].position.total_cmp(&workers[b].position).then(a.cmp(&b)));

        let trajectories = if options.record_trajectories {
            specs.iter().map(|s| Trajectory::new(s.id, s.base_velocity)).collect()
        } else {
            Vec::new()
        };

        let mut sim = Self {
            line,
            workers,
            chain,
            pebble_progress: vec![PebbleProgress::default(); pebbles.len()],
            pebbles,
            horizon,
            options,
            now: 0.0,
            cycle: 0,
            cycle_closed_at: None,
            items_completed: 0,
            steps: 0,
            handoffs: Vec::new(),
            events: Vec::new(),
            trajectories,
        };

        debug!(
            workers = sim.workers.len(),
            length = line.length(),
            pebbles = sim.pebbles.len(),
            "simulator initialised"
        );

        sim.sync_pebbles();
        sim.resolve_contacts()?;
        Ok(sim)
    }

    /// Run until the horizon and return the full output.
    pub fn run(mut self) -> Result<RunOutput> {
        while !self.is_finished() {
            self.step()?;
        }
        let output = self.finish();
        info!(
            final_time = output.summary.final_time,
            cycles = output.summary.cycles_completed,
            handoffs = output.summary.handoffs,
            steps = output.summary.steps,
            "run complete"
        );
        Ok(output)
    }

    /// Whether the horizon has been reached.
    pub fn is_finished(&self) -> bool {
        match self.horizon {
            Horizon::Cycles(cycles) => self.cycle >= cycles,
            Horizon::Time(t) => self.now >= t,
        }
    }

    /// Advance to the next event and resolve everything that happens there.
    pub fn step(&mut self) -> Result<()> {
        if self.steps >= self.options.max_steps {
            return Err(Error::diverged(format!(
                "step budget of {} exhausted at t={} after {} cycles",
                self.options.max_steps, self.now, self.cycle
            )));
        }

        let next = self.next_event()?;
        let target = next.at.unwrap_or(self.now + next.dt);
        if !(target > self.now) {
            return Err(Error::diverged(format!(
                "event loop stalled at t={} (dt={})",
                self.now, next.dt
            )));
        }

        self.advance_to(target);
        self.steps += 1;
        trace!(step = self.steps, time = self.now, cycle = self.cycle, "advanced");

        self.sync_pebbles();
        self.resolve_contacts()
    }

    /// Time until the next event, or an error if any candidate is malformed.
    fn next_event(&self) -> Result<NextEvent> {
        let mut best = NextEvent {
            dt: f64::INFINITY,
            at: None,
        };
        let mut consider = |dt: f64, at: Option<f64>, source: &str| -> Result<()> {
            if dt.is_nan() || dt < 0.0 {
                return Err(Error::diverged(format!(
                    "{source} produced event time {dt} at t={}",
                    self.now
                )));
            }
            if dt < best.dt {
                best = NextEvent { dt, at };
            }
            Ok(())
        };

        for index in 0..self.workers.len() {
            consider(self.boundary_time(index), None, "boundary")?;
        }

        for slot in 0..self.chain.len().saturating_sub(1) {
            if let Some((_, gap, closing)) = self.approach(slot) {
                consider(gap / closing, None, "collision")?;
            }
        }

        if let Some(change) = self.pebbles.next_change_after(self.now) {
            consider(change - self.now, Some(change), "pebble window")?;
        }

        if let Horizon::Time(limit) = self.horizon {
            let dt = limit - self.now;
            if dt <= best.dt {
                best = NextEvent { dt, at: Some(limit) };
            }
        }

        if !best.dt.is_finite() || best.dt <= 0.0 {
            return Err(Error::diverged(format!(
                "no positive finite event time at t={} (got {})",
                self.now, best.dt
            )));
        }
        Ok(best)
    }

    /// Signed effective velocity of a worker right now.
    fn velocity(&self, index: usize) -> f64 {
        let worker = &self.workers[index];
        worker.velocity(self.pebbles.effective_multiplier(worker.id, self.now))
    }

    /// Time for a worker to reach the boundary it is heading for.
    fn boundary_time(&self, index: usize) -> f64 {
        let worker = &self.workers[index];
        let speed = self.velocity(index).abs();
        match worker.phase {
            Phase::ForwardCarrying => self.line.remaining(worker.position) / speed,
            Phase::BackwardEmpty => worker.position / speed,
        }
    }

    /// Gap and closing speed of chain slots `slot` and `slot + 1`, if they
    /// are approaching each other.
    fn approach(&self, slot: usize) -> Option<(PairKind, f64, f64)> {
        let (up, down) = (self.chain[slot], self.chain[slot + 1]);
        let closing = self.velocity(up) - self.velocity(down);
        if !(closing > 0.0) {
            return None;
        }
        let kind = match (self.workers[up].phase, self.workers[down].phase) {
            (Phase::ForwardCarrying, Phase::ForwardCarrying) => PairKind::Blocking,
            (Phase::ForwardCarrying, Phase::BackwardEmpty) => PairKind::Relay,
            (Phase::BackwardEmpty, Phase::BackwardEmpty) => PairKind::Passing,
            (Phase::BackwardEmpty, Phase::ForwardCarrying) => return None,
        };
        let gap = (self.workers[down].position - self.workers[up].position).max(0.0);
        Some((kind, gap, closing))
    }

    /// Whether an event `dt` away is indistinguishable from now.
    fn is_instant(&self, dt: f64) -> bool {
        !(self.now + dt > self.now)
    }

    fn advance_to(&mut self, target: f64) {
        let dt = target - self.now;
        for index in 0..self.workers.len() {
            let velocity = self.velocity(index);
            let worker = &mut self.workers[index];
            let (phase, from) = (worker.phase, worker.position);
            worker.advance(&self.line, velocity, dt);
            let to = worker.position;
            if let Some(trajectory) = self.trajectories.get_mut(index) {
                trajectory.record(phase, velocity, self.now, target, from, to);
            }
        }
        self.now = target;
    }

    /// Announce pebble windows that opened or closed by now.
    fn sync_pebbles(&mut self) {
        for (event, progress) in self.pebbles.events().iter().zip(self.pebble_progress.iter_mut()) {
            if !progress.started && event.start_time <= self.now {
                progress.started = true;
                debug!(worker = %event.worker, multiplier = event.multiplier, time = event.start_time, "pebble started");
                self.events.push(TraceEvent::PebbleStarted {
                    worker: event.worker,
                    multiplier: event.multiplier,
                    time: event.start_time,
                });
            }
            if !progress.ended && event.end_time() <= self.now {
                progress.ended = true;
                debug!(worker = %event.worker, time = event.end_time(), "pebble ended");
                self.events.push(TraceEvent::PebbleEnded {
                    worker: event.worker,
                    time: event.end_time(),
                });
            }
        }
    }

    /// Resolve every contact at the current instant, cascading until the
    /// line is free of contacts.
    fn resolve_contacts(&mut self) -> Result<()> {
        let limit = CONTACTS_PER_WORKER * self.workers.len() + 1;
        for _ in 0..limit {
            match self.next_contact() {
                Some(contact) => self.resolve(contact),
                None => return Ok(()),
            }
        }
        Err(Error::diverged(format!(
            "contacts at t={} did not settle after {limit} resolutions",
            self.now
        )))
    }

    /// The contact to resolve first: boundaries before meetings, then lowest
    /// rank involved.
    ///
    /// Two workers touching a boundary together are never paired; each
    /// resolves its own boundary and they part or move on side by side.
    fn next_contact(&self) -> Option<Contact> {
        let mut best: Option<((u8, usize), Contact)> = None;
        let mut consider = |key: (u8, usize), contact: Contact| {
            if best.map_or(true, |(k, _)| key < k) {
                best = Some((key, contact));
            }
        };

        for (index, worker) in self.workers.iter().enumerate() {
            let touching = match worker.phase {
                Phase::ForwardCarrying => self.line.at_end(worker.position),
                Phase::BackwardEmpty => self.line.at_start(worker.position),
            } || self.is_instant(self.boundary_time(index));
            if touching {
                let contact = match worker.phase {
                    Phase::ForwardCarrying => Contact::End { worker: index },
                    Phase::BackwardEmpty => Contact::Start { worker: index },
                };
                consider((0, index), contact);
            }
        }

        for slot in 0..self.chain.len().saturating_sub(1) {
            if let Some((kind, gap, closing)) = self.approach(slot) {
                if gap <= self.line.tolerance() || self.is_instant(gap / closing) {
                    let rank = self.chain[slot].min(self.chain[slot + 1]);
                    consider((1, rank), Contact::Pair { slot, kind });
                }
            }
        }

        best.map(|(_, contact)| contact)
    }

    fn resolve(&mut self, contact: Contact) {
        match contact {
            Contact::End { worker } => {
                let state = &mut self.workers[worker];
                state.position = self.line.end();
                state.phase = Phase::BackwardEmpty;
                let id = state.id;
                self.items_completed += 1;
                debug!(worker = %id, time = self.now, cycle = self.cycle, "item completed");
                self.events.push(TraceEvent::ItemCompleted {
                    worker: id,
                    cycle: self.cycle,
                    time: self.now,
                });
            }
            Contact::Start { worker } => {
                let state = &mut self.workers[worker];
                state.position = Line::START;
                state.phase = Phase::ForwardCarrying;
                let id = state.id;
                self.settle_start_order();

                if self.cycle_closed_at == Some(self.now) {
                    debug!(worker = %id, time = self.now, cycle = self.cycle, "picked up alongside");
                    return;
                }
                self.cycle_closed_at = Some(self.now);
                debug!(worker = %id, time = self.now, cycle = self.cycle, "cycle completed");
                self.events.push(TraceEvent::CycleCompleted {
                    worker: id,
                    cycle: self.cycle,
                    time: self.now,
                });
                self.cycle += 1;
            }
            Contact::Pair { slot, kind } => self.resolve_meeting(slot, kind),
        }
    }

    /// Workers standing on the start boundary leave it in rank order.
    fn settle_start_order(&mut self) {
        let at_start = self
            .chain
            .iter()
            .take_while(|&&index| self.line.at_start(self.workers[index].position))
            .count();
        self.chain[..at_start].sort_unstable();
    }

    fn resolve_meeting(&mut self, slot: usize, kind: PairKind) {
        let (up, down) = (self.chain[slot], self.chain[slot + 1]);
        let meeting = self.meeting_point(up, down);
        self.workers[up].position = meeting;
        self.workers[down].position = meeting;
        let (up_id, down_id) = (self.workers[up].id, self.workers[down].id);

        match kind {
            PairKind::Blocking => {
                // Trailing worker keeps going; the blocked one turns back and
                // is now upstream of it.
                self.workers[down].phase = Phase::BackwardEmpty;
                self.chain.swap(slot, slot + 1);
                self.record_handoff(down_id, up_id, meeting, HandoffKind::Blocking);
            }
            PairKind::Relay => {
                self.workers[down].phase = Phase::ForwardCarrying;
                self.workers[up].phase = Phase::BackwardEmpty;
                self.record_handoff(up_id, down_id, meeting, HandoffKind::Relay);
            }
            PairKind::Passing => {
                self.chain.swap(slot, slot + 1);
                debug!(overtaking = %down_id, overtaken = %up_id, position = meeting, "passed");
                self.events.push(TraceEvent::Passed {
                    overtaking: down_id,
                    overtaken: up_id,
                    position: meeting,
                    time: self.now,
                });
            }
        }
    }

    /// Where two touching workers meet.
    ///
    /// A fast walker's position carries the rounding of the step time times
    /// its speed, so the slower worker's position is taken.
    fn meeting_point(&self, a: usize, b: usize) -> f64 {
        let (speed_a, speed_b) = (self.velocity(a).abs(), self.velocity(b).abs());
        let (xa, xb) = (self.workers[a].position, self.workers[b].position);
        let meeting = if speed_a < speed_b {
            xa
        } else if speed_b < speed_a {
            xb
        } else {
            0.5 * (xa + xb)
        };
        self.line.clamp(meeting)
    }

    fn record_handoff(&mut self, from: WorkerId, to: WorkerId, position: f64, kind: HandoffKind) {
        let record = HandoffRecord {
            cycle_index: self.cycle,
            from,
            to,
            position,
            time: self.now,
            kind,
        };
        debug!(from = %from, to = %to, position, time = self.now, kind = ?kind, "hand-off");
        self.handoffs.push(record);
        self.events.push(TraceEvent::Handoff(record));
    }

    /// Consume the simulator and package its output.
    pub fn finish(self) -> RunOutput {
        let blocking_handoffs = self
            .handoffs
            .iter()
            .filter(|r| r.kind == HandoffKind::Blocking)
            .count();
        let throughput = if self.now > 0.0 {
            self.items_completed as f64 / self.now
        } else {
            0.0
        };
        RunOutput {
            summary: RunSummary {
                final_time: self.now,
                cycles_completed: self.cycle,
                items_completed: self.items_completed,
                steps: self.steps,
                handoffs: self.handoffs.len(),
                blocking_handoffs,
                throughput,
            },
            handoffs: self.handoffs,
            events: self.events,
            trajectories: self.trajectories,
        }
    }

    /// Current state of every worker, in rank order.
    pub fn snapshot(&self) -> LineSnapshot {
        LineSnapshot {
            time: self.now,
            cycles_completed: self.cycle,
            workers: (0..self.workers.len())
                .map(|index| {
                    let worker = &self.workers[index];
                    WorkerSnapshot {
                        id: worker.id,
                        position: worker.position,
                        phase: worker.phase,
                        velocity: self.velocity(index),
                        base_velocity: worker.base_velocity,
                    }
                })
                .collect(),
        }
    }

    /// Worker ids in chain order, upstream first.
    pub fn chain_order(&self) -> Vec<WorkerId> {
        self.chain.iter().map(|&index| self.workers[index].id).collect()
    }

    pub fn line(&self) -> &Line {
        &self.line
    }

    pub fn workers(&self) -> &[WorkerState] {
        &self.workers
    }

    pub fn handoffs(&self) -> &[HandoffRecord] {
        &self.handoffs
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}
