//! Convergence verdicts over hand-off traces.
//!
//! # Stability
//!
//! A cycle `c` is the cycle of convergence when the next `window` cycle
//! transitions after it are all aligned and each moves every boundary by
//! less than `tolerance`. The limiting partition is the mean boundary vector
//! over those `window` cycles.
//!
//! # Recovery
//!
//! After a perturbation the drift series spikes and then contracts again.
//! [`ConvergenceAnalyzer::recovery_after`] measures the spike and the first
//! stable window that follows it.

use brigade_line::{Error, HandoffRecord, Result};

use crate::boundary::{boundary_vectors, drifts, BoundaryVector, Drift};

/// Default boundary tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default number of stable transitions required.
pub const DEFAULT_STABILITY_WINDOW: usize = 5;

/// Analysis parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisConfig {
    pub tolerance: f64,
    pub stability_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            stability_window: DEFAULT_STABILITY_WINDOW,
        }
    }
}

/// Outcome of analysing a trace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvergenceVerdict {
    pub converged: bool,
    pub cycle_of_convergence: Option<u64>,
    /// Boundary positions in ascending order
    pub limiting_partition: Vec<f64>,
    pub residual_drift: f64,
}

impl ConvergenceVerdict {
    fn unconverged(partition: Vec<f64>, residual_drift: f64) -> Self {
        Self {
            converged: false,
            cycle_of_convergence: None,
            limiting_partition: partition,
            residual_drift,
        }
    }

    /// Largest distance between the limiting partition and `expected`.
    ///
    /// `None` when the two partitions have different lengths.
    pub fn partition_error(&self, expected: &[f64]) -> Option<f64> {
        if expected.len() != self.limiting_partition.len() {
            return None;
        }
        Some(
            self.limiting_partition
                .iter()
                .zip(expected)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
        )
    }
}

/// How the line responded to a perturbation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Recovery {
    /// Cycle the perturbation fell in
    pub perturbed_cycle: u64,
    /// Largest drift observed from the perturbation onward
    pub peak_drift: f64,
    /// Cycle at which the largest drift was reached
    pub peak_cycle: Option<u64>,
    /// First cycle of convergence after the peak
    pub recovered_at: Option<u64>,
    pub cycles_to_recover: Option<u64>,
    /// Partition the line settled on after recovering
    pub partition: Vec<f64>,
}

/// A stable window found in a drift series.
struct StableWindow {
    /// Index into the boundary vectors of the cycle of convergence
    start: usize,
    residual: f64,
}

/// Reduces hand-off traces to convergence verdicts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceAnalyzer {
    tolerance: f64,
    window: usize,
}

impl ConvergenceAnalyzer {
    pub fn new(tolerance: f64, stability_window: usize) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "tolerance must be finite and positive, got {tolerance}"
            )));
        }
        if stability_window == 0 {
            return Err(Error::invalid_configuration(
                "stability window must be at least one cycle",
            ));
        }
        Ok(Self {
            tolerance,
            window: stability_window,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        Self::new(config.tolerance, config.stability_window)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn stability_window(&self) -> usize {
        self.window
    }

    /// Decide whether the trace's boundary vector converged.
    pub fn analyze(&self, trace: &[HandoffRecord]) -> ConvergenceVerdict {
        let vectors = boundary_vectors(trace);
        let drifts = drifts(&vectors);
        self.verdict(&vectors, &drifts, 0)
    }

    /// Measure the response to a perturbation that fell in `cycle`.
    pub fn recovery_after(&self, trace: &[HandoffRecord], cycle: u64) -> Recovery {
        let vectors = boundary_vectors(trace);
        let drifts = drifts(&vectors);

        let peak = drifts
            .iter()
            .enumerate()
            .filter(|(_, d)| d.from_cycle >= cycle)
            .fold(None, |best: Option<(usize, &Drift)>, (i, d)| match best {
                Some((_, b)) if b.drift >= d.drift => best,
                _ => Some((i, d)),
            });

        let Some((peak_index, peak)) = peak else {
            return Recovery {
                perturbed_cycle: cycle,
                peak_drift: 0.0,
                peak_cycle: None,
                recovered_at: None,
                cycles_to_recover: None,
                partition: vectors.last().map(BoundaryVector::positions).unwrap_or_default(),
            };
        };

        let verdict = self.verdict(&vectors, &drifts, peak_index + 1);
        Recovery {
            perturbed_cycle: cycle,
            peak_drift: peak.drift,
            peak_cycle: Some(peak.to_cycle),
            recovered_at: verdict.cycle_of_convergence,
            cycles_to_recover: verdict
                .cycle_of_convergence
                .map(|c| c.saturating_sub(cycle)),
            partition: verdict.limiting_partition,
        }
    }

    /// Verdict considering only windows that start at vector index `from`.
    fn verdict(&self, vectors: &[BoundaryVector], drifts: &[Drift], from: usize) -> ConvergenceVerdict {
        match self.first_stable_window(drifts, from) {
            Some(window) => ConvergenceVerdict {
                converged: true,
                cycle_of_convergence: Some(vectors[window.start].cycle),
                limiting_partition: mean_partition(&vectors[window.start + 1..=window.start + self.window]),
                residual_drift: window.residual,
            },
            None => {
                let tail = &drifts[drifts.len().saturating_sub(self.window)..];
                let residual = tail.iter().map(|d| d.drift).fold(0.0, f64::max);
                let partition = vectors.last().map(BoundaryVector::positions).unwrap_or_default();
                ConvergenceVerdict::unconverged(partition, residual)
            }
        }
    }

    fn first_stable_window(&self, drifts: &[Drift], from: usize) -> Option<StableWindow> {
        let mut run = 0;
        for (i, drift) in drifts.iter().enumerate().skip(from) {
            if !drift.is_stable(self.tolerance) {
                run = 0;
                continue;
            }
            run += 1;
            if run == self.window {
                let start = i + 1 - self.window;
                let residual = drifts[start..=i].iter().map(|d| d.drift).fold(0.0, f64::max);
                return Some(StableWindow { start, residual });
            }
        }
        None
    }
}

impl Default for ConvergenceAnalyzer {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            window: DEFAULT_STABILITY_WINDOW,
        }
    }
}

/// Analyse a trace with explicit parameters.
pub fn analyze(trace: &[HandoffRecord], tolerance: f64, stability_window: usize) -> Result<ConvergenceVerdict> {
    Ok(ConvergenceAnalyzer::new(tolerance, stability_window)?.analyze(trace))
}

/// Mean of aligned boundary vectors, sorted along the line.
fn mean_partition(vectors: &[BoundaryVector]) -> Vec<f64> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let count = vectors.len() as f64;
    let mut partition: Vec<f64> = (0..first.len())
        .map(|i| vectors.iter().map(|v| v.boundaries[i].1).sum::<f64>() / count)
        .collect();
    partition.sort_by(f64::total_cmp);
    partition
}
