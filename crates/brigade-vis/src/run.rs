//! A simulated and analysed run, as held by the server.

use std::sync::Arc;

use brigade_convergence::{
    drift_series, fixed_point_partition, handoff_density, handoff_intervals, AnalysisConfig,
    ConvergenceAnalyzer, ConvergenceVerdict, Drift,
};
use brigade_sim::{simulate, HandoffRecord, Line, Result, RunConfig, RunOutput, WorkerId};
use serde::Serialize;

/// Bins of the hand-off position histogram.
pub const DENSITY_BINS: usize = 50;

/// Verdict plus the series a frontend plots next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictReport {
    pub verdict: ConvergenceVerdict,
    pub analysis: AnalysisConfig,
    pub drift: Vec<Drift>,
    /// Limiting partition for instantaneous walk-back
    pub fixed_point: Vec<f64>,
}

/// Hand-off timing and placement over the whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffStats {
    /// Per receiving worker, in rank order
    pub intervals: Vec<WorkerIntervals>,
    /// Hand-off counts over equal slices of the line, upstream first
    pub density: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerIntervals {
    pub worker: WorkerId,
    /// Time between successive hand-offs received
    pub intervals: Vec<f64>,
}

impl HandoffStats {
    pub fn compute(trace: &[HandoffRecord], line: &Line, workers: &[WorkerId]) -> Result<Self> {
        let intervals = workers
            .iter()
            .map(|&worker| WorkerIntervals {
                worker,
                intervals: handoff_intervals(trace, worker),
            })
            .collect();
        Ok(Self {
            intervals,
            density: handoff_density(trace, line, DENSITY_BINS)?,
        })
    }
}

/// Output of one run together with its convergence analysis.
#[derive(Debug, Clone)]
pub struct AnalyzedRun {
    pub config: RunConfig,
    pub output: Arc<RunOutput>,
    pub report: VerdictReport,
    pub stats: HandoffStats,
}

impl AnalyzedRun {
    /// Simulate `config` and analyse the hand-offs of its completed cycles.
    ///
    /// CPU bound; call from a blocking context.
    pub fn compute(config: RunConfig, analysis: AnalysisConfig) -> Result<Self> {
        let analyzer = ConvergenceAnalyzer::from_config(&analysis)?;
        let output = simulate(&config)?;

        let trace = output.completed_handoffs();
        let verdict = analyzer.analyze(trace);
        let drift = drift_series(trace);
        let mut specs = config.worker_specs();
        specs.sort_by_key(|s| s.id);
        let velocities: Vec<f64> = specs.iter().map(|s| s.base_velocity).collect();
        let line = config.line()?;
        let fixed_point = fixed_point_partition(&line, &velocities)?;
        let ids: Vec<WorkerId> = specs.iter().map(|s| s.id).collect();
        let stats = HandoffStats::compute(&output.handoffs, &line, &ids)?;

        tracing::info!(
            converged = verdict.converged,
            cycle = ?verdict.cycle_of_convergence,
            residual = verdict.residual_drift,
            "run analysed"
        );

        Ok(Self {
            config,
            output: Arc::new(output),
            report: VerdictReport {
                verdict,
                analysis,
                drift,
                fixed_point,
            },
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_workers_approach_fixed_point() {
        let analysis = AnalysisConfig {
            tolerance: 1e-3,
            stability_window: 5,
        };
        let run = AnalyzedRun::compute(RunConfig::two_workers(), analysis).unwrap();

        assert!(run.report.verdict.converged);
        assert_eq!(run.report.fixed_point.len(), 1);
        let error = run.report.verdict.partition_error(&run.report.fixed_point).unwrap();
        assert!(error < 1e-3);
        assert_eq!(run.report.drift.len(), 19);
    }

    #[test]
    fn stats_cover_every_worker_and_handoff() {
        let run = AnalyzedRun::compute(RunConfig::classic_three(), AnalysisConfig::default()).unwrap();
        let stats = &run.stats;

        let workers: Vec<u32> = stats.intervals.iter().map(|w| w.worker.rank()).collect();
        assert_eq!(workers, vec![1, 2, 3]);
        // Worker 1 only ever hands over.
        assert!(stats.intervals[0].intervals.is_empty());
        assert!(stats.intervals[1..].iter().all(|w| w.intervals.iter().all(|dt| *dt > 0.0)));

        assert_eq!(stats.density.len(), DENSITY_BINS);
        assert_eq!(stats.density.iter().sum::<usize>(), run.output.handoffs.len());
    }

    #[test]
    fn invalid_analysis_fails_before_simulating() {
        let analysis = AnalysisConfig {
            tolerance: 0.0,
            stability_window: 5,
        };
        let err = AnalyzedRun::compute(RunConfig::two_workers(), analysis).unwrap_err();
        assert_eq!(err.kind(), "invalid_configuration");
    }
}
