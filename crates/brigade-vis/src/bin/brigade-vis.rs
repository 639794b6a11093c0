//! Bucket Brigade Visualization Server
//!
//! Run a scenario and serve it over the JSON/WebSocket API.
//!
//! Usage: `brigade-vis [scenario] [port]`, where `scenario` is a preset name
//! or a path to a JSON run configuration.

use brigade_convergence::AnalysisConfig;
use brigade_vis::{AnalyzedRun, VisConfig, VisServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brigade_vis=info,brigade_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = VisConfig::from_env()?.with_args(std::env::args().skip(1))?;
    let run_config = config.load_scenario()?;

    println!("Bucket Brigade Visualizer");
    println!("=========================");
    println!();
    println!("Scenario: {}", config.scenario);
    println!("Workers:  {}", run_config.workers.len());
    println!();

    let run = tokio::task::spawn_blocking(move || {
        AnalyzedRun::compute(run_config, AnalysisConfig::default())
    })
    .await??;

    let summary = run.output.summary;
    let verdict = &run.report.verdict;
    println!("Simulation complete:");
    println!("  Cycles:    {}", summary.cycles_completed);
    println!("  Hand-offs: {}", summary.handoffs);
    println!("  Time:      {:.3}", summary.final_time);
    match verdict.cycle_of_convergence {
        Some(cycle) => println!("  Converged at cycle {cycle} to {:?}", verdict.limiting_partition),
        None => println!("  Not converged (residual drift {:.3e})", verdict.residual_drift),
    }
    println!();
    println!("Starting visualization server on http://{}", config.addr);
    println!();

    VisServer::new(run).serve(config.addr).await?;

    Ok(())
}
