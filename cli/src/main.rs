//! `ekf-cli`: Jacobian self-check, scenario runs, Monte-Carlo batches, replay.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ekf_core::{jacobian, CovarianceForm, FilterMetrics, Real, TrackerConfig, VectorFunction};
use models::PolarObservation;
use nalgebra::{Matrix2x4, Matrix3x2, Matrix4x2, SMatrix, SVector, Vector2, Vector3, Vector4};
use rayon::prelude::*;
use serde::Serialize;
use sim::replay::{load_replay, save_replay};
use sim::runner::{self, RunConfig};
use sim::scenarios::{Scenario, ScenarioKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ekf-cli", about = "Autodiff EKF harness")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare autodiff Jacobians with hand-derived ones on reference functions.
    JacobianCheck,
    /// Run a named scenario in batch mode and output metrics.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Use the Joseph covariance update
        #[arg(long)]
        joseph: bool,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the full replay log
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Run many seeds of a scenario in parallel and pool the metrics.
    MonteCarlo {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        #[arg(long, default_value_t = 100)]
        runs: u64,
        /// Seed of the first run; run `i` uses `seed + i`
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        joseph: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Load and replay a previously recorded scenario log.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        #[arg(long)]
        joseph: bool,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Log level selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Verbosity {
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Warn,
            1 => Verbosity::Info,
            2 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

fn init_tracing(verbosity: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(Verbosity::from_count(cli.verbose));

    match cli.command {
        Commands::JacobianCheck => jacobian_check()?,
        Commands::RunScenario {
            scenario,
            seed,
            joseph,
            output,
            save_replay: save_path,
        } => {
            run_scenario(
                scenario,
                seed,
                &run_config(joseph),
                output.as_deref(),
                save_path.as_deref(),
            )?;
        }
        Commands::MonteCarlo {
            scenario,
            runs,
            seed,
            joseph,
            output,
        } => {
            monte_carlo(scenario, runs, seed, &run_config(joseph), output.as_deref())?;
        }
        Commands::Replay {
            input,
            joseph,
            output,
        } => {
            run_replay(&input, &run_config(joseph), output.as_deref())?;
        }
    }

    Ok(())
}

fn run_config(joseph: bool) -> RunConfig {
    let covariance_form = if joseph {
        CovarianceForm::Joseph
    } else {
        CovarianceForm::Standard
    };
    RunConfig {
        tracker: TrackerConfig { covariance_form },
        ..RunConfig::default()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("Metrics saved to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// jacobian-check
// ---------------------------------------------------------------------------

/// `[x0², x1·x0, x1², cos(x0)·exp(x1)]`
struct MixedProducts;

impl VectorFunction<(), 2, 4> for MixedProducts {
    fn call<T: Real>(&self, x: &SVector<T, 2>, _: ()) -> SVector<T, 4> {
        Vector4::new(x[0] * x[0], x[1] * x[0], x[1] * x[1], x[0].cos() * x[1].exp())
    }
}

/// `[x0²/2, x1·c, x0·x1·c]`, `c` passed through untouched
struct ScaledProducts;

impl VectorFunction<f64, 2, 3> for ScaledProducts {
    fn call<T: Real>(&self, x: &SVector<T, 2>, c: f64) -> SVector<T, 3> {
        Vector3::new(x[0] * x[0] * 0.5, x[1] * c, x[0] * x[1] * c)
    }
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    error_norm: f64,
}

fn compare<const R: usize, const C: usize>(
    name: &'static str,
    auto: SMatrix<f64, R, C>,
    analytic: SMatrix<f64, R, C>,
) -> CheckResult {
    let error_norm = (auto - analytic).norm();
    println!("{name}\n  autodiff:{auto}  analytic:{analytic}  ‖Δ‖ = {error_norm:e}");
    CheckResult { name, error_norm }
}

fn jacobian_checks() -> Vec<CheckResult> {
    let (x0, x1) = (10.0_f64, -5.0_f64);
    let x = Vector2::new(x0, x1);

    #[rustfmt::skip]
    let mixed = Matrix4x2::new(
        2.0 * x0,                 0.0,
        x1,                       x0,
        0.0,                      2.0 * x1,
        -x0.sin() * x1.exp(),     x0.cos() * x1.exp(),
    );

    let c = 3.0;
    #[rustfmt::skip]
    let scaled = Matrix3x2::new(
        x0,     0.0,
        0.0,    c,
        x1 * c, x0 * c,
    );

    let radar = PolarObservation::new([10.0, -20.0], 1.0, 0.01);
    let state = Vector4::new(310.0, 380.0, 5.0, -3.0);
    let (dx, dy) = (300.0_f64, 400.0_f64);
    let r2 = dx * dx + dy * dy;
    let r = r2.sqrt();
    #[rustfmt::skip]
    let polar = Matrix2x4::new(
        dx / r,   dy / r,  0.0, 0.0,
        -dy / r2, dx / r2, 0.0, 0.0,
    );

    vec![
        compare("mixed products at (10, -5)", jacobian(&x, &MixedProducts, ()), mixed),
        compare("scaled products at (10, -5), c = 3", jacobian(&x, &ScaledProducts, c), scaled),
        compare("polar observation", jacobian(&state, &radar, 0.0), polar),
    ]
}

fn jacobian_check() -> Result<()> {
    let results = jacobian_checks();
    let worst = results.iter().map(|r| r.error_norm).fold(0.0, f64::max);
    debug!(?results, "jacobian checks done");
    if worst > 1e-12 {
        bail!("autodiff Jacobian differs from analytic by {worst:e}");
    }
    println!("All Jacobians agree (worst ‖Δ‖ = {worst:e})");
    Ok(())
}

// ---------------------------------------------------------------------------
// run-scenario / monte-carlo / replay
// ---------------------------------------------------------------------------

fn run_scenario(
    kind: ScenarioKind,
    seed: u64,
    config: &RunConfig,
    output_path: Option<&Path>,
    replay_path: Option<&Path>,
) -> Result<()> {
    let scenario = Scenario::build(kind, seed);
    println!(
        "Running scenario '{}' (seed={}, duration={:.0}s)...",
        scenario.name, seed, scenario.duration
    );

    let start = std::time::Instant::now();
    let log = runner::record(&scenario)?;
    let summary = runner::replay(&log, config)?;
    let elapsed = start.elapsed();

    let metrics = summary.summary();
    println!(
        "Done: {} observations, {} updates, {} rejected, elapsed={:.3}s",
        summary.observations,
        metrics.steps,
        metrics.rejected,
        elapsed.as_secs_f64(),
    );
    println!(
        "RMSE pos={:.2} m vel={:.2} m/s, mean NEES={:.2}, mean NIS={:.2}",
        metrics.rmse_position, metrics.rmse_velocity, metrics.mean_nees, metrics.mean_nis,
    );

    if let Some(rpath) = replay_path {
        save_replay(&log, rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": summary.scenario,
            "seed": seed,
            "elapsed_s": elapsed.as_secs_f64(),
            "metrics": metrics,
            "final_state": summary.final_state,
            "track": summary.track,
        });
        write_json(opath, &json)?;
    }

    Ok(())
}

fn monte_carlo(
    kind: ScenarioKind,
    runs: u64,
    first_seed: u64,
    config: &RunConfig,
    output_path: Option<&Path>,
) -> Result<()> {
    if runs == 0 {
        bail!("--runs must be at least 1");
    }
    info!(?kind, runs, first_seed, "monte-carlo start");
    let start = std::time::Instant::now();

    let summaries = (0..runs)
        .into_par_iter()
        .map(|i| {
            let seed = first_seed.wrapping_add(i);
            runner::run_scenario(&Scenario::build(kind, seed), config)
                .with_context(|| format!("run with seed {seed}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut pooled = FilterMetrics::default();
    for s in &summaries {
        pooled.merge(&s.metrics);
    }
    let metrics = pooled.summary();
    let elapsed = start.elapsed();

    println!(
        "{} runs of '{}' in {:.2}s: {} updates, {} rejected",
        runs,
        summaries.first().map_or("", |s| s.scenario.as_str()),
        elapsed.as_secs_f64(),
        metrics.steps,
        metrics.rejected,
    );
    println!(
        "Pooled RMSE pos={:.2} m vel={:.2} m/s, mean NEES={:.2} (ideal 4), mean NIS={:.2} (ideal 2)",
        metrics.rmse_position, metrics.rmse_velocity, metrics.mean_nees, metrics.mean_nis,
    );

    if let Some(opath) = output_path {
        let per_run: Vec<_> = summaries
            .iter()
            .map(|s| serde_json::json!({ "seed": s.seed, "metrics": s.summary() }))
            .collect();
        let json = serde_json::json!({
            "scenario": kind,
            "runs": runs,
            "first_seed": first_seed,
            "elapsed_s": elapsed.as_secs_f64(),
            "pooled": metrics,
            "per_run": per_run,
        });
        write_json(opath, &json)?;
    }

    Ok(())
}

fn run_replay(input: &Path, config: &RunConfig, output_path: Option<&Path>) -> Result<()> {
    let log = load_replay(input)?;
    println!(
        "Replaying '{}' ({} observations)...",
        log.scenario.name,
        log.observations.len()
    );

    let start = std::time::Instant::now();
    let summary = runner::replay(&log, config)?;
    let elapsed = start.elapsed();
    let metrics = summary.summary();

    println!(
        "Replay done: {} updates, {} rejected, RMSE pos={:.2} m, elapsed={:.3}s",
        metrics.steps,
        metrics.rejected,
        metrics.rmse_position,
        elapsed.as_secs_f64()
    );

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": summary.scenario,
            "seed": summary.seed,
            "elapsed_s": elapsed.as_secs_f64(),
            "metrics": metrics,
            "final_state": summary.final_state,
        });
        write_json(opath, &json)?;
    }

    Ok(())
}
