//! Batch runner: simulate a scenario, then drive the tracker over the record.
//!
//! Recording and filtering are split so a saved [`ReplayLog`] re-runs through
//! exactly the same path as a fresh simulation.
//!
//! The tracker is initialized from the first observation: position from the
//! measurement, velocity and turn rate at zero with the configured spreads.
//! Rejected updates are logged and counted, the run continues.

use crate::replay::{GroundTruthFrame, ReplayLog};
use crate::scenarios::{FilterModel, Scenario};
use crate::sensor::{SensorKind, SimSensor};
use anyhow::{ensure, Context};
use ekf_core::{
    EkfTracker, FilterMetrics, MetricsSummary, MotionModel, ObservationModel, StateCov, StateVec,
    TrackerConfig,
};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Tracker-side settings for a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub tracker: TrackerConfig,
    /// Initial velocity std dev per axis (m/s)
    pub velocity_std: f64,
    /// Initial turn-rate std dev (rad/s), coordinated-turn filters only
    pub turn_rate_std: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            velocity_std: 30.0,
            turn_rate_std: 0.05,
        }
    }
}

/// Filter output after one accepted update.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: f64,
    pub state: Vec<f64>,
    pub nis: f64,
}

/// Outcome of one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub scenario: String,
    pub seed: u64,
    /// Observations fed to the tracker, the initializing one included
    pub observations: usize,
    pub metrics: FilterMetrics,
    /// Final state estimate; empty when nothing was observed
    pub final_state: Vec<f64>,
    pub final_time: Option<f64>,
    /// One point per accepted update
    pub track: Vec<TrackPoint>,
}

impl RunSummary {
    pub fn summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }
}

/// Simulate ground truth and sensor output for `scenario`.
pub fn record(scenario: &Scenario) -> anyhow::Result<ReplayLog> {
    ensure!(
        scenario.sim_dt.is_finite()
            && scenario.duration.is_finite()
            && scenario.sim_dt > 0.0
            && scenario.duration > 0.0,
        "scenario '{}': sim_dt and duration must be finite and positive",
        scenario.name
    );
    ensure!(
        scenario.sensor.refresh_rate > 0.0,
        "scenario '{}': sensor refresh rate must be positive",
        scenario.name
    );

    let dt = scenario.sim_dt;
    let n_steps = (scenario.duration / dt).round() as u64;
    let mut target = scenario.target.clone();
    let mut sensor = SimSensor::new(scenario.sensor.clone(), scenario.seed);
    let mut observations = Vec::new();
    let mut ground_truth = Vec::new();

    for k in 0..n_steps {
        // Index-based clock, so scan times do not drift with summation error
        target.step(k as f64 * dt, dt);
        let now = (k + 1) as f64 * dt;

        if !sensor.should_scan(now) {
            continue;
        }
        sensor.advance_schedule();
        ground_truth.push(GroundTruthFrame {
            time: now,
            state: target.state,
            turn_rate: target.motion.turn_rate_at(now),
        });
        if let Some(obs) = sensor.scan(&target, now) {
            observations.push(obs);
        }
    }

    debug!(
        scenario = %scenario.name,
        scans = ground_truth.len(),
        detections = observations.len(),
        "scenario recorded"
    );
    Ok(ReplayLog {
        scenario: scenario.clone(),
        observations,
        ground_truth,
    })
}

/// Run the tracker over a recorded log and score it against ground truth.
pub fn replay(log: &ReplayLog, config: &RunConfig) -> anyhow::Result<RunSummary> {
    match (&log.scenario.filter, &log.scenario.sensor.kind) {
        (FilterModel::ConstantVelocity(motion), SensorKind::Cartesian(obs)) => {
            track::<_, _, 4>(log, motion, obs, config)
        }
        (FilterModel::ConstantVelocity(motion), SensorKind::Polar(obs)) => {
            track::<_, _, 4>(log, motion, obs, config)
        }
        (FilterModel::CoordinatedTurn(motion), SensorKind::Cartesian(obs)) => {
            track::<_, _, 5>(log, motion, obs, config)
        }
        (FilterModel::CoordinatedTurn(motion), SensorKind::Polar(obs)) => {
            track::<_, _, 5>(log, motion, obs, config)
        }
    }
}

/// `record` followed by `replay`.
pub fn run_scenario(scenario: &Scenario, config: &RunConfig) -> anyhow::Result<RunSummary> {
    let log = record(scenario)?;
    replay(&log, config)
}

/// Initial position and per-axis position variance from one observation.
fn initial_position(kind: &SensorKind, z: &[f64; 2]) -> ([f64; 2], [f64; 2]) {
    match kind {
        SensorKind::Cartesian(m) => ([z[0], z[1]], [m.sigma_x.powi(2), m.sigma_y.powi(2)]),
        SensorKind::Polar(m) => {
            let (x, y) = m.polar_to_cartesian(z[0], z[1]);
            let var = m.sigma_r.powi(2) + (z[0] * m.sigma_az).powi(2);
            ([x, y], [var, var])
        }
    }
}

fn track<MM, OM, const N: usize>(
    log: &ReplayLog,
    motion: &MM,
    observation: &OM,
    config: &RunConfig,
) -> anyhow::Result<RunSummary>
where
    MM: MotionModel<N>,
    OM: ObservationModel<N, 2>,
{
    let scenario = &log.scenario;
    let mut tracker = EkfTracker::with_config(motion, observation, config.tracker.clone());
    let mut metrics = FilterMetrics::default();
    let mut points = Vec::new();

    let mut observations = log.observations.iter();
    if let Some(first) = observations.next() {
        let (pos, var) = initial_position(&scenario.sensor.kind, &first.z);
        let x0 = StateVec::<N>::from_fn(|i, _| if i < 2 { pos[i] } else { 0.0 });
        let p0 = StateCov::<N>::from_diagonal(&StateVec::<N>::from_fn(|i, _| match i {
            0 | 1 => var[i],
            2 | 3 => config.velocity_std.powi(2),
            _ => config.turn_rate_std.powi(2),
        }));
        tracker.initialize(x0, p0, first.time);
    } else {
        warn!(scenario = %scenario.name, "no observations, tracker never initialized");
    }

    for obs in observations {
        let z = Vector2::new(obs.z[0], obs.z[1]);
        match tracker.update(&z, obs.time) {
            Ok(report) => {
                let truth = log
                    .truth_at(obs.time)
                    .with_context(|| format!("no ground truth at t={}", obs.time))?;
                if let Some(estimate) = tracker.estimate() {
                    metrics.accumulate(estimate, &truth.state, report.correction.nis);
                    points.push(TrackPoint {
                        time: estimate.time,
                        state: estimate.state.iter().copied().collect(),
                        nis: report.correction.nis,
                    });
                }
            }
            Err(err) => {
                warn!(time = obs.time, %err, "update rejected");
                metrics.reject();
            }
        }
    }

    debug!(
        scenario = %scenario.name,
        steps = metrics.n_steps,
        rejected = metrics.n_rejected,
        rmse_position = metrics.rmse_position(),
        "run finished"
    );
    Ok(RunSummary {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        observations: log.observations.len(),
        final_state: tracker
            .state()
            .map(|x| x.iter().copied().collect())
            .unwrap_or_default(),
        final_time: tracker.time(),
        metrics,
        track: points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioKind;
    use ekf_core::CovarianceForm;

    #[test]
    fn same_seed_is_deterministic() {
        let scenario = Scenario::build(ScenarioKind::Radar, 11);
        let a = run_scenario(&scenario, &RunConfig::default()).unwrap();
        let b = run_scenario(&scenario, &RunConfig::default()).unwrap();
        assert_eq!(a.final_state, b.final_state);
        assert_eq!(a.metrics.sum_nis, b.metrics.sum_nis);
        assert_eq!(a.metrics.n_steps, b.metrics.n_steps);

        let c = run_scenario(&Scenario::build(ScenarioKind::Radar, 12), &RunConfig::default())
            .unwrap();
        assert_ne!(a.final_state, c.final_state);
    }

    #[test]
    fn record_samples_truth_every_scan() {
        let scenario = Scenario::build(ScenarioKind::Straight, 3);
        let log = record(&scenario).unwrap();
        // 1 Hz over 120 s
        assert_eq!(log.ground_truth.len(), 120);
        assert!(log.observations.len() <= 120);
        assert!(log.observations.len() > 90);
        for obs in &log.observations {
            assert!(log.truth_at(obs.time).is_some());
        }
        let last = log.ground_truth.last().unwrap();
        assert!((last.state[0] - (-1000.0 + 15.0 * 120.0)).abs() < 1e-6);
    }

    #[test]
    fn straight_scenario_converges() {
        let summary =
            run_scenario(&Scenario::build(ScenarioKind::Straight, 42), &RunConfig::default())
                .unwrap();
        let m = summary.summary();
        assert_eq!(m.rejected, 0);
        // Raw sensor position error is 5·√2 ≈ 7.1 m
        assert!(m.rmse_position < 7.0, "rmse {}", m.rmse_position);
        assert!(m.mean_nees.is_finite() && m.mean_nees < 10.0, "nees {}", m.mean_nees);
        assert_eq!(summary.final_state.len(), 4);
    }

    fn mean_turn_rate(summary: &RunSummary, from: f64, to: f64) -> f64 {
        let window: Vec<f64> = summary
            .track
            .iter()
            .filter(|p| p.time >= from && p.time < to)
            .map(|p| p.state[4])
            .collect();
        window.iter().sum::<f64>() / window.len() as f64
    }

    #[test]
    fn turning_scenario_learns_turn_rate() {
        let summary =
            run_scenario(&Scenario::build(ScenarioKind::Turning, 5), &RunConfig::default())
                .unwrap();
        assert_eq!(summary.metrics.n_rejected, 0);
        assert_eq!(summary.track.len() as u64, summary.metrics.n_steps);
        assert!(summary.summary().rmse_position < 25.0);

        // Turn runs from 40 s to 70 s
        let truth = std::f64::consts::FRAC_PI_2 / 30.0;
        let turning = mean_turn_rate(&summary, 50.0, 70.0);
        assert!((turning - truth).abs() < 0.3 * truth, "omega {turning}");
        let after = mean_turn_rate(&summary, 90.0, 110.0);
        assert!(after.abs() < 0.2 * truth, "omega {after}");
    }

    #[test]
    fn radar_scenario_tracks_with_joseph_form() {
        let config = RunConfig {
            tracker: TrackerConfig {
                covariance_form: CovarianceForm::Joseph,
            },
            ..RunConfig::default()
        };
        let summary = run_scenario(&Scenario::build(ScenarioKind::Radar, 8), &config).unwrap();
        let m = summary.summary();
        assert_eq!(m.rejected, 0);
        assert!(m.rmse_position < 40.0, "rmse {}", m.rmse_position);
        assert!(m.mean_nis.is_finite());
    }

    #[test]
    fn non_finite_timing_is_rejected() {
        let mut scenario = Scenario::build(ScenarioKind::Straight, 1);
        scenario.duration = f64::INFINITY;
        let err = record(&scenario).unwrap_err();
        assert!(err.to_string().contains("finite and positive"));

        let mut scenario = Scenario::build(ScenarioKind::Straight, 1);
        scenario.sim_dt = f64::NAN;
        assert!(record(&scenario).is_err());
    }

    #[test]
    fn empty_log_yields_empty_summary() {
        let mut log = record(&Scenario::build(ScenarioKind::Straight, 1)).unwrap();
        log.observations.clear();
        let summary = replay(&log, &RunConfig::default()).unwrap();
        assert!(summary.final_state.is_empty());
        assert_eq!(summary.final_time, None);
        assert_eq!(summary.metrics.n_steps, 0);
    }
}
