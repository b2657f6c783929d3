//! Scenario definitions.
//!
//! Each scenario is a named configuration of one target, one sensor and the
//! filter models the tracker should run with. All scenarios are deterministic
//! given the same seed.

use crate::{
    sensor::{SensorKind, SensorParams},
    target::{MotionSpec, Target},
};
use models::{CartesianXY, ConstantVelocity, CoordinatedTurn, PolarObservation};
use serde::{Deserialize, Serialize};

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Straight flight, cartesian sensor, constant-velocity filter
    Straight,
    /// Straight, 90° turn, straight; cartesian sensor, coordinated-turn filter
    Turning,
    /// Slow continuous turn seen by a range/azimuth radar, coordinated-turn filter
    Radar,
}

/// Motion model the tracker runs with.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FilterModel {
    ConstantVelocity(ConstantVelocity),
    CoordinatedTurn(CoordinatedTurn),
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    /// Seconds
    pub duration: f64,
    /// Ground-truth integration step (s)
    pub sim_dt: f64,
    pub target: Target,
    pub sensor: SensorParams,
    pub filter: FilterModel,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::Straight => Self::straight(seed),
            ScenarioKind::Turning => Self::turning(seed),
            ScenarioKind::Radar => Self::radar(seed),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 1: Straight
    // -----------------------------------------------------------------------
    fn straight(seed: u64) -> Self {
        let sensor = SensorParams {
            kind: SensorKind::Cartesian(CartesianXY::new(5.0, 5.0)),
            refresh_rate: 1.0,
            p_detection: 0.9,
        };
        Scenario {
            name: "straight".into(),
            seed,
            duration: 120.0,
            sim_dt: 0.1,
            target: Target::new([-1000.0, 500.0], [15.0, -5.0], MotionSpec::ConstantVelocity),
            filter: FilterModel::ConstantVelocity(ConstantVelocity::new(0.5, sensor.scan_period())),
            sensor,
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 2: Turning
    // -----------------------------------------------------------------------
    fn turning(seed: u64) -> Self {
        // 90° over 30 s
        let omega = std::f64::consts::FRAC_PI_2 / 30.0;
        let motion = MotionSpec::Segmented {
            segments: vec![
                (40.0, Box::new(MotionSpec::ConstantTurn { omega })),
                (70.0, Box::new(MotionSpec::ConstantVelocity)),
            ],
        };
        let sensor = SensorParams {
            kind: SensorKind::Cartesian(CartesianXY::new(10.0, 10.0)),
            refresh_rate: 1.0,
            p_detection: 0.95,
        };
        let filter = CoordinatedTurn {
            sigma_p: 1.0,
            sigma_v: 2.0,
            sigma_omega: 0.02,
            nominal_dt: sensor.scan_period(),
        };
        Scenario {
            name: "turning".into(),
            seed,
            duration: 110.0,
            sim_dt: 0.1,
            target: Target::new([0.0, 0.0], [25.0, 0.0], motion),
            filter: FilterModel::CoordinatedTurn(filter),
            sensor,
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 3: Radar
    // -----------------------------------------------------------------------
    fn radar(seed: u64) -> Self {
        let sensor = SensorParams {
            kind: SensorKind::Polar(PolarObservation::new([0.0, 0.0], 10.0, 0.002)),
            refresh_rate: 0.5,
            p_detection: 0.9,
        };
        let filter = CoordinatedTurn {
            sigma_p: 2.0,
            sigma_v: 2.0,
            sigma_omega: 0.005,
            nominal_dt: sensor.scan_period(),
        };
        Scenario {
            name: "radar".into(),
            seed,
            duration: 300.0,
            sim_dt: 0.1,
            target: Target::new(
                [6000.0, 2000.0],
                [-40.0, 20.0],
                MotionSpec::ConstantTurn { omega: 0.004 },
            ),
            filter: FilterModel::CoordinatedTurn(filter),
            sensor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn every_kind_builds_a_consistent_scenario() {
        for kind in ScenarioKind::value_variants() {
            let s = Scenario::build(*kind, 1);
            assert!(s.duration > 0.0 && s.sim_dt > 0.0);
            assert!(s.sensor.scan_period() >= s.sim_dt);
            assert!(s.sensor.p_detection > 0.0 && s.sensor.p_detection <= 1.0);
            let q_dt = match &s.filter {
                FilterModel::ConstantVelocity(m) => m.nominal_dt,
                FilterModel::CoordinatedTurn(m) => m.nominal_dt,
            };
            assert_eq!(q_dt, s.sensor.scan_period());
        }
    }

    #[test]
    fn scenario_names_match_cli_values() {
        for kind in ScenarioKind::value_variants() {
            let name = kind.to_possible_value().unwrap().get_name().to_owned();
            assert_eq!(Scenario::build(*kind, 0).name, name);
        }
    }
}
