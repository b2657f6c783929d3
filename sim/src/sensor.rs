//! Noisy sensor simulator.
//!
//! Generates one observation of the target per scan with:
//! - Gaussian noise with the same standard deviations the filter's
//!   observation model assumes
//! - Miss probability (1 - P_D)
//! - A fixed refresh rate, scans scheduled on the sensor's own clock

use crate::target::Target;
use models::{CartesianXY, PolarObservation};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// What the sensor measures. The payload doubles as the filter's
/// observation model, so the tracker is given the true noise levels.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SensorKind {
    /// z = [x, y]
    Cartesian(CartesianXY),
    /// z = [range, azimuth] from `radar_pos`
    Polar(PolarObservation),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensorParams {
    pub kind: SensorKind,
    /// Scans per second
    pub refresh_rate: f64,
    /// Probability the target is detected on a scan
    pub p_detection: f64,
}

impl SensorParams {
    pub fn scan_period(&self) -> f64 {
        1.0 / self.refresh_rate
    }
}

/// One recorded observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Scan time (s)
    pub time: f64,
    /// Measurement vector, layout given by `SensorKind`
    pub z: [f64; 2],
}

/// A sensor with its own scan schedule and random stream.
#[derive(Clone, Debug)]
pub struct SimSensor {
    pub params: SensorParams,
    /// Next scheduled scan time
    pub next_scan_time: f64,
    rng: ChaCha8Rng,
}

impl SimSensor {
    pub fn new(params: SensorParams, seed: u64) -> Self {
        Self {
            next_scan_time: params.scan_period(),
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Check if this sensor should fire at the current simulation time.
    pub fn should_scan(&self, t: f64) -> bool {
        t >= self.next_scan_time
    }

    /// Advance the schedule by one scan interval.
    pub fn advance_schedule(&mut self) {
        self.next_scan_time += self.params.scan_period();
    }

    /// Observe `target` at `time`. `None` on a missed detection.
    ///
    /// The detection draw is taken every scan so that the noise sequence
    /// only depends on the seed and the number of scans.
    pub fn scan(&mut self, target: &Target, time: f64) -> Option<Observation> {
        let detected = self.rng.gen::<f64>() < self.params.p_detection;
        let n0: f64 = self.rng.sample(StandardNormal);
        let n1: f64 = self.rng.sample(StandardNormal);
        if !detected {
            return None;
        }

        let (x, y) = target.pos_2d();
        let z = match &self.params.kind {
            SensorKind::Cartesian(m) => [x + n0 * m.sigma_x, y + n1 * m.sigma_y],
            SensorKind::Polar(m) => {
                let (range, azimuth) = m.cartesian_to_polar(x, y);
                [
                    range + n0 * m.sigma_r,
                    models::wrap_angle(azimuth + n1 * m.sigma_az),
                ]
            }
        };
        Some(Observation { time, z })
    }
}
