//! Observation models: h(x), R, polar↔cartesian conversion.
//!
//! # Measurement types supported
//! - **Cartesian 2D**: z = [x, y], linear
//! - **Polar 2D**: z = [range, azimuth] from a fixed radar position
//!
//! Both work for any state layout starting with `[px, py, ..]`; `N < 2` is
//! rejected at compile time. Jacobians come from autodiff, not from here.

use ekf_core::{ObsCov, ObsVec, ObservationModel, Real, StateVec, VectorFunction};
use nalgebra::{Matrix2, SVector, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

// ---------------------------------------------------------------------------
// Cartesian 2D
// ---------------------------------------------------------------------------

/// Cartesian XY observation model (position pre-converted to x,y).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartesianXY {
    /// Std deviation in x (meters)
    pub sigma_x: f64,
    /// Std deviation in y (meters)
    pub sigma_y: f64,
}

impl CartesianXY {
    pub fn new(sigma_x: f64, sigma_y: f64) -> Self {
        Self { sigma_x, sigma_y }
    }
}

impl Default for CartesianXY {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl<const N: usize> VectorFunction<f64, N, 2> for CartesianXY {
    fn call<T: Real>(&self, x: &SVector<T, N>, _t: f64) -> SVector<T, 2> {
        const { assert!(N >= 2, "state must start with [px, py]") };
        Vector2::new(x[0], x[1])
    }
}

impl<const N: usize> ObservationModel<N, 2> for CartesianXY {
    fn observation_noise(&self, _state: &StateVec<N>, _t: f64) -> ObsCov<2> {
        Matrix2::from_diagonal(&Vector2::new(
            self.sigma_x * self.sigma_x,
            self.sigma_y * self.sigma_y,
        ))
    }
}

// ---------------------------------------------------------------------------
// Polar 2D (radar: range + azimuth)
// ---------------------------------------------------------------------------

/// Polar observation model for a ground-based 2D radar.
/// z = [range, azimuth], azimuth counter-clockwise from +x in (−π, π].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolarObservation {
    /// Radar position in world frame (x, y)
    pub radar_pos: [f64; 2],
    /// Range noise std dev (meters)
    pub sigma_r: f64,
    /// Azimuth noise std dev (radians)
    pub sigma_az: f64,
}

impl PolarObservation {
    pub fn new(radar_pos: [f64; 2], sigma_r: f64, sigma_az: f64) -> Self {
        Self {
            radar_pos,
            sigma_r,
            sigma_az,
        }
    }

    /// Convert polar [range, az] to cartesian [x, y] in the world frame.
    pub fn polar_to_cartesian(&self, range: f64, azimuth: f64) -> (f64, f64) {
        let x = self.radar_pos[0] + range * azimuth.cos();
        let y = self.radar_pos[1] + range * azimuth.sin();
        (x, y)
    }

    /// Compute [range, azimuth] of a world-frame point.
    pub fn cartesian_to_polar(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.radar_pos[0];
        let dy = y - self.radar_pos[1];
        (dx.hypot(dy), dy.atan2(dx))
    }
}

/// Wrap an angle into (−π, π].
pub fn wrap_angle(a: f64) -> f64 {
    let w = (a + PI).rem_euclid(TAU) - PI;
    if w == -PI {
        PI
    } else {
        w
    }
}

impl<const N: usize> VectorFunction<f64, N, 2> for PolarObservation {
    fn call<T: Real>(&self, x: &SVector<T, N>, _t: f64) -> SVector<T, 2> {
        const { assert!(N >= 2, "state must start with [px, py]") };
        let dx = x[0] - self.radar_pos[0];
        let dy = x[1] - self.radar_pos[1];
        Vector2::new(dx.hypot(dy), dy.atan2(dx))
    }
}

impl<const N: usize> ObservationModel<N, 2> for PolarObservation {
    fn observation_noise(&self, _state: &StateVec<N>, _t: f64) -> ObsCov<2> {
        Matrix2::from_diagonal(&Vector2::new(
            self.sigma_r * self.sigma_r,
            self.sigma_az * self.sigma_az,
        ))
    }

    /// Azimuth innovation wrapped to (−π, π] so a target crossing the ±π
    /// seam is not corrected by a full turn.
    fn residual(&self, z: &ObsVec<2>, predicted: &ObsVec<2>) -> ObsVec<2> {
        Vector2::new(z[0] - predicted[0], wrap_angle(z[1] - predicted[1]))
    }
}
