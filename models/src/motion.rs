//! Motion models: propagation `f(x, dt)` and process noise `Q`.
//!
//! # Models
//! - **Constant velocity** (4-state `[px, py, vx, vy]`), linear.
//! - **Coordinated turn** (5-state `[px, py, vx, vy, ω]`), nonlinear in ω.
//!   Falls back to a first-order expansion in ω near ω = 0.
//!
//! `Q` receives only the state and the absolute time, so both models size it
//! for a configured nominal step `nominal_dt` (the sensor period).

use ekf_core::{MotionModel, Real, StateCov, StateVec, VectorFunction};
use nalgebra::{Matrix4, SMatrix, SVector, Vector5};
use serde::{Deserialize, Serialize};

/// Below this turn rate the coordinated-turn model switches to its
/// small-angle expansion; the exact form divides by ω.
pub const MIN_TURN_RATE: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Constant Velocity
// ---------------------------------------------------------------------------

/// Constant-velocity model with discrete white-noise acceleration (DWNA).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstantVelocity {
    /// Acceleration noise std dev (m/s²). Higher = more manoeuvring allowed.
    pub process_noise_std: f64,
    /// Step length `Q` is sized for (s)
    pub nominal_dt: f64,
}

impl Default for ConstantVelocity {
    fn default() -> Self {
        Self {
            process_noise_std: 1.0,
            nominal_dt: 1.0,
        }
    }
}

impl ConstantVelocity {
    pub fn new(process_noise_std: f64, nominal_dt: f64) -> Self {
        Self {
            process_noise_std,
            nominal_dt,
        }
    }

    /// DWNA block: `q·[dt⁴/4, dt³/2; dt³/2, dt²]` per axis.
    pub fn dwna(q_std: f64, dt: f64) -> Matrix4<f64> {
        let q = q_std * q_std;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let mut qm = Matrix4::<f64>::zeros();
        for i in 0..2usize {
            qm[(i, i)] = q * dt4 / 4.0;
            qm[(i + 2, i + 2)] = q * dt2;
            qm[(i, i + 2)] = q * dt3 / 2.0;
            qm[(i + 2, i)] = q * dt3 / 2.0;
        }
        qm
    }
}

impl VectorFunction<f64, 4, 4> for ConstantVelocity {
    fn call<T: Real>(&self, x: &SVector<T, 4>, dt: f64) -> SVector<T, 4> {
        SVector::<T, 4>::new(x[0] + x[2] * dt, x[1] + x[3] * dt, x[2], x[3])
    }
}

impl MotionModel<4> for ConstantVelocity {
    fn process_noise(&self, _state: &StateVec<4>, _t: f64) -> StateCov<4> {
        Self::dwna(self.process_noise_std, self.nominal_dt)
    }
}

// ---------------------------------------------------------------------------
// Coordinated Turn
// ---------------------------------------------------------------------------

/// Coordinated turn with unknown, slowly varying turn rate ω.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatedTurn {
    /// Position process noise std (m)
    pub sigma_p: f64,
    /// Velocity process noise std (m/s)
    pub sigma_v: f64,
    /// Turn-rate process noise std (rad/s)
    pub sigma_omega: f64,
    /// Step length `Q` is sized for (s)
    pub nominal_dt: f64,
}

impl Default for CoordinatedTurn {
    fn default() -> Self {
        Self {
            sigma_p: 1.0,
            sigma_v: 1.0,
            sigma_omega: 0.01,
            nominal_dt: 1.0,
        }
    }
}

impl VectorFunction<f64, 5, 5> for CoordinatedTurn {
    fn call<T: Real>(&self, x: &SVector<T, 5>, dt: f64) -> SVector<T, 5> {
        let (px, py, vx, vy, omega) = (x[0], x[1], x[2], x[3], x[4]);
        if omega.value().abs() < MIN_TURN_RATE {
            // First order in ω: keeps ∂/∂ω non-zero so the filter can learn a turn.
            let half_dt2 = 0.5 * dt * dt;
            return Vector5::new(
                px + vx * dt - vy * omega * half_dt2,
                py + vy * dt + vx * omega * half_dt2,
                vx - vy * omega * dt,
                vy + vx * omega * dt,
                omega,
            );
        }
        let wt = omega * dt;
        let (s, c) = (wt.sin(), wt.cos());
        let one_minus_c = T::one() - c;
        Vector5::new(
            px + (vx * s - vy * one_minus_c) / omega,
            py + (vx * one_minus_c + vy * s) / omega,
            vx * c - vy * s,
            vx * s + vy * c,
            omega,
        )
    }
}

impl MotionModel<5> for CoordinatedTurn {
    fn process_noise(&self, _state: &StateVec<5>, _t: f64) -> StateCov<5> {
        let dt = self.nominal_dt;
        SMatrix::from_diagonal(&Vector5::new(
            self.sigma_p * self.sigma_p * dt,
            self.sigma_p * self.sigma_p * dt,
            self.sigma_v * self.sigma_v * dt,
            self.sigma_v * self.sigma_v * dt,
            self.sigma_omega * self.sigma_omega * dt,
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ekf_core::{evaluate, jacobian};

    /// Central-difference Jacobian, for cross-checking autodiff.
    fn numeric_jacobian<F, const N: usize>(f: &F, x: &SVector<f64, N>, dt: f64) -> SMatrix<f64, N, N>
    where
        F: VectorFunction<f64, N, N>,
    {
        let h = 1e-6;
        let mut j = SMatrix::<f64, N, N>::zeros();
        for col in 0..N {
            let (mut xp, mut xm) = (*x, *x);
            xp[col] += h;
            xm[col] -= h;
            let d = (evaluate(&xp, f, dt) - evaluate(&xm, f, dt)) / (2.0 * h);
            j.set_column(col, &d);
        }
        j
    }

    #[test]
    fn predict_constant_velocity() {
        let cv = ConstantVelocity::default();
        // Object at (0,0) moving at (10,0) m/s
        let state = SVector::<f64, 4>::new(0.0, 0.0, 10.0, 0.0);
        let next = evaluate(&state, &cv, 1.0);
        assert_abs_diff_eq!(next[0], 10.0, epsilon = 1e-9); // x moved
        assert_abs_diff_eq!(next[2], 10.0, epsilon = 1e-9); // vx unchanged
    }

    #[test]
    fn dwna_is_symmetric_and_scaled() {
        let q = ConstantVelocity::dwna(2.0, 0.5);
        assert_abs_diff_eq!(q, q.transpose());
        assert_abs_diff_eq!(q[(0, 0)], 4.0 * 0.0625 / 4.0);
        assert_abs_diff_eq!(q[(2, 2)], 4.0 * 0.25);
        assert_abs_diff_eq!(q[(0, 2)], 4.0 * 0.125 / 2.0);
        assert_eq!(q[(0, 1)], 0.0);
    }

    #[test]
    fn turn_jacobian_matches_finite_differences() {
        let ct = CoordinatedTurn::default();
        let x = SVector::<f64, 5>::new(100.0, -50.0, 30.0, 10.0, 0.2);
        let auto = jacobian(&x, &ct, 0.5);
        let numeric = numeric_jacobian(&ct, &x, 0.5);
        assert_abs_diff_eq!(auto, numeric, epsilon = 1e-5);
        // ∂vx'/∂ω = −dt·(vx·sin ωdt + vy·cos ωdt)
        let (s, c) = ((0.1f64).sin(), (0.1f64).cos());
        assert_abs_diff_eq!(auto[(2, 4)], -0.5 * (30.0 * s + 10.0 * c), epsilon = 1e-12);
    }

    #[test]
    fn quarter_turn_rotates_velocity() {
        let ct = CoordinatedTurn::default();
        let omega = std::f64::consts::FRAC_PI_2;
        let x = SVector::<f64, 5>::new(0.0, 0.0, 1.0, 0.0, omega);
        let next = evaluate(&x, &ct, 1.0);
        assert_abs_diff_eq!(next[2], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[3], 1.0, epsilon = 1e-12);
        // Arc of radius 1/ω ends at (1/ω, 1/ω)
        assert_abs_diff_eq!(next[0], 1.0 / omega, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 1.0 / omega, epsilon = 1e-12);
    }

    #[test]
    fn zero_turn_rate_moves_straight_but_keeps_omega_sensitivity() {
        let ct = CoordinatedTurn::default();
        let x = SVector::<f64, 5>::new(0.0, 0.0, 10.0, 5.0, 0.0);
        let j = jacobian(&x, &ct, 2.0);
        let next = evaluate(&x, &ct, 2.0);
        assert_abs_diff_eq!(next[0], 20.0);
        assert_abs_diff_eq!(next[1], 10.0);
        assert_eq!(j[(0, 2)], 2.0);
        // ∂px'/∂ω = −vy·dt²/2, ∂vx'/∂ω = −vy·dt
        assert_abs_diff_eq!(j[(0, 4)], -10.0);
        assert_abs_diff_eq!(j[(2, 4)], -10.0);
        assert_abs_diff_eq!(j[(3, 4)], 20.0);
    }

    #[test]
    fn small_angle_branch_is_continuous_with_exact_turn() {
        let ct = CoordinatedTurn::default();
        let below = SVector::<f64, 5>::new(0.0, 0.0, 10.0, 5.0, 0.99 * MIN_TURN_RATE);
        let above = SVector::<f64, 5>::new(0.0, 0.0, 10.0, 5.0, 1.01 * MIN_TURN_RATE);
        let a = evaluate(&below, &ct, 1.0);
        let b = evaluate(&above, &ct, 1.0);
        assert_abs_diff_eq!(a, b, epsilon = 1e-4);
    }
}
