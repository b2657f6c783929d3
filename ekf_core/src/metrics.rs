//! Filter accuracy and consistency metrics: RMSE, NEES, NIS.
//!
//! Assumes the state layout starts with `[px, py, vx, vy]`; any further
//! components (turn rate, biases, ...) are ignored.
//!
//! For a consistent filter the mean NEES approaches 4 (the kinematic block
//! dimension) and the mean NIS approaches the observation dimension.

use crate::types::Estimate;
use serde::{Deserialize, Serialize};

/// Ground-truth kinematic state `[px, py, vx, vy]`.
pub type Kinematics = [f64; 4];

/// Accumulated metric statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FilterMetrics {
    /// Number of accepted updates evaluated
    pub n_steps: u64,
    /// Updates the tracker refused (singular S, non-finite result)
    pub n_rejected: u64,
    /// Sum of squared position errors (for RMSE)
    pub sum_sq_pos_err: f64,
    /// Sum of squared velocity errors (for RMSE)
    pub sum_sq_vel_err: f64,
    /// Sum of normalized estimation error squared over the kinematic block
    pub sum_nees: f64,
    /// Steps where the kinematic covariance block was not invertible
    pub n_nees_skipped: u64,
    /// Sum of normalized innovation squared
    pub sum_nis: f64,
}

/// Derived figures, for reports and JSON output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub steps: u64,
    pub rejected: u64,
    pub rmse_position: f64,
    pub rmse_velocity: f64,
    pub mean_nees: f64,
    pub mean_nis: f64,
}

impl FilterMetrics {
    /// Root-mean-square position error.
    pub fn rmse_position(&self) -> f64 {
        if self.n_steps == 0 {
            return 0.0;
        }
        (self.sum_sq_pos_err / self.n_steps as f64).sqrt()
    }

    /// Root-mean-square velocity error.
    pub fn rmse_velocity(&self) -> f64 {
        if self.n_steps == 0 {
            return 0.0;
        }
        (self.sum_sq_vel_err / self.n_steps as f64).sqrt()
    }

    pub fn mean_nees(&self) -> f64 {
        let n = self.n_steps.saturating_sub(self.n_nees_skipped);
        if n == 0 {
            return 0.0;
        }
        self.sum_nees / n as f64
    }

    pub fn mean_nis(&self) -> f64 {
        if self.n_steps == 0 {
            return 0.0;
        }
        self.sum_nis / self.n_steps as f64
    }

    /// Accumulate one accepted update.
    pub fn accumulate<const N: usize>(&mut self, estimate: &Estimate<N>, truth: &Kinematics, nis: f64) {
        const { assert!(N >= 4, "metrics need a [px, py, vx, vy, ..] state") };

        let err = nalgebra::Vector4::from_fn(|r, _| estimate.state[r] - truth[r]);
        self.sum_sq_pos_err += err[0] * err[0] + err[1] * err[1];
        self.sum_sq_vel_err += err[2] * err[2] + err[3] * err[3];

        let block = estimate.cov.fixed_view::<4, 4>(0, 0).into_owned();
        match block.try_inverse() {
            Some(inv) => self.sum_nees += err.dot(&(inv * err)),
            None => self.n_nees_skipped += 1,
        }

        self.sum_nis += nis;
        self.n_steps += 1;
    }

    /// Count an update the tracker refused.
    pub fn reject(&mut self) {
        self.n_rejected += 1;
    }

    /// Fold another run's statistics into this one.
    pub fn merge(&mut self, other: &FilterMetrics) {
        self.n_steps += other.n_steps;
        self.n_rejected += other.n_rejected;
        self.sum_sq_pos_err += other.sum_sq_pos_err;
        self.sum_sq_vel_err += other.sum_sq_vel_err;
        self.sum_nees += other.sum_nees;
        self.n_nees_skipped += other.n_nees_skipped;
        self.sum_nis += other.sum_nis;
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            steps: self.n_steps,
            rejected: self.n_rejected,
            rmse_position: self.rmse_position(),
            rmse_velocity: self.rmse_velocity(),
            mean_nees: self.mean_nees(),
            mean_nis: self.mean_nis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix4, SMatrix, SVector, Vector4};

    #[test]
    fn empty_metrics_are_zero() {
        let m = FilterMetrics::default();
        assert_eq!(m.rmse_position(), 0.0);
        assert_eq!(m.mean_nees(), 0.0);
        assert_eq!(m.mean_nis(), 0.0);
    }

    #[test]
    fn errors_and_nees_accumulate() {
        let mut m = FilterMetrics::default();
        let est = Estimate::new(Vector4::new(3.0, 4.0, 1.0, 0.0), Matrix4::identity() * 2.0, 0.0);
        m.accumulate(&est, &[0.0, 0.0, 0.0, 0.0], 1.5);

        assert_abs_diff_eq!(m.rmse_position(), 5.0);
        assert_abs_diff_eq!(m.rmse_velocity(), 1.0);
        // (9 + 16 + 1) / 2
        assert_abs_diff_eq!(m.mean_nees(), 13.0);
        assert_abs_diff_eq!(m.mean_nis(), 1.5);
    }

    #[test]
    fn extra_state_components_are_ignored() {
        let mut m = FilterMetrics::default();
        let state = SVector::<f64, 5>::new(1.0, 0.0, 0.0, 0.0, 99.0);
        let est = Estimate::new(state, SMatrix::<f64, 5, 5>::identity(), 0.0);
        m.accumulate(&est, &[0.0; 4], 0.0);
        assert_abs_diff_eq!(m.mean_nees(), 1.0);
    }

    #[test]
    fn singular_block_skips_nees_only() {
        let mut m = FilterMetrics::default();
        let est = Estimate::new(Vector4::new(1.0, 0.0, 0.0, 0.0), Matrix4::zeros(), 0.0);
        m.accumulate(&est, &[0.0; 4], 2.0);
        assert_eq!(m.n_nees_skipped, 1);
        assert_eq!(m.mean_nees(), 0.0);
        assert_abs_diff_eq!(m.rmse_position(), 1.0);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = FilterMetrics::default();
        let est = Estimate::new(Vector4::new(1.0, 0.0, 0.0, 0.0), Matrix4::identity(), 0.0);
        a.accumulate(&est, &[0.0; 4], 1.0);
        let mut b = a.clone();
        b.reject();
        a.merge(&b);
        assert_eq!(a.n_steps, 2);
        assert_eq!(a.n_rejected, 1);
        assert_abs_diff_eq!(a.summary().mean_nis, 1.0);
    }
}
