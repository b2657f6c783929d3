//! Fundamental types used across the entire workspace.

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scalar type: f64 throughout for numerical precision in the filter.
// Dimensions are const generics so size mismatches fail at compile time.
// ---------------------------------------------------------------------------

/// N-dimensional state vector.
pub type StateVec<const N: usize> = SVector<f64, N>;

/// N×N state covariance matrix.
pub type StateCov<const N: usize> = SMatrix<f64, N, N>;

/// M-dimensional observation vector.
pub type ObsVec<const M: usize> = SVector<f64, M>;

/// M×M observation noise / innovation covariance.
pub type ObsCov<const M: usize> = SMatrix<f64, M, M>;

/// Dense Jacobian of a map from `C` inputs to `R` outputs (R rows, C columns).
pub type Jacobian<const R: usize, const C: usize> = SMatrix<f64, R, C>;

// ---------------------------------------------------------------------------
// Estimate
// ---------------------------------------------------------------------------

/// The filter's belief at one instant: mean, covariance and the timestamp
/// they refer to.
///
/// `cov` is symmetric positive-semidefinite by invariant only. Nothing in the
/// tracker symmetrizes or repairs it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate<const N: usize> {
    pub state: StateVec<N>,
    pub cov: StateCov<N>,
    pub time: f64,
}

impl<const N: usize> Estimate<N> {
    pub fn new(state: StateVec<N>, cov: StateCov<N>, time: f64) -> Self {
        Self { state, cov, time }
    }

    /// Sum of the covariance diagonal; a scalar measure of uncertainty.
    pub fn uncertainty(&self) -> f64 {
        self.cov.trace()
    }

    /// Largest absolute difference between `P` and `Pᵀ`.
    pub fn asymmetry(&self) -> f64 {
        (self.cov - self.cov.transpose()).amax()
    }
}
