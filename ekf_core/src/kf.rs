//! Kalman filter: predict and correct steps over autodiff-linearized models.
//!
//! # Model contracts
//! - [`MotionModel`]: `x' = f(x, dt)` written once for any [`Real`](crate::Real)
//!   element type, plus `Q(x, t)` in plain reals.
//! - [`ObservationModel`]: `z = h(x, t)` likewise, plus `R(x, t)`.
//!
//! The transition Jacobian `F = ∂f/∂x` and observation Jacobian `H = ∂h/∂x`
//! come from the [`jacobian`](crate::jacobian) driver; nothing is hand-derived.
//!
//! ## Predict
//! x' = f(x, dt),  P' = F·P·Fᵀ + Q
//!
//! ## Correct
//! y = z − h(x'),  S = H·P'·Hᵀ + R,  K = P'·Hᵀ·S⁻¹
//! x'' = x' + K·y,  P'' = (I − K·H)·P'   (or the Joseph form)

use crate::error::EkfError;
use crate::jacobian::{value_and_jacobian, VectorFunction};
use crate::types::{Estimate, Jacobian, ObsCov, ObsVec, StateCov, StateVec};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Model traits
// ---------------------------------------------------------------------------

/// State propagation model. The auxiliary argument of `call` is `dt`.
pub trait MotionModel<const N: usize>: VectorFunction<f64, N, N> {
    /// Process noise `Q` for a step ending at `t`, evaluated at the prior state.
    fn process_noise(&self, state: &StateVec<N>, t: f64) -> StateCov<N>;
}

/// Sensor model. The auxiliary argument of `call` is the observation time `t`.
pub trait ObservationModel<const N: usize, const M: usize>: VectorFunction<f64, N, M> {
    /// Observation noise `R` at the predicted state.
    fn observation_noise(&self, state: &StateVec<N>, t: f64) -> ObsCov<M>;

    /// Innovation `z − ẑ`. Override for components living on a circle.
    fn residual(&self, z: &ObsVec<M>, predicted: &ObsVec<M>) -> ObsVec<M> {
        z - predicted
    }
}

// ---------------------------------------------------------------------------
// Covariance update form
// ---------------------------------------------------------------------------

/// How the corrected covariance is formed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovarianceForm {
    /// `(I − K·H)·P'`. Cheap; does not preserve symmetry under rounding.
    #[default]
    Standard,
    /// `(I − K·H)·P'·(I − K·H)ᵀ + K·R·Kᵀ`. Symmetric and PSD-preserving.
    Joseph,
}

// ---------------------------------------------------------------------------
// Predict
// ---------------------------------------------------------------------------

/// Output of the predict step. `transition` and `process_noise` are exposed
/// for diagnostics only.
#[derive(Clone, Debug)]
pub struct Prediction<const N: usize> {
    pub state: StateVec<N>,
    pub cov: StateCov<N>,
    /// F = ∂f/∂x at the prior state
    pub transition: StateCov<N>,
    pub process_noise: StateCov<N>,
}

/// Propagate `prior` by `dt` to time `t`.
pub fn predict<MM, const N: usize>(
    model: &MM,
    prior: &Estimate<N>,
    dt: f64,
    t: f64,
) -> Prediction<N>
where
    MM: MotionModel<N>,
{
    let (state, f) = value_and_jacobian(&prior.state, model, dt);
    let q = model.process_noise(&prior.state, t);
    let cov = f * prior.cov * f.transpose() + q;
    Prediction {
        state,
        cov,
        transition: f,
        process_noise: q,
    }
}

// ---------------------------------------------------------------------------
// Correct
// ---------------------------------------------------------------------------

/// Result of a correction step, exposed for diagnostics.
#[derive(Clone, Debug)]
pub struct KfUpdateResult<const N: usize, const M: usize> {
    pub state: StateVec<N>,
    pub cov: StateCov<N>,
    /// ẑ = h(x')
    pub predicted_observation: ObsVec<M>,
    /// H = ∂h/∂x at x'
    pub observation_jacobian: Jacobian<M, N>,
    /// Innovation y = z − ẑ
    pub innovation: ObsVec<M>,
    /// Innovation covariance S = H·P'·Hᵀ + R
    pub innovation_cov: ObsCov<M>,
    /// Kalman gain K
    pub kalman_gain: Jacobian<N, M>,
    /// Normalized innovation squared yᵀ·S⁻¹·y
    pub nis: f64,
}

/// Correct a predicted `(state, cov)` with observation `z` taken at `t`.
pub fn correct<OM, const N: usize, const M: usize>(
    model: &OM,
    state: &StateVec<N>,
    cov: &StateCov<N>,
    z: &ObsVec<M>,
    t: f64,
    form: CovarianceForm,
) -> Result<KfUpdateResult<N, M>, EkfError>
where
    OM: ObservationModel<N, M>,
{
    let (z_pred, h) = value_and_jacobian(state, model, t);
    let r = model.observation_noise(state, t);
    let innovation = model.residual(z, &z_pred);

    let s = h * cov * h.transpose() + r;
    let s_inv = s
        .try_inverse()
        .ok_or(EkfError::SingularInnovation { time: t })?;
    let k = cov * h.transpose() * s_inv;

    let new_state = state + k * innovation;
    let i_kh = StateCov::<N>::identity() - k * h;
    let new_cov = match form {
        CovarianceForm::Standard => i_kh * cov,
        CovarianceForm::Joseph => i_kh * cov * i_kh.transpose() + k * r * k.transpose(),
    };

    Ok(KfUpdateResult {
        state: new_state,
        cov: new_cov,
        predicted_observation: z_pred,
        observation_jacobian: h,
        innovation,
        innovation_cov: s,
        kalman_gain: k,
        nis: innovation.dot(&(s_inv * innovation)),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
