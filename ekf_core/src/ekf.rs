//! Extended Kalman Filter tracker.
//!
//! [`EkfTracker`] owns one [`Estimate`] and borrows a motion model and an
//! observation model for its whole lifetime. Each [`EkfTracker::update`]
//! linearizes both models at the current estimate through the autodiff
//! Jacobian driver, predicts to the observation time and corrects.
//!
//! # Lifecycle
//! `new` (models bound) → `initialize` → `update`*. Calling `initialize`
//! again discards the previous estimate. `update` before `initialize` is
//! reported as [`EkfError::NotInitialized`].
//!
//! The covariance is never symmetrized or repaired; callers must supply a
//! valid initial `P`.

use crate::error::EkfError;
use crate::kf::{
    correct, predict, CovarianceForm, KfUpdateResult, MotionModel, ObservationModel, Prediction,
};
use crate::types::{Estimate, ObsVec, StateCov, StateVec};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for the tracker.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Form of the corrected covariance. Default: `(I − K·H)·P'`.
    pub covariance_form: CovarianceForm,
}

/// Everything one update computed. Returned to the caller, never stored.
#[derive(Clone, Debug)]
pub struct UpdateReport<const N: usize, const M: usize> {
    /// Elapsed time since the previous estimate
    pub dt: f64,
    pub prediction: Prediction<N>,
    pub correction: KfUpdateResult<N, M>,
}

/// Generic EKF over an `N`-dimensional state and `M`-dimensional observations.
#[derive(Debug)]
pub struct EkfTracker<'m, MM, OM, const N: usize, const M: usize> {
    motion: &'m MM,
    observation: &'m OM,
    config: TrackerConfig,
    estimate: Option<Estimate<N>>,
}

impl<'m, MM, OM, const N: usize, const M: usize> EkfTracker<'m, MM, OM, N, M>
where
    MM: MotionModel<N>,
    OM: ObservationModel<N, M>,
{
    pub fn new(motion: &'m MM, observation: &'m OM) -> Self {
        Self::with_config(motion, observation, TrackerConfig::default())
    }

    pub fn with_config(motion: &'m MM, observation: &'m OM, config: TrackerConfig) -> Self {
        Self {
            motion,
            observation,
            config,
            estimate: None,
        }
    }

    /// Rebind the models. The current estimate, if any, is kept.
    pub fn set_models(&mut self, motion: &'m MM, observation: &'m OM) {
        self.motion = motion;
        self.observation = observation;
    }

    /// Overwrite state, covariance and reference time. `cov` is not validated.
    pub fn initialize(&mut self, state: StateVec<N>, cov: StateCov<N>, time: f64) {
        debug!(time, "ekf initialized");
        self.estimate = Some(Estimate::new(state, cov, time));
    }

    /// Predict to `t` and correct with observation `z`.
    ///
    /// On error the stored estimate is left exactly as it was.
    pub fn update(&mut self, z: &ObsVec<M>, t: f64) -> Result<UpdateReport<N, M>, EkfError> {
        let Some(prior) = self.estimate else {
            return Err(EkfError::NotInitialized);
        };
        let dt = t - prior.time;
        if dt < 0.0 {
            return Err(EkfError::TimeReversal {
                last: prior.time,
                requested: t,
            });
        }

        let prediction = predict(self.motion, &prior, dt, t);
        let correction = correct(
            self.observation,
            &prediction.state,
            &prediction.cov,
            z,
            t,
            self.config.covariance_form,
        )
        .inspect_err(|_| warn!(time = t, "innovation covariance not invertible"))?;

        let finite = correction.state.iter().all(|v| v.is_finite())
            && correction.cov.iter().all(|v| v.is_finite());
        if !finite {
            warn!(time = t, "update produced non-finite estimate, discarded");
            return Err(EkfError::NonFinite { time: t });
        }

        debug!(dt, nis = correction.nis, "ekf update");
        self.estimate = Some(Estimate::new(correction.state, correction.cov, t));
        Ok(UpdateReport {
            dt,
            prediction,
            correction,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.estimate.is_some()
    }

    pub fn estimate(&self) -> Option<&Estimate<N>> {
        self.estimate.as_ref()
    }

    pub fn state(&self) -> Option<&StateVec<N>> {
        self.estimate.as_ref().map(|e| &e.state)
    }

    pub fn covariance(&self) -> Option<&StateCov<N>> {
        self.estimate.as_ref().map(|e| &e.cov)
    }

    /// Timestamp of the current estimate.
    pub fn time(&self) -> Option<f64> {
        self.estimate.as_ref().map(|e| e.time)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
