//! `ekf_core` — Forward-mode autodiff Jacobians and a generic Extended Kalman Filter.
//!
//! # Module layout
//! - [`dual`]     — Dual numbers (value + derivative) with exact chain rules
//! - [`real`]     — `Real`: the arithmetic capability set models are written against
//! - [`jacobian`] — Jacobian driver: one seeded evaluation per input column
//! - [`kf`]       — Model traits, predict / correct algebra
//! - [`ekf`]      — `EkfTracker`: stateful predict + correct over borrowed models
//! - [`error`]    — Error taxonomy
//! - [`metrics`]  — RMSE, NEES, NIS
//! - [`types`]    — State / covariance aliases, `Estimate`

pub mod dual;
pub mod ekf;
pub mod error;
pub mod jacobian;
pub mod kf;
pub mod metrics;
pub mod real;
pub mod types;

pub use dual::Dual;
pub use ekf::{EkfTracker, TrackerConfig, UpdateReport};
pub use error::EkfError;
pub use jacobian::{evaluate, jacobian, value_and_jacobian, VectorFunction};
pub use kf::{CovarianceForm, MotionModel, ObservationModel};
pub use metrics::{FilterMetrics, MetricsSummary};
pub use real::Real;
pub use types::{Estimate, Jacobian, ObsCov, ObsVec, StateCov, StateVec};
