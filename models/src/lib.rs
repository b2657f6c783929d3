//! `models` — Motion and observation models for the `ekf_core` tracker.
//!
//! Every model is written once against `ekf_core::Real`, so the tracker
//! gets both values and Jacobians from the same code.

pub mod motion;
pub mod observation;

pub use motion::{ConstantVelocity, CoordinatedTurn};
pub use observation::{wrap_angle, CartesianXY, PolarObservation};
