//! Errors reported by the tracker.
//!
//! Dimension mismatches never reach runtime: state and observation sizes are
//! const generics. A tracker without models cannot be constructed. What is
//! left is a call-order precondition and the numerical failures below.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum EkfError {
    /// `update` was called before `initialize`.
    #[error("tracker has no estimate yet: call initialize before update")]
    NotInitialized,

    /// `S = H·P·Hᵀ + R` could not be inverted. No pseudo-inverse or
    /// regularization is attempted.
    #[error("innovation covariance is singular at t = {time}")]
    SingularInnovation { time: f64 },

    /// The requested time precedes the current estimate.
    #[error("update time {requested} precedes current estimate time {last}")]
    TimeReversal { last: f64, requested: f64 },

    /// The corrected state or covariance contains NaN or infinity.
    #[error("non-finite state or covariance produced at t = {time}")]
    NonFinite { time: f64 },
}
