//! Ground-truth target trajectory.
//!
//! The target carries a true kinematic state `[px, py, vx, vy]` and a
//! `MotionSpec` describing how it moves. Turns are propagated along the exact
//! circular arc, so the coordinated-turn filter model is matched when its
//! turn rate is right.

use ekf_core::metrics::Kinematics;
use serde::{Deserialize, Serialize};

/// Describes how the target moves.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Constant velocity: no acceleration.
    ConstantVelocity,
    /// Constant turn rate on the XY plane. `omega` in rad/s, positive CCW.
    ConstantTurn { omega: f64 },
    /// Switch motion at given sim times.
    /// `segments` is sorted by start time: `[(t_start, MotionSpec), ...]`.
    /// The active spec is the last one whose `t_start <= t`; before the first
    /// segment the target flies straight.
    Segmented {
        segments: Vec<(f64, Box<MotionSpec>)>,
    },
}

impl MotionSpec {
    /// Turn rate in effect at time `t`.
    pub fn turn_rate_at(&self, t: f64) -> f64 {
        match self {
            MotionSpec::ConstantVelocity => 0.0,
            MotionSpec::ConstantTurn { omega } => *omega,
            MotionSpec::Segmented { segments } => segments
                .iter()
                .filter(|(t_start, _)| *t_start <= t)
                .last()
                .map_or(0.0, |(_, spec)| spec.turn_rate_at(t)),
        }
    }
}

/// A simulated target with ground-truth state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    /// True state `[px, py, vx, vy]`
    pub state: Kinematics,
    pub motion: MotionSpec,
}

impl Target {
    pub fn new(position: [f64; 2], velocity: [f64; 2], motion: MotionSpec) -> Self {
        Self {
            state: [position[0], position[1], velocity[0], velocity[1]],
            motion,
        }
    }

    /// Propagate the true state by `dt` seconds, starting at time `t`.
    pub fn step(&mut self, t: f64, dt: f64) {
        let omega = self.motion.turn_rate_at(t);
        let [px, py, vx, vy] = self.state;

        if omega == 0.0 {
            self.state = [px + vx * dt, py + vy * dt, vx, vy];
            return;
        }

        let (s, c) = (omega * dt).sin_cos();
        self.state = [
            px + (vx * s - vy * (1.0 - c)) / omega,
            py + (vx * (1.0 - c) + vy * s) / omega,
            vx * c - vy * s,
            vx * s + vy * c,
        ];
    }

    /// 2D position
    pub fn pos_2d(&self) -> (f64, f64) {
        (self.state[0], self.state[1])
    }

    pub fn speed(&self) -> f64 {
        self.state[2].hypot(self.state[3])
    }
}
