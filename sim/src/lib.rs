//! `sim` — Scenario simulator: target truth, noisy sensor, replay logs and
//! the batch runner that scores the tracker against them.

pub mod replay;
pub mod runner;
pub mod scenarios;
pub mod sensor;
pub mod target;

pub use replay::{load_replay, save_replay, GroundTruthFrame, ReplayLog};
pub use runner::{record, run_scenario, RunConfig, RunSummary, TrackPoint};
pub use scenarios::{FilterModel, Scenario, ScenarioKind};
pub use sensor::{Observation, SensorKind, SensorParams, SimSensor};
pub use target::{MotionSpec, Target};
