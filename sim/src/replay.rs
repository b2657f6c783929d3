//! Replay: serialize/deserialize recorded runs for offline analysis.
//!
//! A log holds the scenario it came from, every observation the sensor
//! reported and the ground truth at every scan (detected or not).

use crate::scenarios::Scenario;
use crate::sensor::Observation;
use anyhow::Context;
use ekf_core::metrics::Kinematics;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded simulation log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayLog {
    pub scenario: Scenario,
    /// Observations in chronological order
    pub observations: Vec<Observation>,
    /// Ground truth sampled at every scan, chronological
    pub ground_truth: Vec<GroundTruthFrame>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthFrame {
    pub time: f64,
    /// `[px, py, vx, vy]`
    pub state: Kinematics,
    /// True turn rate at `time`
    pub turn_rate: f64,
}

impl ReplayLog {
    /// Ground truth recorded at `time`, if any.
    pub fn truth_at(&self, time: f64) -> Option<&GroundTruthFrame> {
        let idx = self.ground_truth.partition_point(|f| f.time < time - 1e-9);
        self.ground_truth
            .get(idx)
            .filter(|f| (f.time - time).abs() <= 1e-9)
    }
}

/// Save a replay log to a JSON file.
pub fn save_replay(log: &ReplayLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating replay file {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a replay log from a JSON file.
pub fn load_replay(path: &Path) -> anyhow::Result<ReplayLog> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening replay file {}", path.display()))?;
    let reader = BufReader::new(file);
    let log: ReplayLog = serde_json::from_reader(reader)
        .with_context(|| format!("parsing replay file {}", path.display()))?;
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioKind;

    fn log() -> ReplayLog {
        let frame = |time: f64| GroundTruthFrame {
            time,
            state: [time, 0.0, 1.0, 0.0],
            turn_rate: 0.0,
        };
        ReplayLog {
            scenario: Scenario::build(ScenarioKind::Radar, 9),
            observations: vec![Observation {
                time: 2.0,
                z: [100.0, -3.1],
            }],
            ground_truth: vec![frame(2.0), frame(4.0), frame(6.0)],
        }
    }

    #[test]
    fn truth_lookup_by_time() {
        let log = log();
        assert_eq!(log.truth_at(4.0).map(|f| f.state[0]), Some(4.0));
        assert_eq!(log.truth_at(4.0 + 1e-12).map(|f| f.time), Some(4.0));
        assert!(log.truth_at(5.0).is_none());
        assert!(log.truth_at(8.0).is_none());
    }

    #[test]
    fn file_roundtrip_preserves_log() {
        let log = log();
        let path = std::env::temp_dir().join(format!("ekf-replay-{}.json", std::process::id()));
        save_replay(&log, &path).unwrap();
        let back = load_replay(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(back.scenario.name, "radar");
        assert_eq!(back.observations, log.observations);
        assert_eq!(back.ground_truth, log.ground_truth);
    }

    #[test]
    fn missing_file_is_an_error_with_path() {
        let err = load_replay(Path::new("/nonexistent/replay.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/replay.json"));
    }
}
