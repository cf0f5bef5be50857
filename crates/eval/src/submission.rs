//! Agent trajectory submissions.
//!
//! Format: `[{"instr_id": "6992_1", "trajectory": [[viewpoint_id, heading, elevation], ...]}, ...]`

use std::path::Path;

use navscore_core::ViewpointId;
use serde::{Deserialize, Serialize};

use crate::{EvalError, Result};

/// One visited viewpoint with the agent's camera orientation.
///
/// Serialized as a `[viewpoint_id, heading, elevation]` array. Only the
/// viewpoint takes part in distance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(ViewpointId, f64, f64)", into = "(ViewpointId, f64, f64)")]
pub struct TrajectoryStep {
  pub viewpoint: ViewpointId,
  /// Radians
  pub heading: f64,
  /// Radians
  pub elevation: f64,
}

impl TrajectoryStep {
  pub fn new(viewpoint: impl Into<ViewpointId>, heading: f64, elevation: f64) -> Self {
    Self {
      viewpoint: viewpoint.into(),
      heading,
      elevation,
    }
  }

  /// Step at a viewpoint with a level, forward-facing camera.
  pub fn at(viewpoint: impl Into<ViewpointId>) -> Self {
    Self::new(viewpoint, 0.0, 0.0)
  }
}

impl From<(ViewpointId, f64, f64)> for TrajectoryStep {
  fn from((viewpoint, heading, elevation): (ViewpointId, f64, f64)) -> Self {
    Self {
      viewpoint,
      heading,
      elevation,
    }
  }
}

impl From<TrajectoryStep> for (ViewpointId, f64, f64) {
  fn from(step: TrajectoryStep) -> Self {
    (step.viewpoint, step.heading, step.elevation)
  }
}

/// One submitted trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEntry {
  pub instr_id: String,
  pub trajectory: Vec<TrajectoryStep>,
}

impl SubmissionEntry {
  pub fn new(instr_id: impl Into<String>, trajectory: Vec<TrajectoryStep>) -> Self {
    Self {
      instr_id: instr_id.into(),
      trajectory,
    }
  }
}

/// All trajectories of one results file, in file order.
#[derive(Debug, Clone)]
pub struct Submission {
  /// Where the entries came from, used in coverage errors
  pub source: String,
  pub entries: Vec<SubmissionEntry>,
}

impl Submission {
  pub fn new(source: impl Into<String>, entries: Vec<SubmissionEntry>) -> Self {
    Self {
      source: source.into(),
      entries,
    }
  }

  /// Load a submission from a JSON file.
  pub fn load(path: &Path) -> Result<Self> {
    let json = std::fs::read_to_string(path).map_err(|source| EvalError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let entries = serde_json::from_str(&json).map_err(|source| EvalError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(Self::new(path.display().to_string(), entries))
  }

  /// Save a submission as JSON.
  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string(&self.entries)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
