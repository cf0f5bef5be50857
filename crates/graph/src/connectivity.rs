//! Raw connectivity records.
//!
//! A connectivity file is a JSON array with one record per viewpoint. The
//! `unobstructed` array of every record is aligned to the array order, so
//! `records[i].unobstructed[j]` says whether viewpoint `j` is navigable from
//! viewpoint `i`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::nav_graph::Position;
use crate::{GraphError, Result};

/// Row-major 4x4 transform.
pub const POSE_LEN: usize = 16;

const POSE_X: usize = 3;
const POSE_Y: usize = 7;
const POSE_Z: usize = 11;

/// One viewpoint as stored in a connectivity file. Unknown fields
/// (`visible`, `height`, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewpointRecord {
  pub image_id: String,
  pub included: bool,
  pub pose: Vec<f64>,
  pub unobstructed: Vec<bool>,
}

impl ViewpointRecord {
  /// Translation components of the pose.
  pub fn position(&self) -> Option<Position> {
    if self.pose.len() != POSE_LEN {
      return None;
    }
    Some(Position::new(self.pose[POSE_X], self.pose[POSE_Y], self.pose[POSE_Z]))
  }

  /// Whether this record marks record `j` as navigable.
  pub fn reaches(&self, j: usize) -> bool {
    self.unobstructed.get(j).copied().unwrap_or(false)
  }
}

/// Parse connectivity JSON for a scan.
pub fn parse_connectivity(scan: &str, json: &str) -> Result<Vec<ViewpointRecord>> {
  serde_json::from_str(json).map_err(|source| GraphError::Json {
    scan: scan.to_string(),
    source,
  })
}

/// Read and parse a connectivity file.
pub fn load_connectivity(scan: &str, path: &Path) -> Result<Vec<ViewpointRecord>> {
  let json = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  parse_connectivity(scan, &json)
}
