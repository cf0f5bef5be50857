//! Ground-truth instruction/path records.
//!
//! Each split is a JSON array of `{path_id, scan, path, instructions, ...}`
//! records. Every path carries `INSTRUCTIONS_PER_PATH` instruction variants,
//! which fixes the expected instruction ids as `{path_id}_{0..N}`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use navscore_core::{DataConfig, INSTRUCTIONS_PER_PATH, ScanId, ViewpointId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{EvalError, Result};

/// One ground-truth path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruth {
  pub path_id: u64,
  pub scan: ScanId,
  /// Reference path; first viewpoint is the start, last is the goal
  pub path: Vec<ViewpointId>,
  #[serde(default)]
  pub instructions: Vec<String>,
  /// Initial agent heading in radians
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub heading: Option<f64>,
  /// Path length as recorded by the dataset
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub distance: Option<f64>,
}

impl GroundTruth {
  pub fn start(&self) -> &str {
    self.path.first().map(String::as_str).unwrap_or_default()
  }

  pub fn goal(&self) -> &str {
    self.path.last().map(String::as_str).unwrap_or_default()
  }

  /// Instruction ids this path is expected to be scored under.
  pub fn instr_ids(&self) -> impl Iterator<Item = String> {
    let path_id = self.path_id;
    (0..INSTRUCTIONS_PER_PATH).map(move |variant| InstructionId::new(path_id, variant).to_string())
  }
}

/// Parsed `{path_id}_{variant}` instruction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionId {
  pub path_id: u64,
  pub variant: usize,
}

impl InstructionId {
  pub fn new(path_id: u64, variant: usize) -> Self {
    Self { path_id, variant }
  }
}

impl std::str::FromStr for InstructionId {
  type Err = EvalError;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || EvalError::InvalidInstructionId(s.to_string());
    let (path_id, variant) = s.split_once('_').ok_or_else(invalid)?;
    Ok(Self {
      path_id: path_id.parse().map_err(|_| invalid())?,
      variant: variant.parse().map_err(|_| invalid())?,
    })
  }
}

impl std::fmt::Display for InstructionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}_{}", self.path_id, self.variant)
  }
}

/// Ground truth for the active splits.
#[derive(Debug, Clone)]
pub struct Dataset {
  splits: Vec<String>,
  by_path: BTreeMap<u64, GroundTruth>,
  instr_ids: BTreeSet<String>,
}

impl Dataset {
  /// Load and concatenate the ground-truth files of every split.
  pub fn load<S: AsRef<str>>(data: &DataConfig, splits: &[S]) -> Result<Self> {
    let mut records = Vec::new();
    for split in splits {
      let path = data.dataset_path(split.as_ref());
      let loaded = load_split(&path)?;
      info!("Loaded {} paths for split {} from {}", loaded.len(), split.as_ref(), path.display());
      records.extend(loaded);
    }
    Self::from_records(splits, records)
  }

  pub fn from_records<S: AsRef<str>>(splits: &[S], records: impl IntoIterator<Item = GroundTruth>) -> Result<Self> {
    let mut by_path = BTreeMap::new();
    let mut instr_ids = BTreeSet::new();

    for record in records {
      if record.path.is_empty() {
        return Err(EvalError::EmptyPath {
          path_id: record.path_id,
        });
      }
      instr_ids.extend(record.instr_ids());
      if let Some(previous) = by_path.insert(record.path_id, record) {
        warn!("Path {} appears more than once; keeping the last record", previous.path_id);
      }
    }

    Ok(Self {
      splits: splits.iter().map(|s| s.as_ref().to_string()).collect(),
      by_path,
      instr_ids,
    })
  }

  pub fn splits(&self) -> &[String] {
    &self.splits
  }

  pub fn get(&self, path_id: u64) -> Option<&GroundTruth> {
    self.by_path.get(&path_id)
  }

  /// Ground truth addressed by an instruction id.
  pub fn lookup(&self, instr_id: &str) -> Result<&GroundTruth> {
    let id: InstructionId = instr_id.parse()?;
    self.get(id.path_id).ok_or_else(|| EvalError::UnknownPath {
      instr_id: instr_id.to_string(),
      path_id: id.path_id,
    })
  }

  /// Distinct scans referenced by the ground truth.
  pub fn scans(&self) -> BTreeSet<&str> {
    self.by_path.values().map(|gt| gt.scan.as_str()).collect()
  }

  /// Instruction ids a submission must cover.
  pub fn instr_ids(&self) -> &BTreeSet<String> {
    &self.instr_ids
  }

  /// Number of ground-truth paths.
  pub fn len(&self) -> usize {
    self.by_path.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_path.is_empty()
  }
}

fn load_split(path: &Path) -> Result<Vec<GroundTruth>> {
  let json = std::fs::read_to_string(path).map_err(|source| EvalError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&json).map_err(|source| EvalError::Parse {
    path: path.to_path_buf(),
    source,
  })
}
