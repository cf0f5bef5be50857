//! Trajectory evaluation for instruction-following navigation agents.
//!
//! Scores a submission of agent trajectories against ground-truth paths
//! using the precomputed distance tables from the `graph` crate.
//!
//! ## Key Concepts
//!
//! - **Dataset**: ground-truth paths per split, keyed by path id
//! - **Submission**: `{instr_id, trajectory}` entries produced by an agent
//! - **Scoring**: per-instruction navigation error, oracle error, length, SPL
//! - **Evaluation**: coverage checks and reduction to summary statistics
//! - **Reports**: JSON (machine-readable), Markdown, and run comparison

pub mod dataset;
pub mod evaluation;
pub mod reports;
pub mod scoring;
pub mod submission;

use std::path::PathBuf;

pub use dataset::{Dataset, GroundTruth, InstructionId};
pub use evaluation::{Evaluation, EvaluationOutcome, ScoreLists, ScoreSummary};
pub use reports::{ComparisonReport, EvaluationReport, MarkdownReport};
pub use scoring::{InstructionScore, Scorer, StepAlignment};
pub use submission::{Submission, SubmissionEntry, TrajectoryStep};

use thiserror::Error;

/// Evaluation errors. Every variant aborts the run; no partial summary is
/// produced.
#[derive(Debug, Error)]
pub enum EvalError {
  #[error("Graph error: {0}")]
  Graph(#[from] graph::GraphError),

  #[error("Config error: {0}")]
  Config(#[from] navscore_core::ConfigError),

  #[error("Failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Ground-truth path {path_id} has no viewpoints")]
  EmptyPath { path_id: u64 },

  #[error("Invalid instruction id: {0}")]
  InvalidInstructionId(String),

  #[error("Instruction {instr_id} refers to unknown path {path_id}")]
  UnknownPath { instr_id: String, path_id: u64 },

  #[error("Trajectory for {instr_id} is empty")]
  EmptyTrajectory { instr_id: String },

  #[error("Result trajectories should include the start position: {instr_id} starts at {actual}, expected {expected}")]
  StartMismatch {
    instr_id: String,
    expected: String,
    actual: String,
  },

  #[error("Missing {missing} of {expected} instruction ids from {splits} - not in {source_name}")]
  MissingInstructions {
    missing: usize,
    expected: usize,
    splits: String,
    source_name: String,
  },

  #[error("Scored {len} {metric} but expected {expected}")]
  LengthMismatch {
    metric: &'static str,
    len: usize,
    expected: usize,
  },

  #[error("No instructions to score for splits {0}")]
  EmptyEvaluation(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
