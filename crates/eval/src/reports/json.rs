//! JSON report format for evaluation results.

use crate::Result;
use crate::evaluation::{EvaluationOutcome, ScoreLists, ScoreSummary};
use crate::scoring::{InstructionScore, StepAlignment};
use chrono::{DateTime, Utc};
use navscore_core::EvalMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete evaluation report in JSON format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
  /// Report metadata
  pub metadata: ReportMetadata,
  /// Summary statistics
  pub summary: ScoreSummary,
  /// Raw per-instruction metric lists
  pub scores: ScoreLists,
  /// Single-step agreement counters
  pub alignment: StepAlignment,
  /// Per-instruction results, in scoring order
  pub instructions: Vec<InstructionScore>,
}

/// Report metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
  /// Report generation timestamp
  pub timestamp: DateTime<Utc>,
  /// navscore version
  pub version: String,
  /// Git commit hash (if available)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub git_commit: Option<String>,
  /// Hostname
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hostname: Option<String>,
  /// Evaluated splits
  pub splits: Vec<String>,
  /// SPL policy used
  pub mode: EvalMode,
  /// Success threshold in meters
  pub error_margin: f64,
  /// Submission the scores came from
  pub submission: String,
  /// Total instructions scored
  pub total_instructions: usize,
}

/// Run parameters recorded alongside the scores.
#[derive(Debug, Clone)]
pub struct RunInfo<'a> {
  pub splits: &'a [String],
  pub mode: EvalMode,
  pub error_margin: f64,
  pub submission: &'a str,
}

impl EvaluationReport {
  /// Create a report from a scored submission.
  pub fn from_outcome(outcome: &EvaluationOutcome, run: &RunInfo<'_>) -> Self {
    Self {
      metadata: ReportMetadata {
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_commit: Self::get_git_commit(),
        hostname: hostname::get().ok().and_then(|h| h.into_string().ok()),
        splits: run.splits.to_vec(),
        mode: run.mode,
        error_margin: run.error_margin,
        submission: run.submission.to_string(),
        total_instructions: outcome.instructions.len(),
      },
      summary: outcome.summary,
      scores: outcome.scores.clone(),
      alignment: outcome.alignment,
      instructions: outcome.instructions.clone(),
    }
  }

  fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
      .args(["rev-parse", "--short", "HEAD"])
      .output()
      .ok()
      .and_then(|o| String::from_utf8(o.stdout).ok())
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
  }

  /// Number of successful instructions.
  pub fn successes(&self) -> usize {
    self.instructions.iter().filter(|s| s.success).count()
  }

  /// Save report to a JSON file.
  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  /// Load report from a JSON file.
  pub fn load(path: &Path) -> Result<Self> {
    let json = std::fs::read_to_string(path)?;
    let report = serde_json::from_str(&json)?;
    Ok(report)
  }
}
