//! Submission-level evaluation.
//!
//! Walks a submission in order, scores every expected instruction exactly
//! once, checks that nothing expected is missing, and reduces the
//! per-instruction metrics to summary statistics.

use std::collections::BTreeSet;
use std::path::Path;

use graph::Environments;
use navscore_core::{Config, EvalMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::scoring::{InstructionScore, Scorer, StepAlignment};
use crate::submission::Submission;
use crate::{EvalError, Result};

/// Raw per-instruction metric lists, in scoring order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreLists {
  pub nav_errors: Vec<f64>,
  pub oracle_errors: Vec<f64>,
  pub trajectory_steps: Vec<usize>,
  pub trajectory_lengths: Vec<f64>,
  pub success_path_length: Vec<f64>,
}

impl ScoreLists {
  pub fn push(&mut self, score: &InstructionScore) {
    self.nav_errors.push(score.nav_error);
    self.oracle_errors.push(score.oracle_error);
    self.trajectory_steps.push(score.steps);
    self.trajectory_lengths.push(score.trajectory_length);
    self.success_path_length.push(score.spl);
  }

  pub fn len(&self) -> usize {
    self.nav_errors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nav_errors.is_empty()
  }

  /// Every list must hold exactly one entry per expected instruction.
  pub fn check_len(&self, expected: usize) -> Result<()> {
    let lens = [
      ("nav_errors", self.nav_errors.len()),
      ("oracle_errors", self.oracle_errors.len()),
      ("trajectory_steps", self.trajectory_steps.len()),
      ("trajectory_lengths", self.trajectory_lengths.len()),
      ("success_path_length", self.success_path_length.len()),
    ];
    match lens.into_iter().find(|&(_, len)| len != expected) {
      Some((metric, len)) => Err(EvalError::LengthMismatch { metric, len, expected }),
      None => Ok(()),
    }
  }
}

/// Summary statistics for one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
  pub nav_error: f64,
  pub oracle_error: f64,
  pub steps: f64,
  pub lengths: f64,
  pub spl: f64,
  pub success_rate: f64,
  pub oracle_rate: f64,
}

impl ScoreSummary {
  /// Means of each list plus success rates under `error_margin`.
  ///
  /// The lists must be non-empty.
  pub fn from_lists(lists: &ScoreLists, error_margin: f64) -> Self {
    let n = lists.len() as f64;
    let mean = |values: &[f64]| values.iter().sum::<f64>() / n;
    let rate = |values: &[f64]| values.iter().filter(|&&d| d < error_margin).count() as f64 / n;

    Self {
      nav_error: mean(&lists.nav_errors),
      oracle_error: mean(&lists.oracle_errors),
      steps: lists.trajectory_steps.iter().sum::<usize>() as f64 / n,
      lengths: mean(&lists.trajectory_lengths),
      spl: mean(&lists.success_path_length),
      success_rate: rate(&lists.nav_errors),
      oracle_rate: rate(&lists.oracle_errors),
    }
  }
}

/// Everything produced by scoring one submission.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
  pub summary: ScoreSummary,
  pub scores: ScoreLists,
  /// Aggregate single-step agreement; diagnostic only
  pub alignment: StepAlignment,
  /// Per-instruction records in scoring order
  pub instructions: Vec<InstructionScore>,
}

/// Ground truth, environments and scoring rules for the active splits.
pub struct Evaluation {
  dataset: Dataset,
  environments: Environments,
  scorer: Scorer,
}

impl Evaluation {
  pub fn new(dataset: Dataset, environments: Environments, scorer: Scorer) -> Self {
    Self {
      dataset,
      environments,
      scorer,
    }
  }

  /// Load ground truth for `splits` and build the distance tables of every
  /// scan it references.
  pub fn load<S: AsRef<str>>(config: &Config, splits: &[S]) -> Result<Self> {
    config.validate()?;

    let dataset = Dataset::load(&config.data, splits)?;
    let environments = Environments::load(&config.data, dataset.scans())?;

    let mode = config.scoring.mode.resolve(splits);
    let scorer =
      Scorer::new(config.scoring.error_margin, mode).with_trace(config.scoring.trace_instr_ids.iter().cloned());

    info!(
      "Evaluation ready: {} paths, {} instructions, {} scans, mode {}",
      dataset.len(),
      dataset.instr_ids().len(),
      environments.len(),
      mode
    );

    Ok(Self::new(dataset, environments, scorer))
  }

  pub fn dataset(&self) -> &Dataset {
    &self.dataset
  }

  pub fn scorer(&self) -> &Scorer {
    &self.scorer
  }

  pub fn mode(&self) -> EvalMode {
    self.scorer.mode()
  }

  /// Number of instructions a submission must cover.
  pub fn expected_count(&self) -> usize {
    self.dataset.instr_ids().len()
  }

  /// Load and score a submission file.
  pub fn score_file(&self, path: &Path) -> Result<EvaluationOutcome> {
    let submission = Submission::load(path)?;
    self.score(&submission)
  }

  pub fn score(&self, submission: &Submission) -> Result<EvaluationOutcome> {
    self.score_with(submission, |_| {})
  }

  /// Score a submission, calling `on_scored` after each instruction.
  ///
  /// Entries outside the expected set are ignored; an expected id seen again
  /// after it was scored is ignored with a warning.
  pub fn score_with<F>(&self, submission: &Submission, mut on_scored: F) -> Result<EvaluationOutcome>
  where
    F: FnMut(&InstructionScore),
  {
    let expected = self.dataset.instr_ids();
    let mut remaining: BTreeSet<&str> = expected.iter().map(String::as_str).collect();

    let mut scores = ScoreLists::default();
    let mut alignment = StepAlignment::default();
    let mut instructions = Vec::with_capacity(expected.len());

    for entry in &submission.entries {
      if !remaining.remove(entry.instr_id.as_str()) {
        if expected.contains(&entry.instr_id) {
          warn!("Ignoring repeated trajectory for {}", entry.instr_id);
        } else {
          debug!("Ignoring unexpected instruction {}", entry.instr_id);
        }
        continue;
      }

      let gt = self.dataset.lookup(&entry.instr_id)?;
      let env = self.environments.get(&gt.scan)?;
      let score = self.scorer.score(env, gt, &entry.instr_id, &entry.trajectory)?;

      scores.push(&score);
      alignment += score.alignment;
      on_scored(&score);
      instructions.push(score);
    }

    if !remaining.is_empty() {
      return Err(EvalError::MissingInstructions {
        missing: remaining.len(),
        expected: expected.len(),
        splits: self.dataset.splits().join(","),
        source_name: submission.source.clone(),
      });
    }
    if expected.is_empty() {
      return Err(EvalError::EmptyEvaluation(self.dataset.splits().join(",")));
    }
    scores.check_len(expected.len())?;

    let summary = ScoreSummary::from_lists(&scores, self.scorer.error_margin());

    match alignment.ratio() {
      Some(ratio) => info!(
        "acc for single step: {:.4} ({}/{})",
        ratio, alignment.matched, alignment.candidates
      ),
      None => info!("acc for single step: n/a (no candidate steps)"),
    }

    Ok(EvaluationOutcome {
      summary,
      scores,
      alignment,
      instructions,
    })
  }
}
