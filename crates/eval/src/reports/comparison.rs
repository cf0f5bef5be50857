//! Comparison and regression detection between evaluation runs.

use super::json::EvaluationReport;
use crate::Result;
use crate::evaluation::ScoreSummary;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which way a summary metric should move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
  HigherIsBetter,
  LowerIsBetter,
}

/// Summary metrics that decide pass/fail. Mean steps is informational only.
const COMPARED_METRICS: [(&str, Direction, fn(&ScoreSummary) -> f64); 6] = [
  ("success_rate", Direction::HigherIsBetter, |s: &ScoreSummary| s.success_rate),
  ("oracle_rate", Direction::HigherIsBetter, |s: &ScoreSummary| s.oracle_rate),
  ("spl", Direction::HigherIsBetter, |s: &ScoreSummary| s.spl),
  ("nav_error", Direction::LowerIsBetter, |s: &ScoreSummary| s.nav_error),
  ("oracle_error", Direction::LowerIsBetter, |s: &ScoreSummary| s.oracle_error),
  ("lengths", Direction::LowerIsBetter, |s: &ScoreSummary| s.lengths),
];

/// A metric that moved by more than the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricChange {
  /// Metric name
  pub metric: String,
  /// Baseline value
  pub baseline: f64,
  /// Current value
  pub current: f64,
  /// Change percentage
  pub change_percent: f64,
}

/// Comparison report between two evaluation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
  /// Baseline report timestamp
  pub baseline_timestamp: String,
  /// Current report timestamp
  pub current_timestamp: String,
  /// Baseline submission
  pub baseline_submission: String,
  /// Current submission
  pub current_submission: String,
  /// Threshold used, in percent
  pub threshold_percent: f64,
  /// Metrics that got worse
  pub regressions: Vec<MetricChange>,
  /// Metrics that got better
  pub improvements: Vec<MetricChange>,
  /// Mean steps (baseline, current)
  pub steps: (f64, f64),
  /// Summary statistics
  pub summary: ComparisonSummary,
}

/// Summary of comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSummary {
  /// Metrics compared
  pub metrics_compared: usize,
  pub regressed: usize,
  pub improved: usize,
  pub unchanged: usize,
  /// Whether the comparison passes (no significant regressions)
  pub passes: bool,
  /// Runs were scored over different splits, margin or mode
  pub settings_differ: bool,
}

impl ComparisonReport {
  /// Compare two reports with a given threshold.
  pub fn compare(baseline: &EvaluationReport, current: &EvaluationReport, threshold_percent: f64) -> Self {
    let mut regressions = Vec::new();
    let mut improvements = Vec::new();

    for (metric, direction, value) in COMPARED_METRICS {
      let Some((change, is_degradation)) = Self::compare_metric(
        metric,
        value(&baseline.summary),
        value(&current.summary),
        threshold_percent,
        direction,
      ) else {
        continue;
      };
      if is_degradation {
        regressions.push(change);
      } else {
        improvements.push(change);
      }
    }

    let b = &baseline.metadata;
    let c = &current.metadata;
    let settings_differ = b.splits != c.splits || b.mode != c.mode || b.error_margin != c.error_margin;

    let regressed = regressions.len();
    let improved = improvements.len();

    Self {
      baseline_timestamp: b.timestamp.to_rfc3339(),
      current_timestamp: c.timestamp.to_rfc3339(),
      baseline_submission: b.submission.clone(),
      current_submission: c.submission.clone(),
      threshold_percent,
      regressions,
      improvements,
      steps: (baseline.summary.steps, current.summary.steps),
      summary: ComparisonSummary {
        metrics_compared: COMPARED_METRICS.len(),
        regressed,
        improved,
        unchanged: COMPARED_METRICS.len() - regressed - improved,
        passes: regressed == 0,
        settings_differ,
      },
    }
  }

  /// Returns the change and whether it is a degradation, or `None` when the
  /// metric moved less than `threshold` percent.
  fn compare_metric(
    metric: &str,
    baseline: f64,
    current: f64,
    threshold: f64,
    direction: Direction,
  ) -> Option<(MetricChange, bool)> {
    if baseline == current {
      return None;
    }

    let change_percent = if baseline != 0.0 {
      ((current - baseline) / baseline.abs()) * 100.0
    } else if current > 0.0 {
      100.0
    } else {
      -100.0
    };

    if change_percent.abs() < threshold {
      return None;
    }

    let is_degradation = match direction {
      Direction::HigherIsBetter => change_percent < 0.0,
      Direction::LowerIsBetter => change_percent > 0.0,
    };

    Some((
      MetricChange {
        metric: metric.to_string(),
        baseline,
        current,
        change_percent,
      },
      is_degradation,
    ))
  }

  /// Load comparison between two report files.
  pub fn from_files(baseline_path: &Path, current_path: &Path, threshold: f64) -> Result<Self> {
    let baseline = EvaluationReport::load(baseline_path)?;
    let current = EvaluationReport::load(current_path)?;
    Ok(Self::compare(&baseline, &current, threshold))
  }

  /// Save comparison to JSON.
  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  /// Generate markdown summary.
  pub fn to_markdown(&self) -> String {
    let mut out = String::new();

    out.push_str("# Evaluation Comparison\n\n");
    out.push_str(&format!(
      "**Baseline:** {} ({})\n",
      self.baseline_submission, self.baseline_timestamp
    ));
    out.push_str(&format!(
      "**Current:** {} ({})\n",
      self.current_submission, self.current_timestamp
    ));
    out.push_str(&format!("**Threshold:** {:.1}%\n\n", self.threshold_percent));

    if self.summary.settings_differ {
      out.push_str("> Runs used different splits, mode or error margin.\n\n");
    }

    let status = if self.summary.passes { "✅ PASS" } else { "❌ FAIL" };
    out.push_str(&format!("## Summary: {}\n\n", status));
    out.push_str("| Metric | Value |\n");
    out.push_str("|--------|-------|\n");
    out.push_str(&format!("| Compared | {} |\n", self.summary.metrics_compared));
    out.push_str(&format!("| Regressed | {} |\n", self.summary.regressed));
    out.push_str(&format!("| Improved | {} |\n", self.summary.improved));
    out.push_str(&format!("| Unchanged | {} |\n", self.summary.unchanged));
    out.push_str(&format!("| Mean steps | {:.2} -> {:.2} |\n\n", self.steps.0, self.steps.1));

    for (title, changes) in [("Regressions ❌", &self.regressions), ("Improvements ✅", &self.improvements)] {
      if changes.is_empty() {
        continue;
      }
      out.push_str(&format!("## {}\n\n", title));
      out.push_str("| Metric | Baseline | Current | Change |\n");
      out.push_str("|--------|----------|---------|--------|\n");
      for c in changes {
        out.push_str(&format!(
          "| {} | {:.4} | {:.4} | {:+.1}% |\n",
          c.metric, c.baseline, c.current, c.change_percent
        ));
      }
      out.push('\n');
    }

    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::reports::json::tests::{report, summary};
  use tempfile::TempDir;

  #[test]
  fn test_no_regression() {
    let baseline = report(summary(4.0, 0.5, 0.45));
    let current = report(summary(4.0, 0.5, 0.45));

    let comparison = ComparisonReport::compare(&baseline, &current, 5.0);

    assert!(comparison.regressions.is_empty());
    assert!(comparison.improvements.is_empty());
    assert_eq!(comparison.summary.unchanged, 6);
    assert!(comparison.summary.passes);
    assert!(!comparison.summary.settings_differ);
  }

  #[test]
  fn test_regression_detected() {
    let baseline = report(summary(4.0, 0.5, 0.45));
    let current = report(summary(6.0, 0.3, 0.25));

    let comparison = ComparisonReport::compare(&baseline, &current, 5.0);

    assert!(!comparison.summary.passes);
    let metrics: Vec<_> = comparison.regressions.iter().map(|r| r.metric.as_str()).collect();
    assert!(metrics.contains(&"nav_error"));
    assert!(metrics.contains(&"success_rate"));
    assert!(metrics.contains(&"spl"));

    let nav = comparison.regressions.iter().find(|r| r.metric == "nav_error").unwrap();
    assert!((nav.change_percent - 50.0).abs() < 1e-9);
  }

  #[test]
  fn test_improvement_detected() {
    let baseline = report(summary(6.0, 0.3, 0.25));
    let current = report(summary(4.0, 0.5, 0.45));

    let comparison = ComparisonReport::compare(&baseline, &current, 5.0);

    assert!(comparison.regressions.is_empty());
    assert!(comparison.improvements.iter().any(|c| c.metric == "success_rate"));
    assert!(comparison.improvements.iter().any(|c| c.metric == "nav_error"));
    assert!(comparison.summary.passes);
  }

  #[test]
  fn test_threshold_filtering() {
    let baseline = report(summary(4.0, 0.50, 0.45));
    // nav error +2.5%, success rate -10%
    let current = report(summary(4.1, 0.45, 0.45));

    let comparison = ComparisonReport::compare(&baseline, &current, 15.0);
    assert!(comparison.regressions.is_empty());

    let comparison = ComparisonReport::compare(&baseline, &current, 5.0);
    assert!(comparison.regressions.iter().any(|r| r.metric == "success_rate"));
    assert!(!comparison.regressions.iter().any(|r| r.metric == "nav_error"));
  }

  #[test]
  fn test_zero_baseline() {
    let baseline = report(summary(4.0, 0.0, 0.0));
    let current = report(summary(4.0, 0.2, 0.1));

    let comparison = ComparisonReport::compare(&baseline, &current, 5.0);
    let spl = comparison.improvements.iter().find(|c| c.metric == "spl").unwrap();
    assert_eq!(spl.change_percent, 100.0);
  }

  #[test]
  fn test_settings_differ() {
    let baseline = report(summary(4.0, 0.5, 0.45));
    let mut current = report(summary(4.0, 0.5, 0.45));
    current.metadata.error_margin = 2.0;

    let comparison = ComparisonReport::compare(&baseline, &current, 5.0);
    assert!(comparison.summary.settings_differ);
    assert!(comparison.to_markdown().contains("different splits"));
  }

  #[test]
  fn test_from_files_and_markdown() {
    let temp = TempDir::new().unwrap();
    let baseline_path = temp.path().join("baseline.json");
    let current_path = temp.path().join("current.json");
    report(summary(4.0, 0.5, 0.45)).save(&baseline_path).unwrap();
    report(summary(6.0, 0.3, 0.25)).save(&current_path).unwrap();

    let comparison = ComparisonReport::from_files(&baseline_path, &current_path, 10.0).unwrap();
    let md = comparison.to_markdown();

    assert!(md.contains("# Evaluation Comparison"));
    assert!(md.contains("FAIL"));
    assert!(md.contains("Regressions"));
    assert!(md.contains("| nav_error | 4.0000 | 6.0000 | +50.0% |"));
  }
}
