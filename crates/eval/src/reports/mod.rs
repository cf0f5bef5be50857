//! Report generation for evaluation results.
//!
//! - JSON: Machine-readable format for CI and comparison
//! - Markdown: Human-readable summary
//! - Comparison: Regression detection between runs

mod comparison;
mod json;
mod markdown;

use std::path::{Path, PathBuf};

pub use comparison::{ComparisonReport, ComparisonSummary, MetricChange};
pub use json::{EvaluationReport, ReportMetadata, RunInfo};
pub use markdown::MarkdownReport;

/// Write the JSON and Markdown reports for one run.
///
/// Returns the paths of the JSON and Markdown files.
pub fn generate_reports(report: &EvaluationReport, output_dir: &Path, run_name: &str) -> crate::Result<(PathBuf, PathBuf)> {
  std::fs::create_dir_all(output_dir)?;

  let json_path = output_dir.join(format!("{}.json", run_name));
  report.save(&json_path)?;

  let md_path = output_dir.join(format!("{}.md", run_name));
  MarkdownReport::from_report(report).save(&md_path)?;

  Ok((json_path, md_path))
}

#[cfg(test)]
mod tests {
  use super::*;
  use super::json::tests::{report, summary};
  use tempfile::TempDir;

  #[test]
  fn test_generate_reports() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("nested").join("reports");

    let (json_path, md_path) = generate_reports(&report(summary(2.0, 1.0, 0.9)), &output, "val_seen").unwrap();

    assert_eq!(json_path, output.join("val_seen.json"));
    assert_eq!(md_path, output.join("val_seen.md"));
    assert!(EvaluationReport::load(&json_path).is_ok());
    assert!(std::fs::read_to_string(&md_path).unwrap().contains("## Summary"));
  }
}
