//! Markdown report generation.

use super::json::EvaluationReport;
use crate::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Failed instructions listed in the report, worst first.
const WORST_FAILURES: usize = 10;

/// Markdown report generator.
pub struct MarkdownReport {
  content: String,
}

impl MarkdownReport {
  pub fn from_report(report: &EvaluationReport) -> Self {
    let mut content = String::new();

    Self::write_header(&mut content, report);
    Self::write_summary(&mut content, report);
    Self::write_scans_table(&mut content, report);
    Self::write_failures(&mut content, report);

    Self { content }
  }

  fn write_header(out: &mut String, report: &EvaluationReport) {
    let meta = &report.metadata;
    let _ = writeln!(out, "# Navigation Evaluation Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Generated:** {}", meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "**Version:** {}", meta.version);
    if let Some(commit) = &meta.git_commit {
      let _ = writeln!(out, "**Commit:** {}", commit);
    }
    let _ = writeln!(out, "**Submission:** {}", meta.submission);
    let _ = writeln!(out, "**Splits:** {}", meta.splits.join(", "));
    let _ = writeln!(out, "**Mode:** {}", meta.mode);
    let _ = writeln!(out, "**Error margin:** {:.2}m", meta.error_margin);
    let _ = writeln!(out);
  }

  fn write_summary(out: &mut String, report: &EvaluationReport) {
    let s = &report.summary;
    let total = report.metadata.total_instructions;

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(
      out,
      "| **Success Rate** | {:.1}% ({}/{}) |",
      s.success_rate * 100.0,
      report.successes(),
      total
    );
    let _ = writeln!(out, "| **Oracle Success Rate** | {:.1}% |", s.oracle_rate * 100.0);
    if report.metadata.mode.computes_spl() {
      let _ = writeln!(out, "| **SPL** | {:.4} |", s.spl);
    } else {
      let _ = writeln!(out, "| **SPL** | n/a |");
    }
    let _ = writeln!(out, "| **Navigation Error** | {:.2}m |", s.nav_error);
    let _ = writeln!(out, "| **Oracle Error** | {:.2}m |", s.oracle_error);
    let _ = writeln!(out, "| **Trajectory Length** | {:.2}m |", s.lengths);
    let _ = writeln!(out, "| **Steps** | {:.2} |", s.steps);
    match report.alignment.ratio() {
      Some(ratio) => {
        let _ = writeln!(out, "| **Single-step Accuracy** | {:.1}% |", ratio * 100.0);
      }
      None => {
        let _ = writeln!(out, "| **Single-step Accuracy** | n/a |");
      }
    }
    let _ = writeln!(out);
  }

  fn write_scans_table(out: &mut String, report: &EvaluationReport) {
    // scan -> (count, successes, nav error sum)
    let mut by_scan: std::collections::BTreeMap<&str, (usize, usize, f64)> = std::collections::BTreeMap::new();
    for score in &report.instructions {
      let entry = by_scan.entry(score.scan.as_str()).or_default();
      entry.0 += 1;
      entry.1 += usize::from(score.success);
      entry.2 += score.nav_error;
    }
    if by_scan.is_empty() {
      return;
    }

    let _ = writeln!(out, "## Scans");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Scan | Instructions | Success Rate | Nav Error |");
    let _ = writeln!(out, "|------|--------------|--------------|-----------|");
    for (scan, (count, successes, nav_sum)) in by_scan {
      let _ = writeln!(
        out,
        "| {} | {} | {:.1}% | {:.2}m |",
        scan,
        count,
        successes as f64 / count as f64 * 100.0,
        nav_sum / count as f64
      );
    }
    let _ = writeln!(out);
  }

  fn write_failures(out: &mut String, report: &EvaluationReport) {
    let mut failures: Vec<_> = report.instructions.iter().filter(|s| !s.success).collect();
    if failures.is_empty() {
      return;
    }
    failures.sort_by(|a, b| b.nav_error.total_cmp(&a.nav_error));

    let _ = writeln!(out, "## Worst Failures");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Instruction | Scan | Nav Error | Oracle Error | Length | Shortest |");
    let _ = writeln!(out, "|-------------|------|-----------|--------------|--------|----------|");
    for s in failures.iter().take(WORST_FAILURES) {
      let _ = writeln!(
        out,
        "| {} | {} | {:.2}m | {:.2}m | {:.2}m | {:.2}m |",
        s.instr_id, s.scan, s.nav_error, s.oracle_error, s.trajectory_length, s.shortest_path_length
      );
    }
    if failures.len() > WORST_FAILURES {
      let _ = writeln!(out);
      let _ = writeln!(out, "_{} more failures not shown._", failures.len() - WORST_FAILURES);
    }
    let _ = writeln!(out);
  }

  /// Save to a markdown file.
  pub fn save(&self, path: &Path) -> Result<()> {
    std::fs::write(path, &self.content)?;
    Ok(())
  }

  /// Get the markdown content.
  pub fn content(&self) -> &str {
    &self.content
  }
}
