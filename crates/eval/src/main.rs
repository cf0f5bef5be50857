//! Command-line evaluator for instruction-following navigation agents.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eval::reports::{ComparisonReport, EvaluationReport, RunInfo, generate_reports};
use eval::{Evaluation, Submission};
use graph::Environments;
use indicatif::{ProgressBar, ProgressStyle};
use navscore_core::{Config, ModeSetting};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "navscore")]
#[command(about = "Score navigation agent trajectories against ground-truth paths")]
#[command(version)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Score a submission against one or more splits
  Score {
    /// Splits to evaluate (comma-separated, e.g. val_seen,val_unseen)
    #[arg(short, long, value_delimiter = ',', required = true)]
    splits: Vec<String>,

    /// Submission file (JSON)
    #[arg(long)]
    submission: PathBuf,

    /// Output directory for reports
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name for the report files (default: the joined split names)
    #[arg(long)]
    name: Option<String>,

    /// Override the success threshold
    #[arg(long)]
    error_margin: Option<f64>,

    /// SPL policy: auto, scored, or held-out
    #[arg(long)]
    mode: Option<ModeSetting>,

    /// Instruction ids to trace (comma-separated)
    #[arg(long, value_delimiter = ',')]
    trace: Vec<String>,

    /// Config file (default: ./navscore.toml, then user config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
  },

  /// Compare two evaluation reports for regressions
  Compare {
    /// Baseline report file (JSON)
    baseline: PathBuf,

    /// Current report file (JSON)
    current: PathBuf,

    /// Regression threshold percentage
    #[arg(short, long, default_value = "10")]
    threshold: f64,

    /// Output comparison report
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Print navigation graph statistics for scans
  GraphStats {
    /// Scans to load (comma-separated)
    #[arg(short, long, value_delimiter = ',', required = true)]
    scans: Vec<String>,

    /// Config file (default: ./navscore.toml, then user config)
    #[arg(short, long)]
    config: Option<PathBuf>,
  },

  /// Write a default config file
  Init {
    /// Where to write the config
    #[arg(short, long, default_value = "navscore.toml")]
    output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
  },
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  // Setup logging; RUST_LOG overrides --verbose
  let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
  let subscriber = FmtSubscriber::builder()
    .with_env_filter(log_filter(level, std::env::var("RUST_LOG").ok().as_deref()))
    .with_target(false)
    .with_writer(std::io::stderr)
    .finish();
  tracing::subscriber::set_global_default(subscriber)?;

  match cli.command {
    Commands::Score {
      splits,
      submission,
      output,
      name,
      error_margin,
      mode,
      trace,
      config,
      no_progress,
    } => {
      let mut config = load_config(config.as_deref())?;
      if let Some(margin) = error_margin {
        config.scoring.error_margin = margin;
      }
      if let Some(mode) = mode {
        config.scoring.mode = mode;
      }
      config.scoring.trace_instr_ids.extend(trace);
      score(&config, &splits, &submission, output, name, no_progress)
    }
    Commands::Compare {
      baseline,
      current,
      threshold,
      output,
    } => compare(&baseline, &current, threshold, output),
    Commands::GraphStats { scans, config } => graph_stats(&load_config(config.as_deref())?, &scans),
    Commands::Init { output, force } => init(&output, force),
  }
}

/// Build the log filter: `RUST_LOG` directives when given, `level` otherwise.
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
  EnvFilter::builder()
    .with_default_directive(level.into())
    .parse_lossy(directives.unwrap_or_default())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
  match path {
    Some(path) => Ok(Config::load(path)?),
    None => Ok(Config::load_for_dir(&std::env::current_dir()?)),
  }
}

fn score(
  config: &Config,
  splits: &[String],
  submission: &Path,
  output: Option<PathBuf>,
  name: Option<String>,
  no_progress: bool,
) -> anyhow::Result<()> {
  if splits.iter().any(|s| s.trim().is_empty()) {
    anyhow::bail!("Split names must not be empty");
  }

  let evaluation = Evaluation::load(config, splits)?;
  let submission = Submission::load(submission)?;
  info!(
    "Scoring {} trajectories from {} ({} expected)",
    submission.len(),
    submission.source,
    evaluation.expected_count()
  );

  let pb = if !no_progress && std::io::stderr().is_terminal() {
    let pb = ProgressBar::new(evaluation.expected_count() as u64);
    pb.set_style(
      ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("#>-"),
    );
    Some(pb)
  } else {
    None
  };

  let outcome = evaluation.score_with(&submission, |score| {
    if let Some(ref pb) = pb {
      pb.set_message(score.instr_id.clone());
      pb.inc(1);
    }
  });

  if let Some(pb) = pb {
    pb.finish_and_clear();
  }
  let outcome = outcome?;

  let report = EvaluationReport::from_outcome(
    &outcome,
    &RunInfo {
      splits: evaluation.dataset().splits(),
      mode: evaluation.mode(),
      error_margin: evaluation.scorer().error_margin(),
      submission: &submission.source,
    },
  );

  let s = &outcome.summary;
  println!("Evaluated {} instructions on {}", outcome.instructions.len(), splits.join(","));
  println!("  nav_error:    {:.4}", s.nav_error);
  println!("  oracle_error: {:.4}", s.oracle_error);
  println!("  steps:        {:.4}", s.steps);
  println!("  lengths:      {:.4}", s.lengths);
  println!("  spl:          {:.4}", s.spl);
  println!("  success_rate: {:.4}", s.success_rate);
  println!("  oracle_rate:  {:.4}", s.oracle_rate);

  if let Some(output) = output {
    let run_name = name.unwrap_or_else(|| splits.join("_"));
    let (json_path, md_path) = generate_reports(&report, &output, &run_name)?;
    info!("Reports written to {} and {}", json_path.display(), md_path.display());
  }

  Ok(())
}

fn compare(baseline: &Path, current: &Path, threshold: f64, output: Option<PathBuf>) -> anyhow::Result<()> {
  if !threshold.is_finite() || threshold < 0.0 {
    anyhow::bail!("Threshold must be a non-negative percentage, got {}", threshold);
  }

  info!(
    "Comparing {} vs {} (threshold: {:.0}%)",
    baseline.display(),
    current.display(),
    threshold
  );

  let comparison = ComparisonReport::from_files(baseline, current, threshold)?;

  // Print markdown summary
  println!("{}", comparison.to_markdown());

  if let Some(output) = output {
    comparison.save(&output)?;
    info!("Comparison saved to: {}", output.display());
  }

  if !comparison.summary.passes {
    std::process::exit(1);
  }

  Ok(())
}

fn graph_stats(config: &Config, scans: &[String]) -> anyhow::Result<()> {
  let environments = Environments::load(&config.data, scans)?;

  println!("| Scan | Viewpoints | Edges | Diameter | Connected |");
  println!("|------|------------|-------|----------|-----------|");
  for env in environments.iter() {
    println!(
      "| {} | {} | {} | {:.2} | {} |",
      env.scan(),
      env.graph().viewpoint_count(),
      env.graph().edge_count(),
      env.distances().diameter(),
      if env.distances().is_connected() { "yes" } else { "no" }
    );
  }

  Ok(())
}

fn init(output: &Path, force: bool) -> anyhow::Result<()> {
  if output.exists() && !force {
    anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
  }
  std::fs::write(output, Config::generate_template())?;
  println!("Wrote {}", output.display());
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracing::level_filters::LevelFilter;

  #[test]
  fn test_log_filter_defaults_to_level() {
    assert_eq!(log_filter(Level::INFO, None).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(log_filter(Level::DEBUG, None).max_level_hint(), Some(LevelFilter::DEBUG));
  }

  #[test]
  fn test_log_filter_applies_directives() {
    let filter = log_filter(Level::INFO, Some("eval=trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

    let quiet = log_filter(Level::DEBUG, Some("warn"));
    assert_eq!(quiet.max_level_hint(), Some(LevelFilter::WARN));
  }
}
