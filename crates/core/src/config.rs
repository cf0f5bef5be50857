//! Configuration for evaluation runs.
//!
//! Config priority: explicit path > working directory (navscore.toml) > user (~/.config/navscore/config.toml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::{DEFAULT_ERROR_MARGIN, EvalMode};

/// File name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "navscore.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("IO error reading {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("TOML parse error in {path}: {source}")]
  Toml {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("Invalid config: {0}")]
  Invalid(String),
}

// ============================================================================
// Scoring Configuration
// ============================================================================

/// How the SPL policy is chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSetting {
  /// Derive from the active splits
  #[default]
  Auto,
  Scored,
  HeldOut,
}

impl ModeSetting {
  /// Resolve against the splits being evaluated.
  pub fn resolve<S: AsRef<str>>(self, splits: &[S]) -> EvalMode {
    match self {
      ModeSetting::Auto => EvalMode::from_splits(splits),
      ModeSetting::Scored => EvalMode::Scored,
      ModeSetting::HeldOut => EvalMode::HeldOut,
    }
  }
}

impl std::str::FromStr for ModeSetting {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "auto" => Ok(ModeSetting::Auto),
      "scored" => Ok(ModeSetting::Scored),
      "held_out" | "held-out" | "heldout" => Ok(ModeSetting::HeldOut),
      _ => Err(format!("Invalid evaluation mode: {}", s)),
    }
  }
}

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
  /// Navigation error below which an episode succeeds (default: 3.0)
  pub error_margin: f64,

  /// SPL policy (default: auto)
  /// - auto: held-out when the only split is "test"
  /// - scored: always compute SPL
  /// - held_out: always report zero SPL
  pub mode: ModeSetting,

  /// Instruction ids that get a success/failure trace in the log
  pub trace_instr_ids: BTreeSet<String>,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self {
      error_margin: DEFAULT_ERROR_MARGIN,
      mode: ModeSetting::Auto,
      trace_instr_ids: BTreeSet::new(),
    }
  }
}

// ============================================================================
// Data Configuration
// ============================================================================

/// Input file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
  /// Directory holding `{scan}_connectivity.json` files
  pub connectivity_dir: PathBuf,

  /// Directory holding `{prefix}_{split}.json` ground-truth files
  pub dataset_dir: PathBuf,

  /// Dataset file prefix (default: "R2R")
  pub dataset_prefix: String,

  /// Load the `{prefix}_{split}_sub.json` subset files instead
  pub subset: bool,
}

impl Default for DataConfig {
  fn default() -> Self {
    Self {
      connectivity_dir: PathBuf::from("connectivity"),
      dataset_dir: PathBuf::from("data"),
      dataset_prefix: "R2R".to_string(),
      subset: false,
    }
  }
}

impl DataConfig {
  /// Path of the connectivity file for a scan.
  pub fn connectivity_path(&self, scan: &str) -> PathBuf {
    self.connectivity_dir.join(format!("{}_connectivity.json", scan))
  }

  /// Path of the ground-truth file for a split.
  pub fn dataset_path(&self, split: &str) -> PathBuf {
    let name = if self.subset {
      format!("{}_{}_sub.json", self.dataset_prefix, split)
    } else {
      format!("{}_{}.json", self.dataset_prefix, split)
    };
    self.dataset_dir.join(name)
  }
}

// ============================================================================
// Root Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
  /// Scoring rules
  #[serde(default)]
  pub scoring: ScoringConfig,

  /// Input locations
  #[serde(default)]
  pub data: DataConfig,
}

impl Config {
  /// Load config from an explicit path. Errors propagate.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Toml {
      path: path.to_path_buf(),
      source,
    })?;
    config.validate()?;
    Ok(config)
  }

  /// Load config for a working directory, with fallback to user config
  pub fn load_for_dir(dir: &Path) -> Self {
    let project_config = Self::project_config_path(dir);
    if project_config.exists() {
      match Self::load(&project_config) {
        Ok(config) => return config,
        Err(e) => debug!("Ignoring project config: {}", e),
      }
    }

    if let Some(user_config_path) = Self::user_config_path()
      && user_config_path.exists()
    {
      match Self::load(&user_config_path) {
        Ok(config) => return config,
        Err(e) => debug!("Ignoring user config: {}", e),
      }
    }

    Self::default()
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("NAVSCORE_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("navscore").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("navscore").join("config.toml"))
  }

  /// Get the working-directory config path
  pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(PROJECT_CONFIG_FILE)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let margin = self.scoring.error_margin;
    if !margin.is_finite() || margin <= 0.0 {
      return Err(ConfigError::Invalid(format!(
        "scoring.error_margin must be a positive number, got {}",
        margin
      )));
    }
    Ok(())
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    format!(
      r#"# navscore configuration
# Place in ./{project_file} or ~/.config/navscore/config.toml

# ============================================================================
# Scoring
# ============================================================================

[scoring]
# Navigation error (in connectivity units) below which an episode succeeds
error_margin = {margin:.1}

# SPL policy: auto, scored, or held_out
#   auto     = held_out when the only split is "test", scored otherwise
#   scored   = always compute SPL
#   held_out = report zero SPL for every instruction
mode = "auto"

# Instruction ids to trace in the log (success/failure, both paths on failure)
trace_instr_ids = []

# ============================================================================
# Data
# ============================================================================

[data]
# Directory with {{scan}}_connectivity.json files
connectivity_dir = "connectivity"

# Directory with {{prefix}}_{{split}}.json ground-truth files
dataset_dir = "data"
dataset_prefix = "R2R"

# Use {{prefix}}_{{split}}_sub.json subset files
subset = false
"#,
      project_file = PROJECT_CONFIG_FILE,
      margin = DEFAULT_ERROR_MARGIN,
    )
  }
}
