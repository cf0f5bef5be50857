//! Shared types and configuration for navscore.
//!
//! Everything here is consumed by both the graph crate (connectivity and
//! distance tables) and the eval crate (scoring and reports).

pub mod config;
mod mode;

pub use config::{Config, ConfigError, DataConfig, ModeSetting, ScoringConfig};
pub use mode::EvalMode;

/// Opaque viewpoint identifier from the connectivity data.
pub type ViewpointId = String;

/// Environment (scan) identifier.
pub type ScanId = String;

/// Navigation error below which an episode counts as a success.
pub const DEFAULT_ERROR_MARGIN: f64 = 3.0;

/// Every ground-truth path carries this many instruction variants,
/// addressed as `{path_id}_{0..N}`.
pub const INSTRUCTIONS_PER_PATH: usize = 3;

/// Split whose goal distances are withheld, so SPL is not computed for it.
pub const HELD_OUT_SPLIT: &str = "test";
