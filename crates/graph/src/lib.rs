//! Navigation graphs and shortest-path distance tables.
//!
//! Each environment (scan) is loaded from its connectivity file into an
//! undirected graph weighted by Euclidean distance, then every pairwise
//! shortest-path distance is computed once and shared read-only by the
//! scorer.
//!
//! ## Key Concepts
//!
//! - **Connectivity**: raw per-viewpoint records (`included`, `pose`, `unobstructed`)
//! - **NavGraph**: the weighted graph built from those records (petgraph)
//! - **DistanceTable**: all-pairs shortest-path distances for one graph
//! - **Environments**: scan id -> graph + table, built once per run

pub mod connectivity;
pub mod distance;
pub mod environments;
pub mod nav_graph;

use std::path::PathBuf;

pub use connectivity::{POSE_LEN, ViewpointRecord, load_connectivity, parse_connectivity};
pub use distance::DistanceTable;
pub use environments::{Environment, Environments};
pub use nav_graph::{NavGraph, Position, Viewpoint};

use thiserror::Error;

/// Graph construction and lookup errors. All of them are data-integrity
/// faults that invalidate any metric computed from the environment.
#[derive(Debug, Error)]
pub enum GraphError {
  #[error("IO error reading {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("JSON error in connectivity for scan {scan}: {source}")]
  Json {
    scan: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Malformed connectivity for scan {scan}: {reason}")]
  MalformedConnectivity { scan: String, reason: String },

  #[error("Graph should be undirected: scan {scan} marks {from} -> {to} unobstructed but not {to} -> {from}")]
  AsymmetricConnectivity { scan: String, from: String, to: String },

  #[error("Unknown viewpoint {viewpoint} in scan {scan}")]
  UnknownViewpoint { scan: String, viewpoint: String },

  #[error("No path between {from} and {to} in scan {scan}")]
  UnreachablePair { scan: String, from: String, to: String },

  #[error("Unknown scan: {0}")]
  UnknownScan(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
