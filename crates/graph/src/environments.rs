//! Per-scan graphs and distance tables, built once per evaluation run.

use std::collections::BTreeMap;

use navscore_core::{DataConfig, ScanId};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::distance::DistanceTable;
use crate::nav_graph::NavGraph;
use crate::{GraphError, Result};

/// One scan's graph together with its precomputed distances.
#[derive(Debug)]
pub struct Environment {
  graph: NavGraph,
  distances: DistanceTable,
}

impl Environment {
  pub fn new(graph: NavGraph) -> Self {
    let distances = DistanceTable::build(&graph);
    if !distances.is_connected() {
      warn!(
        "Scan {} is not fully connected ({} of {} viewpoint pairs reachable)",
        graph.scan(),
        distances.reachable_pairs(),
        distances.len() * distances.len()
      );
    }
    Self { graph, distances }
  }

  /// Load a connectivity file and build the table.
  pub fn load(scan: &str, path: &std::path::Path) -> Result<Self> {
    Ok(Self::new(NavGraph::load(scan, path)?))
  }

  pub fn scan(&self) -> &str {
    self.graph.scan()
  }

  pub fn graph(&self) -> &NavGraph {
    &self.graph
  }

  pub fn distances(&self) -> &DistanceTable {
    &self.distances
  }

  /// Shortest-path distance between two viewpoints of this scan.
  pub fn distance(&self, from: &str, to: &str) -> Result<f64> {
    self.distances.distance(from, to)
  }
}

/// Immutable scan id -> environment map shared by every scored instruction.
#[derive(Debug, Default)]
pub struct Environments {
  by_scan: BTreeMap<ScanId, Environment>,
}

impl Environments {
  /// Load every scan's connectivity file from the configured directory.
  ///
  /// Scans are independent, so graphs and tables are built in parallel.
  pub fn load<I, S>(data: &DataConfig, scans: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut scans: Vec<String> = scans.into_iter().map(|s| s.as_ref().to_string()).collect();
    scans.sort();
    scans.dedup();

    info!(
      "Loading navigation graphs for {} scans from {}",
      scans.len(),
      data.connectivity_dir.display()
    );

    let environments = scans
      .par_iter()
      .map(|scan| {
        let path = data.connectivity_path(scan);
        debug!("Loading {}", path.display());
        Environment::load(scan, &path)
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Self::from_environments(environments))
  }

  pub fn from_environments(environments: impl IntoIterator<Item = Environment>) -> Self {
    Self {
      by_scan: environments
        .into_iter()
        .map(|env| (env.scan().to_string(), env))
        .collect(),
    }
  }

  pub fn get(&self, scan: &str) -> Result<&Environment> {
    self
      .by_scan
      .get(scan)
      .ok_or_else(|| GraphError::UnknownScan(scan.to_string()))
  }

  pub fn len(&self) -> usize {
    self.by_scan.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_scan.is_empty()
  }

  /// Environments in scan id order.
  pub fn iter(&self) -> impl Iterator<Item = &Environment> {
    self.by_scan.values()
  }
}
