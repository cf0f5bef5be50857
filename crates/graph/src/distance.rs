//! All-pairs shortest-path distances for one navigation graph.

use std::collections::HashMap;

use navscore_core::{ScanId, ViewpointId};
use petgraph::algo::dijkstra;

use crate::nav_graph::NavGraph;
use crate::{GraphError, Result};

/// Dense shortest-path matrix indexed by viewpoint.
///
/// Unreachable pairs hold `f64::INFINITY` and are reported as absent.
#[derive(Debug, Clone)]
pub struct DistanceTable {
  scan: ScanId,
  viewpoints: Vec<ViewpointId>,
  viewpoint_to_index: HashMap<ViewpointId, usize>,
  distances: Vec<f64>,
}

impl DistanceTable {
  /// Run Dijkstra from every viewpoint of the graph.
  pub fn build(graph: &NavGraph) -> Self {
    let inner = graph.inner();
    let n = inner.node_count();

    let viewpoints: Vec<ViewpointId> = graph.viewpoints().map(|v| v.id.clone()).collect();
    let viewpoint_to_index = viewpoints
      .iter()
      .enumerate()
      .map(|(i, id)| (id.clone(), i))
      .collect();

    let mut distances = vec![f64::INFINITY; n * n];
    for source in inner.node_indices() {
      let row = source.index() * n;
      for (target, cost) in dijkstra(inner, source, None, |e| *e.weight()) {
        distances[row + target.index()] = cost;
      }
    }

    Self {
      scan: graph.scan().to_string(),
      viewpoints,
      viewpoint_to_index,
      distances,
    }
  }

  pub fn scan(&self) -> &str {
    &self.scan
  }

  /// Number of viewpoints covered by the table.
  pub fn len(&self) -> usize {
    self.viewpoints.len()
  }

  pub fn is_empty(&self) -> bool {
    self.viewpoints.is_empty()
  }

  pub fn contains(&self, viewpoint: &str) -> bool {
    self.viewpoint_to_index.contains_key(viewpoint)
  }

  /// Shortest-path distance, or `None` when either viewpoint is unknown or
  /// the pair is disconnected.
  pub fn get(&self, from: &str, to: &str) -> Option<f64> {
    let i = *self.viewpoint_to_index.get(from)?;
    let j = *self.viewpoint_to_index.get(to)?;
    let d = self.distances[i * self.len() + j];
    d.is_finite().then_some(d)
  }

  /// Shortest-path distance. Unknown viewpoints and disconnected pairs are
  /// data errors.
  pub fn distance(&self, from: &str, to: &str) -> Result<f64> {
    let index = |viewpoint: &str| {
      self
        .viewpoint_to_index
        .get(viewpoint)
        .copied()
        .ok_or_else(|| GraphError::UnknownViewpoint {
          scan: self.scan.clone(),
          viewpoint: viewpoint.to_string(),
        })
    };
    let i = index(from)?;
    let j = index(to)?;

    let d = self.distances[i * self.len() + j];
    if d.is_finite() {
      Ok(d)
    } else {
      Err(GraphError::UnreachablePair {
        scan: self.scan.clone(),
        from: from.to_string(),
        to: to.to_string(),
      })
    }
  }

  /// Number of ordered (from, to) pairs with a finite distance, self-pairs
  /// included.
  pub fn reachable_pairs(&self) -> usize {
    self.distances.iter().filter(|d| d.is_finite()).count()
  }

  /// Largest finite shortest-path distance.
  pub fn diameter(&self) -> f64 {
    self
      .distances
      .iter()
      .copied()
      .filter(|d| d.is_finite())
      .fold(0.0, f64::max)
  }

  /// Whether every viewpoint reaches every other one.
  pub fn is_connected(&self) -> bool {
    self.reachable_pairs() == self.distances.len()
  }
}
