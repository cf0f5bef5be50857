//! Navigation graph for one environment using petgraph.
//!
//! Nodes are included viewpoints with their 3D positions; edges join
//! viewpoints that are mutually unobstructed and are weighted by the
//! Euclidean distance between them.

use std::collections::HashMap;

use navscore_core::{ScanId, ViewpointId};
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connectivity::{POSE_LEN, ViewpointRecord, load_connectivity};
use crate::{GraphError, Result};

/// Viewpoint position taken from the pose translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
  pub z: f64,
}

impl Position {
  pub fn new(x: f64, y: f64, z: f64) -> Self {
    Self { x, y, z }
  }

  /// Euclidean distance.
  pub fn distance(&self, other: &Position) -> f64 {
    let dx = self.x - other.x;
    let dy = self.y - other.y;
    let dz = self.z - other.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
  }
}

/// Graph node payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewpoint {
  pub id: ViewpointId,
  pub position: Position,
}

/// Weighted undirected navigation graph for a single scan.
#[derive(Debug)]
pub struct NavGraph {
  scan: ScanId,
  graph: UnGraph<Viewpoint, f64>,
  viewpoint_to_node: HashMap<ViewpointId, NodeIndex>,
}

impl NavGraph {
  /// Build the graph from raw connectivity records.
  ///
  /// Fails on a pose that is not a 4x4 transform, an `unobstructed` array
  /// that is not aligned to the record list, a repeated viewpoint id, or an
  /// edge asserted in one direction only.
  pub fn from_records(scan: &str, records: &[ViewpointRecord]) -> Result<Self> {
    let malformed = |reason: String| GraphError::MalformedConnectivity {
      scan: scan.to_string(),
      reason,
    };

    let mut graph: UnGraph<Viewpoint, f64> = UnGraph::with_capacity(records.len(), records.len() * 4);
    let mut viewpoint_to_node = HashMap::with_capacity(records.len());
    let mut nodes: Vec<Option<NodeIndex>> = Vec::with_capacity(records.len());

    for record in records {
      if record.unobstructed.len() != records.len() {
        return Err(malformed(format!(
          "viewpoint {} has {} unobstructed entries, expected {}",
          record.image_id,
          record.unobstructed.len(),
          records.len()
        )));
      }
      let Some(position) = record.position() else {
        return Err(malformed(format!(
          "viewpoint {} has a pose of length {}, expected {}",
          record.image_id,
          record.pose.len(),
          POSE_LEN
        )));
      };

      if !record.included {
        nodes.push(None);
        continue;
      }
      if viewpoint_to_node.contains_key(&record.image_id) {
        return Err(malformed(format!("duplicate viewpoint {}", record.image_id)));
      }

      let idx = graph.add_node(Viewpoint {
        id: record.image_id.clone(),
        position,
      });
      viewpoint_to_node.insert(record.image_id.clone(), idx);
      nodes.push(Some(idx));
    }

    for (i, record) in records.iter().enumerate() {
      let Some(from) = nodes[i] else { continue };

      for (j, other) in records.iter().enumerate() {
        if i == j || !record.unobstructed[j] {
          continue;
        }
        let Some(to) = nodes[j] else { continue };

        if !other.reaches(i) {
          return Err(GraphError::AsymmetricConnectivity {
            scan: scan.to_string(),
            from: record.image_id.clone(),
            to: other.image_id.clone(),
          });
        }

        // Each undirected edge is visited from both ends; keep one copy
        if i < j {
          let weight = graph[from].position.distance(&graph[to].position);
          graph.add_edge(from, to, weight);
        }
      }
    }

    debug!(
      "Built graph for {}: {} viewpoints, {} edges",
      scan,
      graph.node_count(),
      graph.edge_count()
    );

    Ok(Self {
      scan: scan.to_string(),
      graph,
      viewpoint_to_node,
    })
  }

  /// Load and build the graph from a connectivity file.
  pub fn load(scan: &str, path: &std::path::Path) -> Result<Self> {
    let records = load_connectivity(scan, path)?;
    Self::from_records(scan, &records)
  }

  pub fn scan(&self) -> &str {
    &self.scan
  }

  /// Check if a viewpoint exists in the graph.
  pub fn contains(&self, viewpoint: &str) -> bool {
    self.viewpoint_to_node.contains_key(viewpoint)
  }

  pub fn node_index(&self, viewpoint: &str) -> Option<NodeIndex> {
    self.viewpoint_to_node.get(viewpoint).copied()
  }

  pub fn position(&self, viewpoint: &str) -> Option<Position> {
    self.node_index(viewpoint).map(|idx| self.graph[idx].position)
  }

  /// Get the number of viewpoints in the graph.
  pub fn viewpoint_count(&self) -> usize {
    self.graph.node_count()
  }

  /// Get the number of navigable edges in the graph.
  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  /// Viewpoints in node-index order.
  pub fn viewpoints(&self) -> impl Iterator<Item = &Viewpoint> {
    self.graph.node_weights()
  }

  /// Directly navigable neighbours of a viewpoint.
  pub fn neighbors(&self, viewpoint: &str) -> Vec<&str> {
    let Some(idx) = self.node_index(viewpoint) else {
      return vec![];
    };
    self.graph.neighbors(idx).map(|n| self.graph[n].id.as_str()).collect()
  }

  /// Edge weight between two adjacent viewpoints.
  pub fn edge_weight(&self, a: &str, b: &str) -> Option<f64> {
    let a = self.node_index(a)?;
    let b = self.node_index(b)?;
    self.graph.find_edge(a, b).map(|e| self.graph[e])
  }

  /// Shortest route between two viewpoints, endpoints included.
  pub fn shortest_route(&self, from: &str, to: &str) -> Option<(f64, Vec<ViewpointId>)> {
    let start = self.node_index(from)?;
    let goal = self.node_index(to)?;

    let (cost, nodes) = astar(&self.graph, start, |n| n == goal, |e| *e.weight(), |_| 0.0)?;
    Some((cost, nodes.into_iter().map(|n| self.graph[n].id.clone()).collect()))
  }

  pub(crate) fn inner(&self) -> &UnGraph<Viewpoint, f64> {
    &self.graph
  }
}
