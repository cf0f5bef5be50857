//! Per-instruction trajectory scoring.
//!
//! Compares one submitted trajectory with its ground-truth path using the
//! environment's shortest-path distances:
//! - navigation error: final viewpoint to goal
//! - oracle error: closest visited viewpoint to goal
//! - trajectory length: sum of distances between consecutive viewpoints
//! - SPL: success weighted by shortest-path length over travelled length

use std::collections::BTreeSet;
use std::ops::AddAssign;

use graph::Environment;
use navscore_core::{DEFAULT_ERROR_MARGIN, EvalMode, ViewpointId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::GroundTruth;
use crate::submission::TrajectoryStep;
use crate::{EvalError, Result};

/// Single-step directional agreement between a trajectory and its ground truth.
///
/// Diagnostic only; never part of the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAlignment {
  /// Times the trajectory stood on a ground-truth viewpoint with a step still to take
  pub candidates: usize,
  /// Of those, times its next viewpoint was the ground truth's next viewpoint
  pub matched: usize,
}

impl StepAlignment {
  /// Count over every (trajectory index, ground-truth index) pair.
  ///
  /// Repeated viewpoints on either side are counted once per occurrence.
  pub fn between(gt_path: &[ViewpointId], trajectory: &[TrajectoryStep]) -> Self {
    let mut alignment = Self::default();
    for step in trajectory.windows(2) {
      for gt_step in gt_path.windows(2) {
        if gt_step[0] == step[0].viewpoint {
          alignment.candidates += 1;
          if gt_step[1] == step[1].viewpoint {
            alignment.matched += 1;
          }
        }
      }
    }
    alignment
  }

  /// matched / candidates, if anything was a candidate.
  pub fn ratio(&self) -> Option<f64> {
    (self.candidates > 0).then(|| self.matched as f64 / self.candidates as f64)
  }
}

impl AddAssign for StepAlignment {
  fn add_assign(&mut self, other: Self) {
    self.candidates += other.candidates;
    self.matched += other.matched;
  }
}

/// Metrics for one scored instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionScore {
  pub instr_id: String,
  pub scan: String,
  /// Distance from the final viewpoint to the goal
  pub nav_error: f64,
  /// Distance from the closest visited viewpoint to the goal
  pub oracle_error: f64,
  /// Closest visited viewpoint (first one on ties)
  pub oracle_viewpoint: ViewpointId,
  /// Number of moves (`trajectory.len() - 1`)
  pub steps: usize,
  /// Sum of shortest-path distances between consecutive viewpoints
  pub trajectory_length: f64,
  /// Shortest-path distance from start to goal
  pub shortest_path_length: f64,
  pub spl: f64,
  pub success: bool,
  pub oracle_success: bool,
  pub alignment: StepAlignment,
}

/// Scores trajectories under a fixed error margin and SPL policy.
#[derive(Debug, Clone)]
pub struct Scorer {
  error_margin: f64,
  mode: EvalMode,
  trace_ids: BTreeSet<String>,
}

impl Default for Scorer {
  fn default() -> Self {
    Self::new(DEFAULT_ERROR_MARGIN, EvalMode::Scored)
  }
}

impl Scorer {
  pub fn new(error_margin: f64, mode: EvalMode) -> Self {
    Self {
      error_margin,
      mode,
      trace_ids: BTreeSet::new(),
    }
  }

  /// Instruction ids whose outcome is written to the log.
  pub fn with_trace(mut self, ids: impl IntoIterator<Item = String>) -> Self {
    self.trace_ids = ids.into_iter().collect();
    self
  }

  /// Whether scoring `instr_id` writes its outcome to the log.
  pub fn traces(&self, instr_id: &str) -> bool {
    self.trace_ids.contains(instr_id)
  }

  pub fn error_margin(&self) -> f64 {
    self.error_margin
  }

  pub fn mode(&self) -> EvalMode {
    self.mode
  }

  /// Whether a distance to the goal counts as reaching it.
  pub fn within_margin(&self, distance: f64) -> bool {
    distance < self.error_margin
  }

  /// Score one trajectory against its ground truth.
  ///
  /// The trajectory must be non-empty and start at the ground-truth start;
  /// anything else is not a valid result and is rejected.
  pub fn score(
    &self,
    env: &Environment,
    gt: &GroundTruth,
    instr_id: &str,
    trajectory: &[TrajectoryStep],
  ) -> Result<InstructionScore> {
    let (Some(first), Some(last)) = (trajectory.first(), trajectory.last()) else {
      return Err(EvalError::EmptyTrajectory {
        instr_id: instr_id.to_string(),
      });
    };

    let start = gt.start();
    let goal = gt.goal();
    if first.viewpoint != start {
      return Err(EvalError::StartMismatch {
        instr_id: instr_id.to_string(),
        expected: start.to_string(),
        actual: first.viewpoint.clone(),
      });
    }

    let alignment = StepAlignment::between(&gt.path, trajectory);

    let nav_error = env.distance(&last.viewpoint, goal)?;
    let (oracle_viewpoint, oracle_error) =
      nearest_to_goal(env, goal, trajectory)?.ok_or_else(|| EvalError::EmptyTrajectory {
        instr_id: instr_id.to_string(),
      })?;

    let mut trajectory_length = 0.0;
    for step in trajectory.windows(2) {
      trajectory_length += env.distance(&step[0].viewpoint, &step[1].viewpoint)?;
    }

    let shortest_path_length = env.distance(start, goal)?;
    let success = self.within_margin(nav_error);

    let spl = if self.mode.computes_spl() {
      success_weighted_length(success, shortest_path_length, trajectory_length)
    } else {
      0.0
    };

    let score = InstructionScore {
      instr_id: instr_id.to_string(),
      scan: gt.scan.clone(),
      nav_error,
      oracle_error,
      oracle_viewpoint: oracle_viewpoint.to_string(),
      steps: trajectory.len() - 1,
      trajectory_length,
      shortest_path_length,
      spl,
      success,
      oracle_success: self.within_margin(oracle_error),
      alignment,
    };

    if self.traces(instr_id) {
      self.trace(env, gt, &score, trajectory);
    }

    Ok(score)
  }

  fn trace(&self, env: &Environment, gt: &GroundTruth, score: &InstructionScore, trajectory: &[TrajectoryStep]) {
    if score.success {
      info!("{}: success (nav error {:.2})", score.instr_id, score.nav_error);
      return;
    }

    let model_path: Vec<&str> = trajectory.iter().map(|s| s.viewpoint.as_str()).collect();
    info!("{}: not success (nav error {:.2})", score.instr_id, score.nav_error);
    info!("  gt path: {:?}", gt.path);
    info!("  model path: {:?}", model_path);
    if let Some((cost, route)) = env.graph().shortest_route(gt.start(), gt.goal()) {
      info!("  shortest route ({:.2}): {:?}", cost, route);
    }
  }
}

/// Closest visited viewpoint to the goal, `None` for an empty trajectory.
///
/// Scans in order and only replaces the current best on a strictly smaller
/// distance, so ties keep the earliest viewpoint.
pub fn nearest_to_goal<'a>(
  env: &Environment,
  goal: &str,
  trajectory: &'a [TrajectoryStep],
) -> graph::Result<Option<(&'a str, f64)>> {
  let Some((first, rest)) = trajectory.split_first() else {
    return Ok(None);
  };

  let mut near_id = first.viewpoint.as_str();
  let mut near_d = env.distance(near_id, goal)?;
  for step in rest {
    let d = env.distance(&step.viewpoint, goal)?;
    if d < near_d {
      near_id = step.viewpoint.as_str();
      near_d = d;
    }
  }
  Ok(Some((near_id, near_d)))
}

/// `success * shortest / max(shortest, travelled)`.
///
/// A zero-length optimum reached without moving scores as the success
/// indicator itself.
pub fn success_weighted_length(success: bool, shortest: f64, travelled: f64) -> f64 {
  if !success {
    return 0.0;
  }
  let denom = shortest.max(travelled);
  if denom > 0.0 { shortest / denom } else { 1.0 }
}

#[cfg(test)]
mod tests {
  use super::*;
  use graph::{NavGraph, POSE_LEN, ViewpointRecord};

  fn record(id: &str, x: f64, y: f64) -> ViewpointRecord {
    let mut pose = vec![0.0; POSE_LEN];
    pose[3] = x;
    pose[7] = y;
    ViewpointRecord {
      image_id: id.to_string(),
      included: true,
      pose,
      unobstructed: vec![],
    }
  }

  fn env(points: &[(&str, f64, f64)], edges: &[(&str, &str)]) -> Environment {
    let mut records: Vec<ViewpointRecord> = points.iter().map(|&(id, x, y)| record(id, x, y)).collect();
    let n = records.len();
    for r in &mut records {
      r.unobstructed = vec![false; n];
    }
    let idx = |id: &str| points.iter().position(|p| p.0 == id).unwrap();
    for &(a, b) in edges {
      let (i, j) = (idx(a), idx(b));
      records[i].unobstructed[j] = true;
      records[j].unobstructed[i] = true;
    }
    Environment::new(NavGraph::from_records("test", &records).unwrap())
  }

  /// Unit square A-B-C-D-A.
  fn square() -> Environment {
    env(
      &[("A", 0.0, 0.0), ("B", 1.0, 0.0), ("C", 1.0, 1.0), ("D", 0.0, 1.0)],
      &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")],
    )
  }

  /// A straight corridor of five viewpoints two units apart.
  fn corridor() -> Environment {
    env(
      &[("p0", 0.0, 0.0), ("p1", 2.0, 0.0), ("p2", 4.0, 0.0), ("p3", 6.0, 0.0), ("p4", 8.0, 0.0)],
      &[("p0", "p1"), ("p1", "p2"), ("p2", "p3"), ("p3", "p4")],
    )
  }

  fn gt(path: &[&str]) -> GroundTruth {
    GroundTruth {
      path_id: 1,
      scan: "test".to_string(),
      path: path.iter().map(|s| s.to_string()).collect(),
      instructions: vec![],
      heading: None,
      distance: None,
    }
  }

  fn traj(viewpoints: &[&str]) -> Vec<TrajectoryStep> {
    viewpoints.iter().map(|v| TrajectoryStep::at(*v)).collect()
  }

  fn path(ids: &[&str]) -> Vec<ViewpointId> {
    ids.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_square_exact_path() {
    let score = Scorer::default()
      .score(&square(), &gt(&["A", "B", "C"]), "1_0", &traj(&["A", "B", "C"]))
      .unwrap();

    assert_eq!(score.nav_error, 0.0);
    assert_eq!(score.oracle_error, 0.0);
    assert_eq!(score.steps, 2);
    assert_eq!(score.trajectory_length, 2.0);
    assert!(score.success);
    assert!(score.oracle_success);
    assert_eq!(score.spl, 1.0);
  }

  #[test]
  fn test_exact_path_length_is_sum_of_gt_edges() {
    let env = env(
      &[("a", 0.0, 0.0), ("b", 3.0, 4.0), ("c", 3.0, 6.5), ("d", 7.0, 6.5)],
      &[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")],
    );
    let path = ["a", "b", "c"];
    let score = Scorer::default().score(&env, &gt(&path), "1_0", &traj(&path)).unwrap();

    assert_eq!(score.nav_error, 0.0);
    assert_eq!(score.oracle_error, 0.0);
    assert!((score.trajectory_length - 7.5).abs() < 1e-12);
    assert!((score.spl - 1.0).abs() < 1e-12);
  }

  #[test]
  fn test_start_mismatch_is_rejected() {
    let err = Scorer::default()
      .score(&square(), &gt(&["A", "B", "C"]), "1_0", &traj(&["B", "C"]))
      .unwrap_err();
    match err {
      EvalError::StartMismatch {
        instr_id,
        expected,
        actual,
      } => {
        assert_eq!(instr_id, "1_0");
        assert_eq!(expected, "A");
        assert_eq!(actual, "B");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn test_empty_trajectory_is_rejected() {
    let err = Scorer::default()
      .score(&square(), &gt(&["A", "B"]), "1_0", &[])
      .unwrap_err();
    assert!(matches!(err, EvalError::EmptyTrajectory { .. }));
  }

  #[test]
  fn test_unknown_viewpoint_is_fatal() {
    let err = Scorer::default()
      .score(&square(), &gt(&["A", "B"]), "1_0", &traj(&["A", "Z"]))
      .unwrap_err();
    assert!(matches!(err, EvalError::Graph(graph::GraphError::UnknownViewpoint { .. })));
  }

  #[test]
  fn test_overshoot_keeps_oracle_below_nav_error() {
    // Passes the goal at p2 and stops at p4
    let score = Scorer::default()
      .score(&corridor(), &gt(&["p0", "p1", "p2"]), "1_0", &traj(&["p0", "p1", "p2", "p3", "p4"]))
      .unwrap();

    assert_eq!(score.nav_error, 4.0);
    assert_eq!(score.oracle_error, 0.0);
    assert_eq!(score.oracle_viewpoint, "p2");
    assert!(score.oracle_error <= score.nav_error);
    assert!(!score.success);
    assert!(score.oracle_success);
    assert_eq!(score.spl, 0.0);
    assert_eq!(score.trajectory_length, 8.0);
    assert_eq!(score.steps, 4);
  }

  #[test]
  fn test_success_is_strictly_below_margin() {
    // Stops at p1, exactly 2.0 from the goal
    let scorer = Scorer::new(2.0, EvalMode::Scored);
    let score = scorer
      .score(&corridor(), &gt(&["p0", "p1", "p2"]), "1_0", &traj(&["p0", "p1"]))
      .unwrap();
    assert_eq!(score.nav_error, 2.0);
    assert!(!score.success);

    let scorer = Scorer::new(2.5, EvalMode::Scored);
    let score = scorer
      .score(&corridor(), &gt(&["p0", "p1", "p2"]), "1_0", &traj(&["p0", "p1"]))
      .unwrap();
    assert!(score.success);
    // shortest 4.0, travelled 2.0
    assert_eq!(score.spl, 1.0);
  }

  #[test]
  fn test_spl_penalises_detours() {
    // Goal p2 reached via a back-and-forth: travelled 8.0, shortest 4.0
    let score = Scorer::default()
      .score(&corridor(), &gt(&["p0", "p1", "p2"]), "1_0", &traj(&["p0", "p1", "p0", "p1", "p2"]))
      .unwrap();
    assert!(score.success);
    assert_eq!(score.trajectory_length, 8.0);
    assert_eq!(score.spl, 0.5);
  }

  #[test]
  fn test_held_out_mode_zeroes_spl() {
    let scorer = Scorer::new(DEFAULT_ERROR_MARGIN, EvalMode::HeldOut);
    let score = scorer
      .score(&square(), &gt(&["A", "B", "C"]), "1_0", &traj(&["A", "B", "C"]))
      .unwrap();
    assert!(score.success);
    assert_eq!(score.spl, 0.0);
  }

  #[test]
  fn test_single_viewpoint_trajectory() {
    let score = Scorer::default()
      .score(&square(), &gt(&["A"]), "1_0", &traj(&["A"]))
      .unwrap();
    assert_eq!(score.steps, 0);
    assert_eq!(score.trajectory_length, 0.0);
    assert!(score.success);
    assert_eq!(score.spl, 1.0);
    assert_eq!(score.alignment, StepAlignment::default());
  }

  #[test]
  fn test_nearest_keeps_first_on_ties() {
    let env = square();
    // B and D are both 1.0 from A
    let trajectory = traj(&["B", "D", "B"]);
    let (id, d) = nearest_to_goal(&env, "A", &trajectory).unwrap().unwrap();
    assert_eq!(id, "B");
    assert_eq!(d, 1.0);

    let trajectory = traj(&["A", "D", "C"]);
    let (id, _) = nearest_to_goal(&env, "B", &trajectory).unwrap().unwrap();
    assert_eq!(id, "A");

    assert!(nearest_to_goal(&env, "B", &[]).unwrap().is_none());
  }

  #[test]
  fn test_alignment_moves_only_on_exact_next_step() {
    let alignment = StepAlignment::between(&path(&["A", "B", "C"]), &traj(&["A", "B", "D", "C"]));
    // A -> B matches; B -> D does not; D and the final C have no candidates
    assert_eq!(alignment.candidates, 2);
    assert_eq!(alignment.matched, 1);
    assert_eq!(alignment.ratio(), Some(0.5));
  }

  #[test]
  fn test_alignment_counts_repeats() {
    let alignment = StepAlignment::between(&path(&["A", "B", "C"]), &traj(&["A", "D", "A", "B"]));
    assert_eq!(alignment.candidates, 2);
    assert_eq!(alignment.matched, 1);

    // Ground truth revisits A: each occurrence is its own candidate
    let alignment = StepAlignment::between(&path(&["A", "B", "A", "C"]), &traj(&["A", "C"]));
    assert_eq!(alignment.candidates, 2);
    assert_eq!(alignment.matched, 1);
  }

  #[test]
  fn test_alignment_empty() {
    let alignment = StepAlignment::between(&path(&["A"]), &traj(&["A", "B"]));
    assert_eq!(alignment, StepAlignment::default());
    assert_eq!(alignment.ratio(), None);
  }

  #[test]
  fn test_alignment_add_assign() {
    let mut total = StepAlignment::default();
    total += StepAlignment {
      candidates: 3,
      matched: 1,
    };
    total += StepAlignment {
      candidates: 1,
      matched: 1,
    };
    assert_eq!(total.candidates, 4);
    assert_eq!(total.matched, 2);
  }

  #[test]
  fn test_success_weighted_length() {
    assert_eq!(success_weighted_length(false, 4.0, 4.0), 0.0);
    assert_eq!(success_weighted_length(true, 4.0, 8.0), 0.5);
    assert_eq!(success_weighted_length(true, 4.0, 2.0), 1.0);
    assert_eq!(success_weighted_length(true, 0.0, 0.0), 1.0);
    assert_eq!(success_weighted_length(true, 0.0, 2.0), 0.0);
  }

  #[test]
  fn test_trace_does_not_change_score() {
    let traced = Scorer::default().with_trace(["1_0".to_string()]);
    assert!(traced.traces("1_0"));
    assert!(!traced.traces("1_1"));
    assert!(!Scorer::default().traces("1_0"));

    let score = traced
      .score(&square(), &gt(&["A", "B", "C"]), "1_0", &traj(&["A", "D"]))
      .unwrap();
    let untraced = Scorer::default()
      .score(&square(), &gt(&["A", "B", "C"]), "1_0", &traj(&["A", "D"]))
      .unwrap();

    assert!(score.success);
    assert_eq!(score.nav_error, 1.0);
    assert_eq!(score, untraced);
  }
}
