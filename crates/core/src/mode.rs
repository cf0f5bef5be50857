use serde::{Deserialize, Serialize};

use crate::HELD_OUT_SPLIT;

/// Whether SPL is computed for an evaluation run.
///
/// Held-out runs report zero SPL for every instruction because the
/// authoritative comparison happens elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
  Scored,
  HeldOut,
}

impl EvalMode {
  /// Held-out only when the active splits are exactly the held-out split.
  pub fn from_splits<S: AsRef<str>>(splits: &[S]) -> Self {
    match splits {
      [only] if only.as_ref() == HELD_OUT_SPLIT => EvalMode::HeldOut,
      _ => EvalMode::Scored,
    }
  }

  pub fn computes_spl(self) -> bool {
    matches!(self, EvalMode::Scored)
  }
}

impl std::fmt::Display for EvalMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      EvalMode::Scored => write!(f, "scored"),
      EvalMode::HeldOut => write!(f, "held-out"),
    }
  }
}
