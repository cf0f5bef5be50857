//! On-disk fixtures shared by the evaluation integration tests.

#![allow(dead_code)]

use navscore_core::{Config, DataConfig};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Viewpoints of the "house" scan: a corridor a-b-c-e with a side room d off c.
///
/// Edge lengths: a-b 2, b-c 2, c-d 3, c-e 4.
pub const HOUSE: [(&str, f64, f64); 5] = [("a", 0.0, 0.0), ("b", 2.0, 0.0), ("c", 4.0, 0.0), ("d", 4.0, 3.0), ("e", 8.0, 0.0)];
pub const HOUSE_EDGES: [(&str, &str); 4] = [("a", "b"), ("b", "c"), ("c", "d"), ("c", "e")];

pub struct Fixture {
  pub dir: TempDir,
}

impl Fixture {
  pub fn new() -> Self {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("connectivity")).unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    Self { dir }
  }

  /// A fixture with the house scan and two val_seen paths through it.
  pub fn house() -> Self {
    let fixture = Self::new();
    fixture.write_connectivity("house", &connectivity(&HOUSE, &HOUSE_EDGES));
    fixture.write_split(
      "val_seen",
      json!([
        {"path_id": 100, "scan": "house", "path": ["a", "b", "c", "e"], "heading": 0.0,
         "instructions": ["walk to the end", "go down the hall", "stop at the far door"]},
        {"path_id": 200, "scan": "house", "path": ["a", "b", "c", "d"], "heading": 1.57,
         "instructions": ["enter the side room", "turn left at the end", "wait in the room"]}
      ]),
    );
    fixture
  }

  pub fn config(&self) -> Config {
    Config {
      data: DataConfig {
        connectivity_dir: self.dir.path().join("connectivity"),
        dataset_dir: self.dir.path().join("data"),
        ..Default::default()
      },
      ..Default::default()
    }
  }

  pub fn write_connectivity(&self, scan: &str, records: &Value) {
    let path = self
      .dir
      .path()
      .join("connectivity")
      .join(format!("{}_connectivity.json", scan));
    std::fs::write(path, records.to_string()).unwrap();
  }

  pub fn write_split(&self, split: &str, records: Value) {
    let path = self.dir.path().join("data").join(format!("R2R_{}.json", split));
    std::fs::write(path, records.to_string()).unwrap();
  }

  /// Write a submission of `(instr_id, "vp vp ...")` pairs and return its path.
  pub fn write_submission(&self, name: &str, entries: &[(&str, &str)]) -> std::path::PathBuf {
    let entries: Vec<Value> = entries
      .iter()
      .map(|(instr_id, viewpoints)| {
        let trajectory: Vec<Value> = viewpoints
          .split_whitespace()
          .map(|vp| json!([vp, 0.0, 0.0]))
          .collect();
        json!({"instr_id": instr_id, "trajectory": trajectory})
      })
      .collect();
    let path = self.dir.path().join(name);
    std::fs::write(&path, Value::Array(entries).to_string()).unwrap();
    path
  }
}

/// Connectivity records in the raw on-disk layout.
pub fn connectivity(viewpoints: &[(&str, f64, f64)], edges: &[(&str, &str)]) -> Value {
  let index = |id: &str| viewpoints.iter().position(|(v, _, _)| *v == id).unwrap();

  let mut unobstructed = vec![vec![false; viewpoints.len()]; viewpoints.len()];
  for &(a, b) in edges {
    unobstructed[index(a)][index(b)] = true;
    unobstructed[index(b)][index(a)] = true;
  }

  let records: Vec<Value> = viewpoints
    .iter()
    .enumerate()
    .map(|(i, &(id, x, y))| {
      let pose = [
        1.0, 0.0, 0.0, x, 0.0, 1.0, 0.0, y, 0.0, 0.0, 1.0, 1.5, 0.0, 0.0, 0.0, 1.0,
      ];
      json!({
        "image_id": id,
        "included": true,
        "pose": pose,
        "unobstructed": unobstructed[i],
        "height": 1.5
      })
    })
    .collect();
  Value::Array(records)
}
