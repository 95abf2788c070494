//! Tabular crop classifier.
//!
//! The artifact is a JSON-serialized decision-tree ensemble exported by the
//! training pipeline. It is loaded once at startup and shared read-only
//! across requests; `predict` returns the raw class id and resolving it to a
//! crop name stays with the caller.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

// ---

/// Length of the feature vector the ensemble was trained on:
/// `{N, P, K, temperature, humidity, ph, rainfall, soil_code}`.
pub const FEATURE_COUNT: usize = 8;

/// One node of a decision tree; children are arena indexes into the tree's
/// node list.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: i64,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Walk from the root until a leaf. Termination holds because `check`
    /// verified that children only point forward.
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> i64 {
        // ---
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Decision-tree ensemble over the 8-element feature vector.
#[derive(Debug, Serialize, Deserialize)]
pub struct CropClassifier {
    trees: Vec<Tree>,
}

impl CropClassifier {
    // ---
    /// Deserialize an artifact previously exported by the training pipeline.
    pub fn load(path: impl AsRef<Path>) -> Result<CropClassifier> {
        // ---
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening crop model {}", path.display()))?;
        let model: CropClassifier = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing crop model {}", path.display()))?;
        model.check()?;
        Ok(model)
    }

    /// Reject artifacts whose topology would break `predict`: empty trees,
    /// out-of-range feature indexes, or children that do not point strictly
    /// forward (cycles would never terminate).
    fn check(&self) -> Result<()> {
        // ---
        ensure!(!self.trees.is_empty(), "crop model has no trees");

        for (t, tree) in self.trees.iter().enumerate() {
            ensure!(!tree.nodes.is_empty(), "crop model tree {} is empty", t);
            for (i, node) in tree.nodes.iter().enumerate() {
                if let Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    ensure!(
                        *feature < FEATURE_COUNT,
                        "crop model tree {} node {}: feature index {} out of range",
                        t,
                        i,
                        feature
                    );
                    ensure!(
                        *left > i && *left < tree.nodes.len(),
                        "crop model tree {} node {}: bad left child {}",
                        t,
                        i,
                        left
                    );
                    ensure!(
                        *right > i && *right < tree.nodes.len(),
                        "crop model tree {} node {}: bad right child {}",
                        t,
                        i,
                        right
                    );
                }
            }
        }

        Ok(())
    }

    /// Predict a class id by majority vote over the ensemble.
    ///
    /// Ties resolve to the lowest class id so the result is deterministic.
    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> i64 {
        // ---
        let mut votes: BTreeMap<i64, usize> = BTreeMap::new();
        for tree in &self.trees {
            *votes.entry(tree.predict(features)).or_insert(0) += 1;
        }

        // BTreeMap iterates in ascending class order; strict `>` keeps the
        // lowest class on a tie. `check` guarantees at least one vote.
        let mut best = (0i64, 0usize);
        for (class, count) in votes {
            if count > best.1 {
                best = (class, count);
            }
        }
        best.0
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    /// Single tree: ph <= 6.0 -> class 1 (rice), else class 21 (chickpea).
    const SMALL_MODEL: &str = r#"
    {
        "trees": [
            {
                "nodes": [
                    { "kind": "split", "feature": 5, "threshold": 6.0, "left": 1, "right": 2 },
                    { "kind": "leaf", "class": 1 },
                    { "kind": "leaf", "class": 21 }
                ]
            }
        ]
    }
    "#;

    fn small_model() -> CropClassifier {
        // ---
        let model: CropClassifier = serde_json::from_str(SMALL_MODEL).expect("artifact parses");
        model.check().expect("artifact is well formed");
        model
    }

    #[test]
    fn single_tree_threshold_walk() {
        // ---
        let model = small_model();

        let acidic = [90.0, 42.0, 43.0, 20.8, 82.0, 5.5, 202.9, 0.0];
        let alkaline = [90.0, 42.0, 43.0, 20.8, 82.0, 7.5, 202.9, 0.0];

        assert_eq!(model.predict(&acidic), 1);
        assert_eq!(model.predict(&alkaline), 21);
    }

    #[test]
    fn majority_vote_across_trees() {
        // ---
        // Two trees always answer 2, one always answers 3.
        let model: CropClassifier = serde_json::from_str(
            r#"
            {
                "trees": [
                    { "nodes": [ { "kind": "leaf", "class": 2 } ] },
                    { "nodes": [ { "kind": "leaf", "class": 2 } ] },
                    { "nodes": [ { "kind": "leaf", "class": 3 } ] }
                ]
            }
            "#,
        )
        .unwrap();
        model.check().unwrap();

        assert_eq!(model.predict(&[0.0; FEATURE_COUNT]), 2);
    }

    #[test]
    fn vote_tie_resolves_to_lowest_class() {
        // ---
        let model: CropClassifier = serde_json::from_str(
            r#"
            {
                "trees": [
                    { "nodes": [ { "kind": "leaf", "class": 7 } ] },
                    { "nodes": [ { "kind": "leaf", "class": 4 } ] }
                ]
            }
            "#,
        )
        .unwrap();

        assert_eq!(model.predict(&[0.0; FEATURE_COUNT]), 4);
    }

    #[test]
    fn load_round_trips_through_a_file() {
        // ---
        let path = std::env::temp_dir().join(format!("crop-model-{}.json", std::process::id()));
        std::fs::write(&path, SMALL_MODEL).expect("write artifact");

        let model = CropClassifier::load(&path).expect("load artifact");
        assert_eq!(model.predict(&[0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0]), 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_missing_file() {
        // ---
        assert!(CropClassifier::load("/nonexistent/crop.json").is_err());
    }

    #[test]
    fn check_rejects_out_of_range_feature() {
        // ---
        let model: CropClassifier = serde_json::from_str(
            r#"
            {
                "trees": [
                    {
                        "nodes": [
                            { "kind": "split", "feature": 8, "threshold": 1.0, "left": 1, "right": 2 },
                            { "kind": "leaf", "class": 1 },
                            { "kind": "leaf", "class": 2 }
                        ]
                    }
                ]
            }
            "#,
        )
        .unwrap();

        assert!(model.check().is_err());
    }

    #[test]
    fn check_rejects_backward_child_links() {
        // ---
        // A child pointing at the root would loop forever.
        let model: CropClassifier = serde_json::from_str(
            r#"
            {
                "trees": [
                    {
                        "nodes": [
                            { "kind": "split", "feature": 0, "threshold": 1.0, "left": 0, "right": 1 },
                            { "kind": "leaf", "class": 1 }
                        ]
                    }
                ]
            }
            "#,
        )
        .unwrap();

        assert!(model.check().is_err());
    }

    #[test]
    fn check_rejects_empty_ensemble() {
        // ---
        let model: CropClassifier = serde_json::from_str(r#"{ "trees": [] }"#).unwrap();
        assert!(model.check().is_err());
    }
}
