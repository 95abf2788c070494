//! Soil image classifier.
//!
//! The artifact is a JSON-serialized dense network exported by the training
//! pipeline: a list of layers, each holding a weight matrix, a bias vector,
//! and an activation. Inference is a feed-forward pass ending in a
//! full-vector softmax, so the output is a probability distribution over the
//! four soil labels.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use ndarray::{Array1, Array2};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::SoilCategory;

// ---

/// Activation applied after a dense layer. Softmax is vector-valued and is
/// applied over the whole layer output, not element-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Activation {
    Relu,
    Identity,
    Softmax,
}

/// On-disk layer representation; row-major weights, rows = output width.
#[derive(Debug, Deserialize)]
struct LayerSpec {
    weights: Vec<Vec<f32>>,
    biases: Vec<f32>,
    activation: Activation,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    layers: Vec<LayerSpec>,
}

struct DenseLayer {
    weights: Array2<f32>,
    biases: Array1<f32>,
    activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &Array1<f32>) -> Array1<f32> {
        // ---
        let z = self.weights.dot(input) + &self.biases;
        match self.activation {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Identity => z,
            Activation::Softmax => softmax(&z),
        }
    }
}

/// Numerically stable softmax: shift by the max before exponentiating.
fn softmax(z: &Array1<f32>) -> Array1<f32> {
    // ---
    let max = z.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp = z.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// Index and value of the largest probability; ties go to the lowest index.
///
/// There is deliberately no confidence threshold: the top class is returned
/// even when the distribution is nearly flat.
pub fn top_class(probabilities: &[f32]) -> (usize, f32) {
    // ---
    let mut best = (0, f32::MIN);
    for (i, &p) in probabilities.iter().enumerate() {
        if p > best.1 {
            best = (i, p);
        }
    }
    best
}

/// Dense network over preprocessed image input, loaded once at startup.
pub struct SoilClassifier {
    layers: Vec<DenseLayer>,
}

impl SoilClassifier {
    // ---
    /// Deserialize an artifact previously exported by the training pipeline.
    pub fn load(path: impl AsRef<Path>) -> Result<SoilClassifier> {
        // ---
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening soil model {}", path.display()))?;
        let artifact: Artifact = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing soil model {}", path.display()))?;
        Self::from_specs(artifact.layers)
    }

    /// Build the network, rejecting artifacts whose shapes do not chain or
    /// whose output does not cover the soil label set.
    fn from_specs(specs: Vec<LayerSpec>) -> Result<SoilClassifier> {
        // ---
        ensure!(!specs.is_empty(), "soil model has no layers");

        let mut layers = Vec::with_capacity(specs.len());
        let mut prev_width: Option<usize> = None;
        let mut final_activation = Activation::Identity;

        for (i, spec) in specs.into_iter().enumerate() {
            let rows = spec.weights.len();
            ensure!(rows > 0, "soil model layer {} has no weights", i);
            let cols = spec.weights[0].len();
            ensure!(cols > 0, "soil model layer {} has zero-width rows", i);
            ensure!(
                spec.weights.iter().all(|row| row.len() == cols),
                "soil model layer {} has ragged weight rows",
                i
            );
            ensure!(
                spec.biases.len() == rows,
                "soil model layer {}: {} biases for {} outputs",
                i,
                spec.biases.len(),
                rows
            );
            if let Some(prev) = prev_width {
                ensure!(
                    cols == prev,
                    "soil model layer {} expects {} inputs but layer {} produces {}",
                    i,
                    cols,
                    i - 1,
                    prev
                );
            }
            prev_width = Some(rows);
            final_activation = spec.activation;

            let flat: Vec<f32> = spec.weights.into_iter().flatten().collect();
            let weights = Array2::from_shape_vec((rows, cols), flat)
                .with_context(|| format!("soil model layer {} weight shape", i))?;

            layers.push(DenseLayer {
                weights,
                biases: Array1::from_vec(spec.biases),
                activation: spec.activation,
            });
        }

        ensure!(
            final_activation == Activation::Softmax,
            "soil model must end in a softmax layer"
        );
        let output_width = prev_width.unwrap_or(0);
        ensure!(
            output_width == SoilCategory::ALL.len(),
            "soil model predicts {} classes, expected {}",
            output_width,
            SoilCategory::ALL.len()
        );

        Ok(SoilClassifier { layers })
    }

    /// Run the feed-forward pass and return the probability vector over the
    /// four soil labels.
    pub fn predict(&self, input: Array1<f32>) -> Result<Vec<f32>, AppError> {
        // ---
        let expected = self.layers[0].weights.ncols();
        if input.len() != expected {
            return Err(AppError::Inference(format!(
                "input length {} does not match model input width {}",
                input.len(),
                expected
            )));
        }

        let mut current = input;
        for layer in &self.layers {
            current = layer.forward(&current);
        }
        Ok(current.to_vec())
    }

    /// Predict and reduce to (label, confidence) via argmax.
    pub fn classify(&self, input: Array1<f32>) -> Result<(SoilCategory, f32), AppError> {
        // ---
        let probabilities = self.predict(input)?;
        let (index, confidence) = top_class(&probabilities);
        let category = SoilCategory::from_code(index as u8).ok_or_else(|| {
            AppError::Inference(format!("argmax index {} outside the label set", index))
        })?;
        Ok((category, confidence))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    /// Single softmax layer, 3 inputs -> 4 outputs, weighted so the third
    /// input drives class 2.
    const SMALL_MODEL: &str = r#"
    {
        "layers": [
            {
                "weights": [
                    [1.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0],
                    [0.0, 0.0, 5.0],
                    [0.0, 0.0, 0.0]
                ],
                "biases": [0.0, 0.0, 0.0, 0.0],
                "activation": "softmax"
            }
        ]
    }
    "#;

    fn small_model() -> SoilClassifier {
        // ---
        let artifact: Artifact = serde_json::from_str(SMALL_MODEL).unwrap();
        SoilClassifier::from_specs(artifact.layers).unwrap()
    }

    #[test]
    fn argmax_and_confidence() {
        // ---
        let (index, confidence) = top_class(&[0.1, 0.7, 0.1, 0.1]);
        assert_eq!(index, 1);
        assert!((confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(SoilCategory::from_code(index as u8).unwrap().image_label(), "Black_Soil");
    }

    #[test]
    fn low_confidence_still_returns_top_class() {
        // ---
        // Nearly flat distribution: no thresholding, the argmax wins anyway.
        let (index, confidence) = top_class(&[0.26, 0.25, 0.25, 0.24]);
        assert_eq!(index, 0);
        assert!((confidence - 0.26).abs() < f32::EPSILON);
    }

    #[test]
    fn forward_pass_is_a_distribution() {
        // ---
        let model = small_model();
        let probs = model
            .predict(Array1::from_vec(vec![0.2, 0.1, 1.0]))
            .unwrap();

        assert_eq!(probs.len(), 4);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        // The third input feeds class 2 with a large weight.
        let (index, _) = top_class(&probs);
        assert_eq!(index, 2);
    }

    #[test]
    fn classify_maps_argmax_to_label() {
        // ---
        let model = small_model();
        let (category, confidence) = model
            .classify(Array1::from_vec(vec![0.0, 0.0, 1.0]))
            .unwrap();

        assert_eq!(category, SoilCategory::Clay);
        assert!(confidence > 0.5);
    }

    #[test]
    fn predict_rejects_wrong_input_width() {
        // ---
        let model = small_model();
        let err = model.predict(Array1::from_vec(vec![0.0; 7])).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }

    #[test]
    fn load_round_trips_through_a_file() {
        // ---
        let path = std::env::temp_dir().join(format!("soil-model-{}.json", std::process::id()));
        std::fs::write(&path, SMALL_MODEL).unwrap();

        let model = SoilClassifier::load(&path).expect("load artifact");
        assert!(model.predict(Array1::from_vec(vec![1.0, 0.0, 0.0])).is_ok());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_non_chaining_shapes() {
        // ---
        let artifact: Artifact = serde_json::from_str(
            r#"
            {
                "layers": [
                    { "weights": [[1.0, 0.0]], "biases": [0.0], "activation": "relu" },
                    { "weights": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 1.0]],
                      "biases": [0.0, 0.0, 0.0, 0.0], "activation": "softmax" }
                ]
            }
            "#,
        )
        .unwrap();

        assert!(SoilClassifier::from_specs(artifact.layers).is_err());
    }

    #[test]
    fn rejects_output_not_covering_labels() {
        // ---
        let artifact: Artifact = serde_json::from_str(
            r#"
            {
                "layers": [
                    { "weights": [[1.0], [1.0]], "biases": [0.0, 0.0], "activation": "softmax" }
                ]
            }
            "#,
        )
        .unwrap();

        assert!(SoilClassifier::from_specs(artifact.layers).is_err());
    }

    #[test]
    fn rejects_missing_final_softmax() {
        // ---
        let artifact: Artifact = serde_json::from_str(
            r#"
            {
                "layers": [
                    { "weights": [[1.0], [1.0], [1.0], [1.0]],
                      "biases": [0.0, 0.0, 0.0, 0.0], "activation": "relu" }
                ]
            }
            "#,
        )
        .unwrap();

        assert!(SoilClassifier::from_specs(artifact.layers).is_err());
    }
}
