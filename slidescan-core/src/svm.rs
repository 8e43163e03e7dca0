//! Linear SVM over HOG descriptors: the stock window classifier.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail, ensure};
use ndarray::Array1;
use serde::Deserialize;

use crate::{
    classifier::{Classifier, Label, Verdict},
    hog::HogDescriptor,
    window::{Patch, Size},
};

/// On-disk weights: a flat vector, or a one-row matrix as written by
/// common training tools.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WeightsRepr {
    Flat(Vec<f32>),
    Rows(Vec<Vec<f32>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BiasRepr {
    Scalar(f32),
    Vector(Vec<f32>),
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    weights: WeightsRepr,
    #[serde(alias = "intercept")]
    bias: BiasRepr,
}

/// Binary linear decision function `w·x + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSvm {
    weights: Array1<f32>,
    bias: f32,
}

impl LinearSvm {
    pub fn new(weights: Array1<f32>, bias: f32) -> Result<Self> {
        ensure!(!weights.is_empty(), "SVM weight vector is empty");
        ensure!(
            weights.iter().all(|w| w.is_finite()) && bias.is_finite(),
            "SVM weights and bias must be finite"
        );
        Ok(Self { weights, bias })
    }

    /// Load a model from a JSON file of the form `{"weights": [...], "bias": b}`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read SVM model {}", path.display()))?;
        let model = Self::from_json(&contents)
            .with_context(|| format!("failed to load SVM model {}", path.display()))?;
        log::debug!(
            "loaded linear SVM with {} weights from {}",
            model.feature_len(),
            path.display()
        );
        Ok(model)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let file: ModelFile =
            serde_json::from_str(contents).context("failed to parse SVM model JSON")?;

        let weights = match file.weights {
            WeightsRepr::Flat(weights) => weights,
            WeightsRepr::Rows(mut rows) if rows.len() == 1 => rows.remove(0),
            WeightsRepr::Rows(rows) => bail!(
                "model has {} weight rows; multi-class decision output is not supported",
                rows.len()
            ),
        };
        let bias = match file.bias {
            BiasRepr::Scalar(bias) => bias,
            BiasRepr::Vector(values) if values.len() == 1 => values[0],
            BiasRepr::Vector(values) => bail!(
                "model has {} intercepts; multi-class decision output is not supported",
                values.len()
            ),
        };
        Self::new(Array1::from(weights), bias)
    }

    /// Number of features the model expects.
    pub fn feature_len(&self) -> usize {
        self.weights.len()
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Signed distance-like score `w·x + b`.
    pub fn decision(&self, features: &Array1<f32>) -> Result<f32> {
        ensure!(
            features.len() == self.weights.len(),
            "descriptor has {} values but the model expects {}",
            features.len(),
            self.weights.len()
        );
        let decision = self.weights.dot(features) + self.bias;
        ensure!(decision.is_finite(), "SVM decision is not finite");
        Ok(decision)
    }

    /// Positive when the decision is strictly above zero; the decision value
    /// is the confidence.
    pub fn predict(&self, features: &Array1<f32>) -> Result<Verdict> {
        let decision = self.decision(features)?;
        let label = if decision > 0.0 {
            Label::Positive
        } else {
            Label::Negative
        };
        Ok(Verdict {
            label,
            confidence: decision,
        })
    }
}

/// HOG descriptor followed by a linear SVM.
#[derive(Debug, Clone)]
pub struct HogSvmClassifier {
    hog: HogDescriptor,
    svm: LinearSvm,
}

impl HogSvmClassifier {
    /// Pair a descriptor with a model, checking that windows of `window` size
    /// produce exactly as many features as the model has weights.
    pub fn new(hog: HogDescriptor, svm: LinearSvm, window: Size) -> Result<Self> {
        hog.validate(window)?;
        let expected = hog.descriptor_len(window);
        ensure!(
            expected == svm.feature_len(),
            "a {}x{} window yields {} HOG features but the model has {} weights",
            window.width,
            window.height,
            expected,
            svm.feature_len()
        );
        Ok(Self { hog, svm })
    }

    pub fn hog(&self) -> &HogDescriptor {
        &self.hog
    }

    pub fn svm(&self) -> &LinearSvm {
        &self.svm
    }
}

impl Classifier for HogSvmClassifier {
    fn classify(&self, patch: &Patch<'_>) -> Result<Verdict> {
        let features = self.hog.compute_patch(patch)?;
        self.svm.predict(&features)
    }
}
