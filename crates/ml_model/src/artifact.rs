//! Persisted classifier artifact and inference.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use burn::backend::NdArray;
use burn::backend::ndarray::NdArrayDevice;
use burn::prelude::*;
use burn::tensor::activation::softmax;
use chrono::{DateTime, Utc};
use risk_structs::RiskLabel;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use text_features::TfidfVectorizer;
use uuid::Uuid;

use crate::{RiskClassifier, RiskModel};

/// Backend used for scoring.
pub type InferenceBackend = NdArray;

/// Algorithm tag recorded with every artifact and registry row.
pub const ALGORITHM: &str = "TFIDF+SoftmaxLinear";

const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Fitted vectorizer plus linear head, stored together so features are
/// always computed the same way at training and scoring time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextClassifier {
    format_version: u32,
    algorithm: String,
    vectorizer: TfidfVectorizer,
    classes: Vec<RiskLabel>,
    n_features: usize,
    /// Row-major `[n_features, classes.len()]`.
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl TextClassifier {
    /// Captures the parameters of a trained model.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensors cannot be read back or their shape
    /// does not match the vectorizer.
    pub fn from_model<B: Backend>(
        vectorizer: TfidfVectorizer,
        model: &RiskModel<B>,
    ) -> anyhow::Result<Self> {
        let classes: Vec<RiskLabel> = RiskLabel::iter().collect();
        let classifier = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            algorithm: ALGORITHM.to_string(),
            n_features: vectorizer.n_features(),
            vectorizer,
            weights: model.weights()?,
            bias: model.bias(classes.len())?,
            classes,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let n_classes = self.classes.len();
        anyhow::ensure!(n_classes > 0, "artifact has no classes");
        anyhow::ensure!(
            self.vectorizer.n_features() == self.n_features,
            "vectorizer has {} features, artifact expects {}",
            self.vectorizer.n_features(),
            self.n_features
        );
        anyhow::ensure!(
            self.weights.len() == self.n_features * n_classes,
            "weight matrix has {} values, expected {}x{}",
            self.weights.len(),
            self.n_features,
            n_classes
        );
        anyhow::ensure!(
            self.bias.len() == n_classes,
            "bias has {} values, expected {n_classes}",
            self.bias.len()
        );
        Ok(())
    }

    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Class probabilities per text, in `classes` order.
    ///
    /// # Errors
    ///
    /// Returns an error if the output tensor cannot be read back.
    pub fn probabilities<S: AsRef<str>>(&self, texts: &[S]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let n_classes = self.classes.len();
        let device = NdArrayDevice::default();
        let dense = self.vectorizer.transform_dense(texts);

        let inputs = Tensor::<InferenceBackend, 1>::from_floats(dense.as_slice(), &device)
            .reshape([texts.len(), self.n_features]);
        let weights = Tensor::<InferenceBackend, 1>::from_floats(self.weights.as_slice(), &device)
            .reshape([self.n_features, n_classes]);
        let bias = Tensor::<InferenceBackend, 1>::from_floats(self.bias.as_slice(), &device)
            .reshape([1, n_classes]);

        let probs = softmax(inputs.matmul(weights) + bias, 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("failed to read probabilities: {e:?}"))?;

        Ok(probs.chunks(n_classes).map(<[f32]>::to_vec).collect())
    }

    /// Most likely label and its probability per text. Ties go to the
    /// lower class index.
    ///
    /// # Errors
    ///
    /// See [`TextClassifier::probabilities`].
    pub fn predict<S: AsRef<str>>(&self, texts: &[S]) -> anyhow::Result<Vec<(RiskLabel, f32)>> {
        self.probabilities(texts)?
            .into_iter()
            .map(|row| -> anyhow::Result<(RiskLabel, f32)> {
                let (index, prob) = row
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });
                let label = self
                    .classes
                    .get(index)
                    .copied()
                    .context("class index out of range")?;
                Ok((label, prob))
            })
            .collect()
    }

    /// Writes the artifact as JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create artifact {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("failed to write artifact {}", path.display()))?;
        Ok(())
    }

    /// Reads and validates an artifact written by [`TextClassifier::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, malformed, or inconsistent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open artifact {}", path.display()))?;
        let classifier: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse artifact {}", path.display()))?;
        anyhow::ensure!(
            classifier.format_version == ARTIFACT_FORMAT_VERSION,
            "unsupported artifact format version {}",
            classifier.format_version
        );
        classifier.validate()?;
        Ok(classifier)
    }
}

impl RiskClassifier for TextClassifier {
    fn classify(&self, texts: &[String]) -> anyhow::Result<Vec<String>> {
        Ok(self
            .predict(texts)?
            .into_iter()
            .map(|(label, _)| label.to_string())
            .collect())
    }

    fn confidence(&self, texts: &[String]) -> anyhow::Result<Option<Vec<f64>>> {
        Ok(Some(
            self.predict(texts)?
                .into_iter()
                .map(|(_, prob)| f64::from(prob))
                .collect(),
        ))
    }
}

/// Builds a version string like `v20250301_142233_a1b2c3`.
#[must_use]
pub fn generate_model_version(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("v{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..6])
}

/// Artifact location for a model version.
#[must_use]
pub fn artifact_path_for(artifacts_dir: &Path, model_name: &str, version: &str) -> PathBuf {
    artifacts_dir.join(format!("{model_name}_{version}.model.json"))
}
