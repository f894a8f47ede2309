//! ML model crate for insurance text risk classification.
//!
//! This crate uses the Burn deep learning framework to train a linear
//! softmax classifier over TF-IDF features, persists it as a single
//! artifact file, and exposes it to the pipeline through the
//! [`RiskClassifier`] capability.

use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;
use text_features::VectorizerConfig;

mod artifact;
mod dataset;
mod training;

pub use artifact::*;
pub use dataset::*;
pub use training::*;

/// Confidence reported for classifiers that cannot produce probabilities.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// A trained text classifier as seen by the scoring pipeline.
pub trait RiskClassifier: Send + Sync {
    /// Predicts one label per text.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying model fails.
    fn classify(&self, texts: &[String]) -> anyhow::Result<Vec<String>>;

    /// Confidence in `[0, 1]` per text, or `None` if the model has no
    /// calibrated probabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying model fails.
    fn confidence(&self, texts: &[String]) -> anyhow::Result<Option<Vec<f64>>> {
        let _ = texts;
        Ok(None)
    }
}

/// A classifier decision ready to be written back.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredText {
    /// Upper-cased label.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub score: f64,
}

/// Classifies `texts` in one batch and attaches a confidence to each,
/// falling back to [`NEUTRAL_CONFIDENCE`] when the classifier has none.
///
/// # Errors
///
/// Returns an error if the classifier fails or returns the wrong number of
/// results.
pub fn score_texts(
    classifier: &dyn RiskClassifier,
    texts: &[String],
) -> anyhow::Result<Vec<ScoredText>> {
    let labels = classifier.classify(texts)?;
    anyhow::ensure!(
        labels.len() == texts.len(),
        "classifier returned {} labels for {} texts",
        labels.len(),
        texts.len()
    );

    let scores = match classifier.confidence(texts)? {
        Some(scores) => {
            anyhow::ensure!(
                scores.len() == texts.len(),
                "classifier returned {} confidences for {} texts",
                scores.len(),
                texts.len()
            );
            scores.into_iter().map(|s| s.clamp(0.0, 1.0)).collect()
        }
        None => vec![NEUTRAL_CONFIDENCE; texts.len()],
    };

    Ok(labels
        .into_iter()
        .zip(scores)
        .map(|(label, score)| ScoredText {
            label: label.to_uppercase(),
            score,
        })
        .collect())
}

/// Configuration for training the classifier.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Learning rate for the Adam optimizer.
    pub learning_rate: f64,
    /// Number of full-batch epochs.
    pub epochs: usize,
    /// Feature extraction settings.
    pub vectorizer: VectorizerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            epochs: 200,
            vectorizer: VectorizerConfig::default(),
        }
    }
}

impl TrainingConfig {
    #[must_use]
    pub const fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }
}

/// Linear softmax classifier over TF-IDF features.
///
/// Weights start at zero, so training is fully determined by the data and
/// the configuration.
#[derive(Module, Debug)]
pub struct RiskModel<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> RiskModel<B> {
    /// Creates a zero-initialized model.
    pub fn new(device: &B::Device, n_features: usize, n_classes: usize) -> Self {
        let linear = LinearConfig::new(n_features, n_classes)
            .with_initializer(Initializer::Zeros)
            .init(device);

        Self { linear }
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape [`batch_size`, `n_features`]
    ///
    /// # Returns
    ///
    /// Logits of shape [`batch_size`, `n_classes`].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(input)
    }

    /// Weight matrix, row-major `[n_features, n_classes]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor cannot be read back as `f32`.
    pub fn weights(&self) -> anyhow::Result<Vec<f32>> {
        self.linear
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("failed to read model weights: {e:?}"))
    }

    /// Bias vector of length `n_classes` (zeros if the layer has none).
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor cannot be read back as `f32`.
    pub fn bias(&self, n_classes: usize) -> anyhow::Result<Vec<f32>> {
        match &self.linear.bias {
            Some(bias) => bias
                .val()
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow::anyhow!("failed to read model bias: {e:?}")),
            None => Ok(vec![0.0; n_classes]),
        }
    }
}
