//! Training logic for the risk classifier.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use risk_structs::RiskLabel;
use strum::EnumCount;
use text_features::TfidfVectorizer;
use tracing::{debug, info};

use crate::dataset::{LabeledDataset, TextBatch, TextBatcher};
use crate::{RiskModel, TextClassifier, TrainingConfig};

/// Backend used for training.
pub type TrainBackend = Autodiff<NdArray>;

/// Output from training.
#[derive(Debug, Clone)]
pub struct TrainingOutput {
    /// Cross-entropy loss at the last epoch.
    pub final_train_loss: f32,
    /// Fraction of training rows the fitted classifier labels correctly.
    pub train_accuracy: f64,
    /// Number of epochs completed.
    pub epochs_completed: usize,
}

/// Runs full-batch Adam with cross-entropy loss on `batch`.
///
/// Returns the loss at the final epoch.
///
/// # Errors
///
/// Returns an error if the loss cannot be read back from the backend.
pub fn train_model<B: AutodiffBackend>(
    model: &mut RiskModel<B>,
    batch: &TextBatch<B>,
    config: &TrainingConfig,
) -> anyhow::Result<f32> {
    let device = batch.inputs.device();
    let loss_fn = CrossEntropyLossConfig::new().init::<B>(&device);
    let mut optimizer = AdamConfig::new().init();
    let mut final_train_loss = 0.0;

    for epoch in 0..config.epochs {
        let logits = model.forward(batch.inputs.clone());
        let loss = loss_fn.forward(logits, batch.targets.clone());

        final_train_loss = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("failed to read loss: {e:?}"))?
            .first()
            .copied()
            .unwrap_or_default();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, model);
        *model = optimizer.step(config.learning_rate, model.clone(), grads);

        if epoch % 50 == 0 || epoch + 1 == config.epochs {
            debug!(epoch = epoch + 1, loss = final_train_loss, "training progress");
        }
    }

    Ok(final_train_loss)
}

/// Fits the vectorizer and the linear head on `dataset` and returns a
/// ready-to-save classifier.
///
/// # Errors
///
/// Returns an error if the dataset yields no features or training fails.
pub fn train_classifier(
    dataset: &LabeledDataset,
    config: &TrainingConfig,
) -> anyhow::Result<(TextClassifier, TrainingOutput)> {
    anyhow::ensure!(!dataset.is_empty(), "No training data provided");

    let texts = dataset.texts();
    let labels = dataset.labels();

    let vectorizer = TfidfVectorizer::fit(&texts, config.vectorizer)?;
    let n_features = vectorizer.n_features();
    let features = vectorizer.transform_dense(&texts);

    let device = NdArrayDevice::default();
    let mut model: RiskModel<TrainBackend> = RiskModel::new(&device, n_features, RiskLabel::COUNT);
    let batch = TextBatcher::<TrainBackend>::new(device).batch(&features, n_features, &labels);

    let final_train_loss = train_model(&mut model, &batch, config)?;

    let classifier = TextClassifier::from_model(vectorizer, &model)?;
    let predictions = classifier.predict(&texts)?;
    let correct = predictions
        .iter()
        .zip(&labels)
        .filter(|((predicted, _), actual)| predicted == *actual)
        .count();

    #[allow(clippy::cast_precision_loss)]
    let train_accuracy = correct as f64 / labels.len() as f64;

    info!(
        samples = labels.len(),
        features = n_features,
        loss = final_train_loss,
        train_accuracy,
        "Training complete"
    );

    Ok((
        classifier,
        TrainingOutput {
            final_train_loss,
            train_accuracy,
            epochs_completed: config.epochs,
        },
    ))
}
