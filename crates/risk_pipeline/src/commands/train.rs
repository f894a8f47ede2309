//! Train command - fits a classifier from a labeled CSV and registers it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use database::{CreateModelMetadata, CreatePipelineEvent, EventType, ModelMetadata};
use ml_model::{
    ALGORITHM, DatasetError, LabeledDataset, TrainingConfig, TrainingOutput,
    artifact_path_for, generate_model_version, train_classifier,
};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::PipelineError;

/// Metric recorded for every trained model.
pub const EVAL_METRIC_NAME: &str = "F1";

/// Value recorded for [`EVAL_METRIC_NAME`]. Models are fit on the full
/// dataset with no held-out split, so this is a fixed placeholder.
pub const PLACEHOLDER_EVAL_METRIC: f64 = 1.0;

/// Parameters for one training run.
#[derive(Debug, Clone)]
pub struct TrainRequest {
    /// CSV with `raw_text,label` columns.
    pub train_csv: PathBuf,
    pub model_name: String,
    pub artifacts_dir: PathBuf,
    /// Make the new model the active one for `model_name`.
    pub activate: bool,
    pub training: TrainingConfig,
}

/// Result of a successful training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub model: ModelMetadata,
    pub artifact_path: PathBuf,
    pub activated: bool,
    pub output: TrainingOutput,
}

/// Runs the train command.
///
/// The artifact is written before the registry transaction starts; the
/// metadata row, optional activation and events commit together.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] for a malformed dataset, or an
/// error if training, writing the artifact, or the database fails.
pub async fn run(pool: &SqlitePool, request: &TrainRequest) -> Result<TrainReport> {
    info!(
        model_name = %request.model_name,
        train_csv = %request.train_csv.display(),
        "Starting training"
    );

    let dataset = load_dataset(&request.train_csv)?;
    info!(samples = dataset.len(), "Loaded training samples");

    let (classifier, output) = train_classifier(&dataset, &request.training)?;

    warn!(
        metric = EVAL_METRIC_NAME,
        value = PLACEHOLDER_EVAL_METRIC,
        "No held-out evaluation; recording placeholder metric"
    );

    let trained_at = Utc::now();
    let version = generate_model_version(trained_at);
    let artifact_path = artifact_path_for(&request.artifacts_dir, &request.model_name, &version);
    classifier.save(&artifact_path)?;

    let csv_name = request
        .train_csv
        .file_name()
        .map_or_else(
            || request.train_csv.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
    let artifact = artifact_path.display().to_string();

    let mut tx = pool.begin().await?;

    let mut model = database::insert_model_metadata(
        &mut *tx,
        &CreateModelMetadata {
            model_name: request.model_name.clone(),
            model_version: version.clone(),
            algorithm: ALGORITHM.to_string(),
            trained_at,
            eval_metric_name: Some(EVAL_METRIC_NAME.to_string()),
            eval_metric_value: Some(PLACEHOLDER_EVAL_METRIC),
            artifact_path: artifact.clone(),
            notes: Some(format!(
                "Trained from CSV={csv_name}; {} is a placeholder (no held-out split); \
                 train_accuracy={:.4}",
                EVAL_METRIC_NAME, output.train_accuracy
            )),
        },
    )
    .await?;

    if request.activate {
        model = database::activate_model(&mut *tx, &request.model_name, &version).await?;
        database::log_event(
            &mut *tx,
            &CreatePipelineEvent::model(
                EventType::ModelActivate,
                Some(model.model_id),
                format!("Activated model {} {version}", request.model_name),
            ),
        )
        .await?;
    }

    database::log_event(
        &mut *tx,
        &CreatePipelineEvent::model(
            EventType::RetrainEnd,
            Some(model.model_id),
            format!(
                "Trained {} {version}; {}={:.4}; activate={}; artifact={artifact}",
                request.model_name, EVAL_METRIC_NAME, PLACEHOLDER_EVAL_METRIC, request.activate
            ),
        ),
    )
    .await?;

    tx.commit().await?;

    info!(
        model_id = model.model_id,
        version = %version,
        artifact = %artifact,
        activated = request.activate,
        train_accuracy = output.train_accuracy,
        "Training complete"
    );

    Ok(TrainReport {
        model,
        artifact_path,
        activated: request.activate,
        output,
    })
}

/// Loads the training CSV, reporting content problems as validation errors.
fn load_dataset(path: &Path) -> Result<LabeledDataset> {
    match LabeledDataset::from_csv(path) {
        Ok(dataset) => Ok(dataset),
        Err(DatasetError::Csv(e)) => {
            Err(e).with_context(|| format!("failed to read training CSV {}", path.display()))
        }
        Err(e) => Err(PipelineError::Validation(e.to_string()).into()),
    }
}

/// Renders a one-line summary of a training run.
#[must_use]
pub fn render_report(report: &TrainReport) -> String {
    [
        "Training complete".to_string(),
        format!("Model version: {}", report.model.model_version),
        format!("Artifact: {}", report.artifact_path.display()),
        format!(
            "{EVAL_METRIC_NAME}: {PLACEHOLDER_EVAL_METRIC:.4} (placeholder), train accuracy: {:.4}",
            report.output.train_accuracy
        ),
        format!("Activated: {}", report.activated),
    ]
    .join("\n")
}
