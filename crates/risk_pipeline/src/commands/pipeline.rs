//! Pipeline command - retrain, infer and rescore in one process.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

use super::infer::{self, InferOptions, InferenceReport};
use super::retrain::{self, RetrainOutcome};
use super::train::TrainRequest;

/// A stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PipelineStep {
    Retrain,
    Infer,
    Rescore,
}

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Retrain settings; `None` skips the retrain step.
    pub retrain: Option<TrainRequest>,
    pub retrain_threshold: i64,
    pub infer: InferOptions,
    /// Rescore window in days; zero or less skips the rescore step.
    pub rescore_recent_days: i64,
}

impl PipelineOptions {
    /// Steps this run will execute, in order.
    #[must_use]
    pub fn steps(&self) -> Vec<PipelineStep> {
        let mut steps = Vec::with_capacity(3);
        if self.retrain.is_some() {
            steps.push(PipelineStep::Retrain);
        }
        steps.push(PipelineStep::Infer);
        if self.rescore_recent_days > 0 {
            steps.push(PipelineStep::Rescore);
        }
        steps
    }
}

/// Results of the steps that ran.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub retrain: Option<RetrainOutcome>,
    pub infer: Option<InferenceReport>,
    pub rescore: Option<InferenceReport>,
}

/// Runs the pipeline. Each step commits its own work; the first failure
/// stops the run.
///
/// # Errors
///
/// Returns [`crate::PipelineError::Validation`] for invalid inference options
/// before any step runs, otherwise the failing step's error with the step
/// name attached.
pub async fn run(pool: &SqlitePool, options: &PipelineOptions) -> Result<PipelineReport> {
    options.infer.validate()?;

    let mut report = PipelineReport::default();

    for step in options.steps() {
        info!(%step, "Running pipeline step");
        match step {
            PipelineStep::Retrain => {
                let Some(request) = &options.retrain else {
                    continue;
                };
                let outcome = retrain::run(pool, options.retrain_threshold, request)
                    .await
                    .with_context(|| format!("pipeline step {step} failed"))?;
                report.retrain = Some(outcome);
            }
            PipelineStep::Infer => {
                let infer_options = options.infer.clone().with_rescore_recent_days(0);
                let result = infer::run(pool, &infer_options)
                    .await
                    .with_context(|| format!("pipeline step {step} failed"))?;
                report.infer = Some(result);
            }
            PipelineStep::Rescore => {
                let rescore_options = options
                    .infer
                    .clone()
                    .with_rescore_recent_days(options.rescore_recent_days);
                let result = infer::run(pool, &rescore_options)
                    .await
                    .with_context(|| format!("pipeline step {step} failed"))?;
                report.rescore = Some(result);
            }
        }
    }

    Ok(report)
}

#[must_use]
pub fn render_report(report: &PipelineReport) -> String {
    let mut lines = Vec::new();
    match &report.retrain {
        Some(outcome) => lines.push(retrain::render_outcome(outcome)),
        None => lines.push("Skipping retrain trigger (no training CSV provided).".to_string()),
    }
    if let Some(infer) = &report.infer {
        lines.push(infer::render_report(infer));
    }
    if let Some(rescore) = &report.rescore {
        lines.push(infer::render_report(rescore));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ml_model::TrainingConfig;

    use super::*;

    fn options(retrain: bool, rescore_recent_days: i64) -> PipelineOptions {
        PipelineOptions {
            retrain: retrain.then(|| TrainRequest {
                train_csv: PathBuf::from("train.csv"),
                model_name: "risk_classifier".into(),
                artifacts_dir: PathBuf::from("artifacts"),
                activate: true,
                training: TrainingConfig::default(),
            }),
            retrain_threshold: 20,
            infer: InferOptions::new("risk_classifier"),
            rescore_recent_days,
        }
    }

    #[test]
    fn test_steps_default() {
        assert_eq!(options(false, 0).steps(), vec![PipelineStep::Infer]);
    }

    #[test]
    fn test_steps_full() {
        assert_eq!(
            options(true, 30).steps(),
            vec![PipelineStep::Retrain, PipelineStep::Infer, PipelineStep::Rescore]
        );
    }

    #[test]
    fn test_negative_rescore_window_is_skipped() {
        assert_eq!(options(true, -1).steps(), vec![PipelineStep::Retrain, PipelineStep::Infer]);
    }
}
