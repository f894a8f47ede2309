//! Inference command - scores text and writes results back.
//!
//! One run is a single transaction: history rows, the latest-score
//! projection, processed flags, the audit event and premium suggestions
//! either all commit or all roll back.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use database::{
    CreatePipelineEvent, CreatePremiumAdjustment, CreateRiskScore, EventType, ModelMetadata,
    RiskLabel, UnstructuredText, suggested_premium,
};
use ml_model::{RiskClassifier, TextClassifier, score_texts};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::window_start;
use crate::PipelineError;

/// Rows scored per run unless overridden.
pub const DEFAULT_BATCH_SIZE: i64 = 50;

/// Options for one inference run.
#[derive(Debug, Clone)]
pub struct InferOptions {
    pub batch_size: i64,
    pub model_name: String,
    /// Artifact to load instead of the one registered for the active model.
    pub artifact_override: Option<PathBuf>,
    /// When positive, rescore everything ingested in the last N days.
    pub rescore_recent_days: i64,
}

impl InferOptions {
    #[must_use]
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            model_name: model_name.into(),
            artifact_override: None,
            rescore_recent_days: 0,
        }
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_artifact_override(mut self, path: Option<PathBuf>) -> Self {
        self.artifact_override = path;
        self
    }

    #[must_use]
    pub const fn with_rescore_recent_days(mut self, days: i64) -> Self {
        self.rescore_recent_days = days;
        self
    }

    /// Rejects a negative batch size, which SQLite would read as no limit.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] describing the bad option.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.batch_size < 0 {
            return Err(PipelineError::Validation(format!(
                "infer requires --batch-size >= 0, got {}",
                self.batch_size
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn mode(&self) -> SelectionMode {
        if self.rescore_recent_days > 0 {
            SelectionMode::Rescore {
                days: self.rescore_recent_days,
            }
        } else {
            SelectionMode::Unprocessed
        }
    }
}

/// Which texts a run selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Oldest texts not yet processed.
    Unprocessed,
    /// Texts ingested within the last `days`, whatever their processed state.
    Rescore { days: i64 },
}

impl SelectionMode {
    #[must_use]
    pub const fn event_type(self) -> EventType {
        match self {
            Self::Unprocessed => EventType::Infer,
            Self::Rescore { .. } => EventType::Rescore,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Unprocessed => "unprocessed".to_string(),
            Self::Rescore { days } => format!("last {days} days"),
        }
    }
}

/// Outcome of an inference run.
#[derive(Debug, Clone)]
pub struct InferenceReport {
    pub mode: SelectionMode,
    pub model_id: i64,
    pub model_version: String,
    pub artifact_path: PathBuf,
    pub texts_scored: usize,
    pub adjustments_created: usize,
}

/// Runs inference with the artifact loaded from disk.
///
/// # Errors
///
/// See [`run_with_loader`].
pub async fn run(pool: &SqlitePool, options: &InferOptions) -> Result<InferenceReport> {
    run_with_loader(pool, options, |path| {
        Ok(Box::new(TextClassifier::load(path)?) as Box<dyn RiskClassifier>)
    })
    .await
}

/// Runs inference, building the classifier with `load`.
///
/// # Errors
///
/// Returns a [`PipelineError`] if the options are invalid, there is no
/// active model or its artifact cannot be found (nothing is written), or any
/// error from the classifier or the database, in which case the whole run is
/// rolled back.
pub async fn run_with_loader<F>(
    pool: &SqlitePool,
    options: &InferOptions,
    load: F,
) -> Result<InferenceReport>
where
    F: FnOnce(&Path) -> Result<Box<dyn RiskClassifier>>,
{
    options.validate()?;

    let mut tx = pool.begin().await?;

    match score_batch(&mut *tx, options, load).await {
        Ok(report) => {
            tx.commit().await?;
            Ok(report)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn score_batch<F>(
    conn: &mut SqliteConnection,
    options: &InferOptions,
    load: F,
) -> Result<InferenceReport>
where
    F: FnOnce(&Path) -> Result<Box<dyn RiskClassifier>>,
{
    let mode = options.mode();

    let model = database::get_active_model(&mut *conn, &options.model_name)
        .await?
        .ok_or_else(|| PipelineError::NoActiveModel(options.model_name.clone()))?;

    let artifact_path = resolve_artifact_path(&model, options.artifact_override.as_deref())?;
    let classifier = load(&artifact_path)
        .with_context(|| format!("failed to load model artifact {}", artifact_path.display()))?;

    let mut report = InferenceReport {
        mode,
        model_id: model.model_id,
        model_version: model.model_version.clone(),
        artifact_path,
        texts_scored: 0,
        adjustments_created: 0,
    };

    let now = Utc::now();
    let texts = select_texts(&mut *conn, mode, options.batch_size, now).await?;
    if texts.is_empty() {
        info!(mode = %mode.describe(), "No texts to score");
        return Ok(report);
    }

    let raw: Vec<String> = texts.iter().map(|t| t.raw_text.clone()).collect();
    let scored = score_texts(classifier.as_ref(), &raw)?;

    let artifact_name = report
        .artifact_path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let explanation = format!("artifact={artifact_name}");

    let rows: Vec<CreateRiskScore> = texts
        .iter()
        .zip(&scored)
        .map(|(text, s)| CreateRiskScore {
            customer_id: text.customer_id,
            text_id: text.text_id,
            model_id: model.model_id,
            risk_label: s.label.clone(),
            risk_score: s.score,
            explanation: explanation.clone(),
        })
        .collect();
    database::insert_risk_scores(&mut *conn, &rows, now).await?;

    for text in &texts {
        let latest = database::find_latest_score_for_text(
            &mut *conn,
            text.customer_id,
            text.text_id,
            model.model_id,
        )
        .await?;
        if let Some(latest) = latest {
            database::upsert_latest_score(&mut *conn, &latest).await?;
        }
    }

    let text_ids: Vec<i64> = texts.iter().map(|t| t.text_id).collect();
    let newly_processed = database::mark_texts_processed(&mut *conn, &text_ids, now).await?;

    database::log_event(
        &mut *conn,
        &CreatePipelineEvent::model(
            mode.event_type(),
            Some(model.model_id),
            format!(
                "Scored {} texts with model_id={} artifact={artifact_name} window={}",
                texts.len(),
                model.model_id,
                mode.describe()
            ),
        ),
    )
    .await?;

    let mut adjustments_created = 0;
    for (text, s) in texts.iter().zip(&scored) {
        if suggest_adjustment(&mut *conn, text, &s.label, model.model_id).await? {
            adjustments_created += 1;
        }
    }

    report.texts_scored = texts.len();
    report.adjustments_created = adjustments_created;

    info!(
        mode = %mode.describe(),
        model_id = model.model_id,
        texts_scored = report.texts_scored,
        newly_processed,
        adjustments_created,
        "Inference complete"
    );

    Ok(report)
}

/// Chooses the artifact to load; the override wins over the registered path.
fn resolve_artifact_path(
    model: &ModelMetadata,
    artifact_override: Option<&Path>,
) -> Result<PathBuf> {
    let path = match artifact_override {
        Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
        _ => PathBuf::from(model.artifact_path.as_deref().unwrap_or_default().trim()),
    };

    if path.as_os_str().is_empty() {
        return Err(PipelineError::EmptyArtifactPath {
            model_id: model.model_id,
        }
        .into());
    }
    if !path.exists() {
        return Err(PipelineError::ArtifactNotFound { path }.into());
    }

    Ok(path)
}

async fn select_texts(
    conn: &mut SqliteConnection,
    mode: SelectionMode,
    batch_size: i64,
    now: DateTime<Utc>,
) -> Result<Vec<UnstructuredText>, sqlx::Error> {
    match mode {
        SelectionMode::Unprocessed => database::list_unprocessed_texts(conn, batch_size).await,
        SelectionMode::Rescore { days } => {
            database::list_texts_ingested_since(conn, window_start(now, days), batch_size).await
        }
    }
}

/// Records a premium suggestion for the customer's first active policy.
///
/// Returns `false` when the customer has no active policy or the score row
/// cannot be found. Suggestions are appended, so rescoring the same text
/// adds another row.
async fn suggest_adjustment(
    conn: &mut SqliteConnection,
    text: &UnstructuredText,
    label: &str,
    model_id: i64,
) -> Result<bool, sqlx::Error> {
    let Some(policy) = database::find_active_policy(&mut *conn, text.customer_id).await? else {
        debug!(customer_id = text.customer_id, "No active policy, skipping adjustment");
        return Ok(false);
    };

    let Some(score) =
        database::find_latest_score_for_text(&mut *conn, text.customer_id, text.text_id, model_id)
            .await?
    else {
        debug!(text_id = text.text_id, "No score row found, skipping adjustment");
        return Ok(false);
    };

    let adjustment_pct = RiskLabel::adjustment_pct_for(label);
    database::insert_premium_adjustment(
        conn,
        &CreatePremiumAdjustment {
            policy_id: policy.policy_id,
            customer_id: text.customer_id,
            model_id,
            risk_score_id: score.risk_score_id,
            adjustment_pct,
            suggested_premium: suggested_premium(policy.base_premium, adjustment_pct),
        },
    )
    .await?;

    Ok(true)
}

/// Renders a short summary of an inference run.
#[must_use]
pub fn render_report(report: &InferenceReport) -> String {
    if report.texts_scored == 0 {
        return format!("No texts to score ({}).", report.mode.describe());
    }
    format!(
        "{} completed: {} texts scored with model {} (model_id={}), \
         {} premium suggestions written.",
        report.mode.event_type(),
        report.texts_scored,
        report.model_version,
        report.model_id,
        report.adjustments_created
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(artifact_path: Option<&str>) -> ModelMetadata {
        ModelMetadata {
            model_id: 7,
            model_name: "risk_classifier".into(),
            model_version: "v1".into(),
            algorithm: "test".into(),
            trained_at: Utc::now(),
            trained_data_from: None,
            trained_data_to: None,
            eval_metric_name: None,
            eval_metric_value: None,
            is_active: true,
            artifact_path: artifact_path.map(str::to_string),
            notes: None,
        }
    }

    #[test]
    fn test_mode_from_options() {
        let options = InferOptions::new("m");
        assert_eq!(options.mode(), SelectionMode::Unprocessed);
        assert_eq!(options.mode().event_type(), EventType::Infer);

        let options = options.with_rescore_recent_days(7);
        assert_eq!(options.mode(), SelectionMode::Rescore { days: 7 });
        assert_eq!(options.mode().event_type(), EventType::Rescore);
    }

    #[test]
    fn test_negative_batch_size_is_rejected() {
        assert!(InferOptions::new("m").with_batch_size(0).validate().is_ok());
        assert!(matches!(
            InferOptions::new("m").with_batch_size(-1).validate(),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_artifact_path_is_fatal() {
        let err = resolve_artifact_path(&model(Some("  ")), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyArtifactPath { model_id: 7 })
        ));

        let err = resolve_artifact_path(&model(None), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyArtifactPath { .. })
        ));
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let err = resolve_artifact_path(&model(Some("/nonexistent/model.json")), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn test_override_takes_precedence() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let resolved =
            resolve_artifact_path(&model(Some("/nonexistent/model.json")), Some(file.path()))
                .expect("resolve");
        assert_eq!(resolved, file.path());
    }
}
