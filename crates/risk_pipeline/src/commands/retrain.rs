//! Retrain trigger - trains a new model once enough text is waiting.

use anyhow::Result;
use database::{CreatePipelineEvent, EventType};
use sqlx::SqlitePool;
use tracing::info;

use super::train::{self, TrainReport, TrainRequest};

/// Unprocessed text count that triggers retraining unless overridden.
pub const DEFAULT_RETRAIN_THRESHOLD: i64 = 20;

/// What the trigger decided.
#[derive(Debug, Clone)]
pub enum RetrainOutcome {
    Skipped { unprocessed: i64, threshold: i64 },
    Trained(Box<TrainReport>),
}

/// Retrains when at least `threshold` texts are unprocessed.
///
/// The `RETRAIN_START` event commits on its own before training starts, so
/// it survives a failed training run.
///
/// # Errors
///
/// Returns an error if the database or training fails.
pub async fn run(
    pool: &SqlitePool,
    threshold: i64,
    request: &TrainRequest,
) -> Result<RetrainOutcome> {
    let mut conn = pool.acquire().await?;
    let unprocessed = database::count_unprocessed_texts(&mut *conn).await?;

    if unprocessed < threshold {
        info!(unprocessed, threshold, "No retrain needed");
        return Ok(RetrainOutcome::Skipped {
            unprocessed,
            threshold,
        });
    }

    database::log_event(
        &mut *conn,
        &CreatePipelineEvent::system(
            EventType::RetrainStart,
            format!("Trigger retrain: unprocessed_texts={unprocessed} >= {threshold}"),
        ),
    )
    .await?;
    drop(conn);

    info!(unprocessed, threshold, "Retrain triggered");

    let report = train::run(pool, request).await?;
    Ok(RetrainOutcome::Trained(Box::new(report)))
}

#[must_use]
pub fn render_outcome(outcome: &RetrainOutcome) -> String {
    match outcome {
        RetrainOutcome::Skipped {
            unprocessed,
            threshold,
        } => format!("No retrain. Unprocessed texts={unprocessed} < threshold={threshold}"),
        RetrainOutcome::Trained(report) => train::render_report(report),
    }
}
