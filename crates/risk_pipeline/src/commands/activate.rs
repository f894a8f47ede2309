//! Activate command - points a model name at a registered version.

use anyhow::Result;
use database::{CreatePipelineEvent, EventType, ModelMetadata};
use sqlx::SqlitePool;
use tracing::info;

use crate::PipelineError;

/// Runs the activate command.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] if the version is not registered,
/// or a database error.
pub async fn run(pool: &SqlitePool, model_name: &str, version: &str) -> Result<ModelMetadata> {
    let mut tx = pool.begin().await?;

    let model = match database::activate_model(&mut *tx, model_name, version).await {
        Ok(model) => model,
        Err(sqlx::Error::RowNotFound) => {
            return Err(PipelineError::Validation(format!(
                "Model not found: model_name='{model_name}' version='{version}'"
            ))
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    database::log_event(
        &mut *tx,
        &CreatePipelineEvent::model(
            EventType::ModelActivate,
            Some(model.model_id),
            format!("Activated model {model_name} {version}"),
        ),
    )
    .await?;

    tx.commit().await?;

    info!(model_id = model.model_id, model_name, version, "Model activated");

    Ok(model)
}
