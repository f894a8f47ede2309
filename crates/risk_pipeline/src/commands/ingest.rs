//! Ingest command - stores a piece of customer text for scoring.

use anyhow::Result;
use database::{
    CreatePipelineEvent, CreateUnstructuredText, EntityType, EventType, SourceType,
    UnstructuredText,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::PipelineError;

/// Runs the ingest command.
///
/// The text is stored unprocessed so the next inference run picks it up.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] for a non-positive customer id or
/// blank text, or a database error (including an unknown customer).
pub async fn run(
    pool: &SqlitePool,
    customer_id: i64,
    source_type: SourceType,
    raw_text: &str,
) -> Result<UnstructuredText> {
    if customer_id <= 0 {
        return Err(PipelineError::Validation("ingest requires --customer-id > 0".into()).into());
    }
    if raw_text.trim().is_empty() {
        return Err(PipelineError::Validation("ingest requires non-empty --text".into()).into());
    }

    let mut tx = pool.begin().await?;

    let text = database::insert_text(
        &mut *tx,
        &CreateUnstructuredText {
            customer_id,
            source_type,
            raw_text: raw_text.to_string(),
        },
    )
    .await?;

    database::log_event(
        &mut *tx,
        &CreatePipelineEvent {
            event_type: EventType::Ingest,
            entity_type: EntityType::Customer,
            entity_id: Some(customer_id),
            message: format!(
                "Ingested text_id={} for customer_id={customer_id}, source_type={source_type}",
                text.text_id
            ),
        },
    )
    .await?;

    tx.commit().await?;

    info!(text_id = text.text_id, customer_id, %source_type, "Ingested unstructured text");

    Ok(text)
}
