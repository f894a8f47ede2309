//! Repository functions for the pipeline audit log.

use chrono::Utc;
use risk_structs::{CreatePipelineEvent, EventType, PipelineEvent, truncate_message};
use sqlx::SqliteConnection;
use tracing::debug;

/// Writes an audit event. Messages are truncated to the stored maximum.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn log_event(
    conn: &mut SqliteConnection,
    event: &CreatePipelineEvent,
) -> Result<i64, sqlx::Error> {
    debug!(event_type = %event.event_type, message = %event.message, "Logging pipeline event");

    sqlx::query_scalar::<_, i64>(
        r"
        INSERT INTO pipeline_event (event_type, entity_type, entity_id, message, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING event_id
        ",
    )
    .bind(event.event_type)
    .bind(event.entity_type)
    .bind(event.entity_id)
    .bind(truncate_message(&event.message))
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

/// Lists events of one type, oldest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_events_by_type(
    conn: &mut SqliteConnection,
    event_type: EventType,
) -> Result<Vec<PipelineEvent>, sqlx::Error> {
    sqlx::query_as::<_, PipelineEvent>(
        r"
        SELECT event_id, event_type, entity_type, entity_id, message, created_at
        FROM pipeline_event
        WHERE event_type = $1
        ORDER BY event_id ASC
        ",
    )
    .bind(event_type)
    .fetch_all(conn)
    .await
}
