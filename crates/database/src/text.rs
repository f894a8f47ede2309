//! Repository functions for unstructured text.

use chrono::{DateTime, Utc};
use risk_structs::{CreateUnstructuredText, UnstructuredText};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

/// Ingests a text record, stamped with the current time.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_text(
    conn: &mut SqliteConnection,
    input: &CreateUnstructuredText,
) -> Result<UnstructuredText, sqlx::Error> {
    insert_text_at(conn, input, Utc::now()).await
}

/// Ingests a text record with an explicit ingestion time.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_text_at(
    conn: &mut SqliteConnection,
    input: &CreateUnstructuredText,
    ingested_at: DateTime<Utc>,
) -> Result<UnstructuredText, sqlx::Error> {
    sqlx::query_as::<_, UnstructuredText>(
        r"
        INSERT INTO unstructured_text (customer_id, source_type, raw_text, is_processed, ingested_at)
        VALUES ($1, $2, $3, 0, $4)
        RETURNING text_id, customer_id, source_type, raw_text, is_processed, ingested_at, processed_at
        ",
    )
    .bind(input.customer_id)
    .bind(input.source_type)
    .bind(&input.raw_text)
    .bind(ingested_at)
    .fetch_one(conn)
    .await
}

/// Finds a text record by ID.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_text(
    conn: &mut SqliteConnection,
    text_id: i64,
) -> Result<Option<UnstructuredText>, sqlx::Error> {
    sqlx::query_as::<_, UnstructuredText>(
        r"
        SELECT text_id, customer_id, source_type, raw_text, is_processed, ingested_at, processed_at
        FROM unstructured_text
        WHERE text_id = $1
        ",
    )
    .bind(text_id)
    .fetch_optional(conn)
    .await
}

/// Lists up to `limit` unprocessed texts, oldest ingested first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_unprocessed_texts(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<UnstructuredText>, sqlx::Error> {
    sqlx::query_as::<_, UnstructuredText>(
        r"
        SELECT text_id, customer_id, source_type, raw_text, is_processed, ingested_at, processed_at
        FROM unstructured_text
        WHERE is_processed = 0
        ORDER BY ingested_at ASC, text_id ASC
        LIMIT $1
        ",
    )
    .bind(limit)
    .fetch_all(conn)
    .await
}

/// Lists up to `limit` texts ingested at or after `since`, oldest first,
/// regardless of processed state.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_texts_ingested_since(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<UnstructuredText>, sqlx::Error> {
    sqlx::query_as::<_, UnstructuredText>(
        r"
        SELECT text_id, customer_id, source_type, raw_text, is_processed, ingested_at, processed_at
        FROM unstructured_text
        WHERE ingested_at >= $1
        ORDER BY ingested_at ASC, text_id ASC
        LIMIT $2
        ",
    )
    .bind(since)
    .bind(limit)
    .fetch_all(conn)
    .await
}

/// Counts texts not yet consumed by inference.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn count_unprocessed_texts(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM unstructured_text WHERE is_processed = 0")
        .fetch_one(conn)
        .await
}

/// Marks the given texts processed, leaving already-processed rows (and their
/// `processed_at`) untouched.
///
/// Returns the number of rows that changed state.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn mark_texts_processed(
    conn: &mut SqliteConnection,
    text_ids: &[i64],
    processed_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    if text_ids.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("UPDATE unstructured_text SET is_processed = 1, processed_at = ");
    builder.push_bind(processed_at);
    builder.push(" WHERE text_id IN (");
    let mut ids = builder.separated(", ");
    for id in text_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") AND is_processed = 0");

    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}
