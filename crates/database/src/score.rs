//! Repository functions for the risk score history and its per-customer projection.

use chrono::{DateTime, Utc};
use risk_structs::{CreateRiskScore, LatestRiskScore, RiskScore};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

/// Rows per multi-row `INSERT`, keeping well under `SQLite`'s bind limit.
const INSERT_CHUNK_SIZE: usize = 500;

/// Appends score rows to the history table, all stamped with `scored_at`.
///
/// Returns the number of inserted rows.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_risk_scores(
    conn: &mut SqliteConnection,
    scores: &[CreateRiskScore],
    scored_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;

    for chunk in scores.chunks(INSERT_CHUNK_SIZE) {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "INSERT INTO customer_risk_score \
             (customer_id, text_id, model_id, risk_label, risk_score, explanation, scored_at) ",
        );
        builder.push_values(chunk, |mut row, score| {
            row.push_bind(score.customer_id)
                .push_bind(score.text_id)
                .push_bind(score.model_id)
                .push_bind(score.risk_label.as_str())
                .push_bind(score.risk_score)
                .push_bind(score.explanation.as_str())
                .push_bind(scored_at);
        });

        inserted += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

/// Finds the newest history row for a (customer, text, model) triple,
/// ordered by `scored_at` then `risk_score_id`.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_latest_score_for_text(
    conn: &mut SqliteConnection,
    customer_id: i64,
    text_id: i64,
    model_id: i64,
) -> Result<Option<RiskScore>, sqlx::Error> {
    sqlx::query_as::<_, RiskScore>(
        r"
        SELECT risk_score_id, customer_id, text_id, model_id, risk_label, risk_score, explanation, scored_at
        FROM customer_risk_score
        WHERE customer_id = $1 AND text_id = $2 AND model_id = $3
        ORDER BY scored_at DESC, risk_score_id DESC
        LIMIT 1
        ",
    )
    .bind(customer_id)
    .bind(text_id)
    .bind(model_id)
    .fetch_optional(conn)
    .await
}

/// Replaces the customer's row in the latest-score projection with `score`.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn upsert_latest_score(
    conn: &mut SqliteConnection,
    score: &RiskScore,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO customer_risk_score_latest
            (customer_id, risk_score_id, text_id, model_id, risk_label, risk_score, explanation, scored_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (customer_id) DO UPDATE SET
            risk_score_id = excluded.risk_score_id,
            text_id = excluded.text_id,
            model_id = excluded.model_id,
            risk_label = excluded.risk_label,
            risk_score = excluded.risk_score,
            explanation = excluded.explanation,
            scored_at = excluded.scored_at
        ",
    )
    .bind(score.customer_id)
    .bind(score.risk_score_id)
    .bind(score.text_id)
    .bind(score.model_id)
    .bind(&score.risk_label)
    .bind(score.risk_score)
    .bind(&score.explanation)
    .bind(score.scored_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Gets the projected latest score for a customer.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_latest_score(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> Result<Option<LatestRiskScore>, sqlx::Error> {
    sqlx::query_as::<_, LatestRiskScore>(
        r"
        SELECT customer_id, risk_score_id, text_id, model_id, risk_label, risk_score, explanation, scored_at
        FROM customer_risk_score_latest
        WHERE customer_id = $1
        ",
    )
    .bind(customer_id)
    .fetch_optional(conn)
    .await
}

/// Lists a customer's full score history, newest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_scores_for_customer(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> Result<Vec<RiskScore>, sqlx::Error> {
    sqlx::query_as::<_, RiskScore>(
        r"
        SELECT risk_score_id, customer_id, text_id, model_id, risk_label, risk_score, explanation, scored_at
        FROM customer_risk_score
        WHERE customer_id = $1
        ORDER BY scored_at DESC, risk_score_id DESC
        ",
    )
    .bind(customer_id)
    .fetch_all(conn)
    .await
}
