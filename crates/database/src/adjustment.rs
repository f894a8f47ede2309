//! Repository functions for premium adjustment suggestions.

use chrono::Utc;
use risk_structs::{CreatePremiumAdjustment, DecisionStatus, PremiumAdjustment};
use sqlx::SqliteConnection;

/// Records a new `SUGGESTED` premium adjustment.
///
/// Suggestions are append-only: nothing supersedes an earlier suggestion for
/// the same policy.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_premium_adjustment(
    conn: &mut SqliteConnection,
    input: &CreatePremiumAdjustment,
) -> Result<PremiumAdjustment, sqlx::Error> {
    sqlx::query_as::<_, PremiumAdjustment>(
        r"
        INSERT INTO policy_premium_adjustment
            (policy_id, customer_id, model_id, risk_score_id, adjustment_pct, suggested_premium, decision_status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING adjustment_id, policy_id, customer_id, model_id, risk_score_id,
                  adjustment_pct, suggested_premium, decision_status, created_at
        ",
    )
    .bind(input.policy_id)
    .bind(input.customer_id)
    .bind(input.model_id)
    .bind(input.risk_score_id)
    .bind(input.adjustment_pct)
    .bind(input.suggested_premium)
    .bind(DecisionStatus::Suggested)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

/// Lists all adjustment suggestions for a customer, oldest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_adjustments_for_customer(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> Result<Vec<PremiumAdjustment>, sqlx::Error> {
    sqlx::query_as::<_, PremiumAdjustment>(
        r"
        SELECT adjustment_id, policy_id, customer_id, model_id, risk_score_id,
               adjustment_pct, suggested_premium, decision_status, created_at
        FROM policy_premium_adjustment
        WHERE customer_id = $1
        ORDER BY adjustment_id ASC
        ",
    )
    .bind(customer_id)
    .fetch_all(conn)
    .await
}
