//! Read-only projections for the dashboard and high-risk listings.

use chrono::{DateTime, Utc};
use risk_structs::{DecisionStatus, SourceType};
use sqlx::SqliteConnection;

/// Number of characters of raw text shown in the dashboard preview.
pub const TEXT_PREVIEW_CHARS: i64 = 160;

/// One customer's risk picture: latest score, its text and model, a policy
/// and the most recent premium suggestion. Every part but the customer may
/// be missing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerDashboard {
    pub customer_id: i64,
    pub full_name: String,
    pub text_id: Option<i64>,
    pub source_type: Option<SourceType>,
    pub ingested_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub text_preview: Option<String>,
    pub risk_score_id: Option<i64>,
    pub risk_label: Option<String>,
    pub risk_score: Option<f64>,
    pub scored_at: Option<DateTime<Utc>>,
    pub model_version: Option<String>,
    pub policy_id: Option<i64>,
    pub product_type: Option<String>,
    pub base_premium: Option<f64>,
    pub status: Option<String>,
    pub adjustment_pct: Option<f64>,
    pub suggested_premium: Option<f64>,
    pub decision_status: Option<DecisionStatus>,
    pub adjustment_time: Option<DateTime<Utc>>,
}

/// A customer ranked by latest risk score.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HighRiskCustomer {
    pub customer_id: i64,
    pub full_name: String,
    pub risk_label: String,
    pub risk_score: f64,
    pub scored_at: DateTime<Utc>,
}

/// Loads the dashboard row for a customer.
///
/// The policy shown is the customer's first `ACTIVE` policy, falling back to
/// their lowest-numbered policy.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn customer_dashboard(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> Result<Option<CustomerDashboard>, sqlx::Error> {
    sqlx::query_as::<_, CustomerDashboard>(
        r"
        SELECT
            c.customer_id, c.full_name,
            ut.text_id, ut.source_type, ut.ingested_at, ut.processed_at,
            substr(ut.raw_text, 1, $2) AS text_preview,
            crs.risk_score_id, crs.risk_label, crs.risk_score, crs.scored_at,
            mm.model_version,
            p.policy_id, p.product_type, p.base_premium, p.status,
            ppa.adjustment_pct, ppa.suggested_premium, ppa.decision_status,
            ppa.created_at AS adjustment_time
        FROM customer c
        LEFT JOIN customer_risk_score_latest crs ON crs.customer_id = c.customer_id
        LEFT JOIN unstructured_text ut ON ut.text_id = crs.text_id
        LEFT JOIN ml_model_metadata mm ON mm.model_id = crs.model_id
        LEFT JOIN policy p ON p.policy_id = (
            SELECT p2.policy_id
            FROM policy p2
            WHERE p2.customer_id = c.customer_id
            ORDER BY CASE WHEN p2.status = 'ACTIVE' THEN 0 ELSE 1 END, p2.policy_id
            LIMIT 1
        )
        LEFT JOIN policy_premium_adjustment ppa ON ppa.adjustment_id = (
            SELECT a.adjustment_id
            FROM policy_premium_adjustment a
            WHERE a.customer_id = c.customer_id
            ORDER BY a.created_at DESC, a.adjustment_id DESC
            LIMIT 1
        )
        WHERE c.customer_id = $1
        ",
    )
    .bind(customer_id)
    .bind(TEXT_PREVIEW_CHARS)
    .fetch_optional(conn)
    .await
}

/// Lists the `limit` customers with the highest latest score among scores
/// recorded at or after `since`.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn top_high_risk_customers(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<HighRiskCustomer>, sqlx::Error> {
    sqlx::query_as::<_, HighRiskCustomer>(
        r"
        SELECT c.customer_id, c.full_name, crs.risk_label, crs.risk_score, crs.scored_at
        FROM customer c
        JOIN customer_risk_score_latest crs ON crs.customer_id = c.customer_id
        WHERE crs.scored_at >= $1
        ORDER BY crs.risk_score DESC, c.customer_id ASC
        LIMIT $2
        ",
    )
    .bind(since)
    .bind(limit)
    .fetch_all(conn)
    .await
}
