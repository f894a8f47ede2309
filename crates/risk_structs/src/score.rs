use chrono::{DateTime, Utc};

/// One scoring event for a text, as stored in the history table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RiskScore {
    pub risk_score_id: i64,
    pub customer_id: i64,
    pub text_id: i64,
    pub model_id: i64,
    pub risk_label: String,
    pub risk_score: f64,
    pub explanation: Option<String>,
    pub scored_at: DateTime<Utc>,
}

/// The most recent score per customer (projection of [`RiskScore`]).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LatestRiskScore {
    pub customer_id: i64,
    pub risk_score_id: i64,
    pub text_id: i64,
    pub model_id: i64,
    pub risk_label: String,
    pub risk_score: f64,
    pub explanation: Option<String>,
    pub scored_at: DateTime<Utc>,
}

/// Input for appending a score to the history table.
#[derive(Debug, Clone)]
pub struct CreateRiskScore {
    pub customer_id: i64,
    pub text_id: i64,
    pub model_id: i64,
    pub risk_label: String,
    pub risk_score: f64,
    pub explanation: String,
}
