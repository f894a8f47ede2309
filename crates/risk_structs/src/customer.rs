use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Policy status that makes a policy eligible for premium suggestions.
pub const POLICY_STATUS_ACTIVE: &str = "ACTIVE";

/// Customer identity and contact details.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Customer {
    pub customer_id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a customer record.
#[derive(Debug, Clone, Default)]
pub struct CreateCustomer {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// An insurance policy held by a customer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Policy {
    pub policy_id: i64,
    pub customer_id: i64,
    pub product_type: Option<String>,
    pub base_premium: f64,
    pub status: String,
    pub effective_date: Option<DateTime<Utc>>,
}

impl Policy {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == POLICY_STATUS_ACTIVE
    }
}

/// Input for creating a policy record.
#[derive(Debug, Clone)]
pub struct CreatePolicy {
    pub customer_id: i64,
    pub product_type: Option<String>,
    pub base_premium: f64,
    pub status: String,
}

/// Review state of a premium adjustment suggestion.
///
/// Only `Suggested` is produced by the pipeline; the other states belong to
/// downstream review.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Suggested,
    Approved,
    Rejected,
}

/// A suggested premium change derived from a risk score.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PremiumAdjustment {
    pub adjustment_id: i64,
    pub policy_id: i64,
    pub customer_id: i64,
    pub model_id: i64,
    pub risk_score_id: i64,
    pub adjustment_pct: f64,
    pub suggested_premium: f64,
    pub decision_status: DecisionStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a premium adjustment suggestion.
#[derive(Debug, Clone)]
pub struct CreatePremiumAdjustment {
    pub policy_id: i64,
    pub customer_id: i64,
    pub model_id: i64,
    pub risk_score_id: i64,
    pub adjustment_pct: f64,
    pub suggested_premium: f64,
}
