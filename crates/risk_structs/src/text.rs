use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a piece of unstructured text came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SourceType {
    ClaimDescription,
    CustomerReview,
    SupportChat,
    Other,
}

/// Free text tied to one customer, waiting for (or already through) scoring.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnstructuredText {
    pub text_id: i64,
    pub customer_id: i64,
    pub source_type: SourceType,
    pub raw_text: String,
    pub is_processed: bool,
    pub ingested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Input for ingesting a new text record.
#[derive(Debug, Clone)]
pub struct CreateUnstructuredText {
    pub customer_id: i64,
    pub source_type: SourceType,
    pub raw_text: String,
}
