use chrono::{DateTime, Utc};

/// ML model metadata stored in the database, one row per trained artifact.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ModelMetadata {
    pub model_id: i64,
    pub model_name: String,
    pub model_version: String,
    pub algorithm: String,
    pub trained_at: DateTime<Utc>,
    pub trained_data_from: Option<DateTime<Utc>>,
    pub trained_data_to: Option<DateTime<Utc>>,
    pub eval_metric_name: Option<String>,
    pub eval_metric_value: Option<f64>,
    pub is_active: bool,
    pub artifact_path: Option<String>,
    pub notes: Option<String>,
}

/// Input for registering a trained model.
#[derive(Debug, Clone)]
pub struct CreateModelMetadata {
    pub model_name: String,
    pub model_version: String,
    pub algorithm: String,
    pub trained_at: DateTime<Utc>,
    pub eval_metric_name: Option<String>,
    pub eval_metric_value: Option<f64>,
    pub artifact_path: String,
    pub notes: Option<String>,
}

/// One entry of a model name's activation history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ModelActivation {
    pub activation_id: i64,
    pub model_name: String,
    pub model_id: i64,
    pub model_version: String,
    pub activated_at: DateTime<Utc>,
}
