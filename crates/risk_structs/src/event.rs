use chrono::{DateTime, Utc};

/// Maximum stored length of an event message, in characters.
pub const EVENT_MESSAGE_MAX_CHARS: usize = 2000;

/// Kind of audit event written to `pipeline_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, strum::Display)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Ingest,
    Infer,
    Rescore,
    RetrainStart,
    RetrainEnd,
    ModelActivate,
}

/// Entity an audit event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, strum::Display)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    System,
    Model,
    Customer,
}

/// An audit log row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineEvent {
    pub event_id: i64,
    pub event_type: EventType,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Input for writing an audit event.
#[derive(Debug, Clone)]
pub struct CreatePipelineEvent {
    pub event_type: EventType,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub message: String,
}

impl CreatePipelineEvent {
    /// A system-level event with no entity reference.
    pub fn system(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            entity_type: EntityType::System,
            entity_id: None,
            message: message.into(),
        }
    }

    /// An event about a trained model.
    pub fn model(event_type: EventType, model_id: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            event_type,
            entity_type: EntityType::Model,
            entity_id: model_id,
            message: message.into(),
        }
    }
}

/// Truncates a message to [`EVENT_MESSAGE_MAX_CHARS`] characters.
#[must_use]
pub fn truncate_message(message: &str) -> &str {
    match message.char_indices().nth(EVENT_MESSAGE_MAX_CHARS) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}
