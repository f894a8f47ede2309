use std::path::PathBuf;

/// Failures the pipeline reports as configuration or input problems rather
/// than infrastructure errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No active model found for model_name='{0}'")]
    NoActiveModel(String),

    #[error("Model artifact path is empty (model_id={model_id})")]
    EmptyArtifactPath { model_id: i64 },

    #[error("Model artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("{0}")]
    Validation(String),
}
