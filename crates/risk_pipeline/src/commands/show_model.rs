//! Show-model command - active models and version history.

use anyhow::Result;
use database::{ModelActivation, ModelMetadata};
use sqlx::SqlitePool;

/// Active models listed at most.
pub const ACTIVE_MODEL_LIMIT: i64 = 5;

/// Renders the active models, or the versions and activation history of
/// `name` when `history` is set.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn run(pool: &SqlitePool, name: Option<&str>, history: bool) -> Result<String> {
    let mut conn = pool.acquire().await?;

    if let (Some(name), true) = (name, history) {
        let versions = database::list_model_versions(&mut *conn, name).await?;
        let activations = database::list_activations(&mut *conn, name).await?;
        return Ok(render_history(name, &versions, &activations));
    }

    let mut models = database::list_active_models(&mut *conn, ACTIVE_MODEL_LIMIT).await?;
    if let Some(name) = name {
        models.retain(|m| m.model_name == name);
    }
    Ok(render_active(&models))
}

#[must_use]
pub fn render_active(models: &[ModelMetadata]) -> String {
    if models.is_empty() {
        return "No active model.".to_string();
    }

    let mut lines = vec!["Active model(s):".to_string()];
    lines.extend(models.iter().map(|m| {
        format!(
            "- model_id={} {} {} {} trained_at={} metric={}={} artifact={}",
            m.model_id,
            m.model_name,
            m.model_version,
            m.algorithm,
            m.trained_at,
            m.eval_metric_name.as_deref().unwrap_or("None"),
            m.eval_metric_value.map_or_else(|| "None".to_string(), |v| v.to_string()),
            m.artifact_path.as_deref().unwrap_or("None"),
        )
    }));
    lines.join("\n")
}

#[must_use]
pub fn render_history(
    name: &str,
    versions: &[ModelMetadata],
    activations: &[ModelActivation],
) -> String {
    let mut lines = vec![format!("Versions of {name}:")];
    if versions.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(versions.iter().map(|m| {
        format!(
            "  {} model_id={} trained_at={}{}",
            m.model_version,
            m.model_id,
            m.trained_at,
            if m.is_active { " [active]" } else { "" }
        )
    }));

    lines.push(format!("Activations of {name}:"));
    if activations.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(activations.iter().map(|a| {
        format!("  {} {} (model_id={})", a.activated_at, a.model_version, a.model_id)
    }));
    lines.join("\n")
}
