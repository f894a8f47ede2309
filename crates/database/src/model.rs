//! Model store: trained model registry and the active-model pointer.
//!
//! `ml_model_active` holds one row per logical model name and is the single
//! authority readers consult. Activation rewrites the per-row `is_active`
//! flags, swaps the pointer and appends to `ml_model_activation`, all on the
//! caller's connection so the caller's transaction makes the switch atomic.

use chrono::Utc;
use risk_structs::{CreateModelMetadata, ModelActivation, ModelMetadata};
use sqlx::SqliteConnection;
use tracing::info;

/// Registers a trained model. New rows start inactive.
///
/// # Errors
///
/// Returns an error if the database operation fails, including a duplicate
/// (name, version) pair.
pub async fn insert_model_metadata(
    conn: &mut SqliteConnection,
    input: &CreateModelMetadata,
) -> Result<ModelMetadata, sqlx::Error> {
    sqlx::query_as::<_, ModelMetadata>(
        r"
        INSERT INTO ml_model_metadata
            (model_name, model_version, algorithm, trained_at, eval_metric_name,
             eval_metric_value, is_active, artifact_path, notes)
        VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8)
        RETURNING model_id, model_name, model_version, algorithm, trained_at, trained_data_from,
                  trained_data_to, eval_metric_name, eval_metric_value, is_active, artifact_path, notes
        ",
    )
    .bind(&input.model_name)
    .bind(&input.model_version)
    .bind(&input.algorithm)
    .bind(input.trained_at)
    .bind(&input.eval_metric_name)
    .bind(input.eval_metric_value)
    .bind(&input.artifact_path)
    .bind(&input.notes)
    .fetch_one(conn)
    .await
}

/// Finds a model by name and version.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_model_by_name_version(
    conn: &mut SqliteConnection,
    name: &str,
    version: &str,
) -> Result<Option<ModelMetadata>, sqlx::Error> {
    sqlx::query_as::<_, ModelMetadata>(
        r"
        SELECT model_id, model_name, model_version, algorithm, trained_at, trained_data_from,
               trained_data_to, eval_metric_name, eval_metric_value, is_active, artifact_path, notes
        FROM ml_model_metadata
        WHERE model_name = $1 AND model_version = $2
        ",
    )
    .bind(name)
    .bind(version)
    .fetch_optional(conn)
    .await
}

/// Gets the model currently designated active for `name`, if any.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn get_active_model(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<ModelMetadata>, sqlx::Error> {
    sqlx::query_as::<_, ModelMetadata>(
        r"
        SELECT m.model_id, m.model_name, m.model_version, m.algorithm, m.trained_at,
               m.trained_data_from, m.trained_data_to, m.eval_metric_name, m.eval_metric_value,
               m.is_active, m.artifact_path, m.notes
        FROM ml_model_active a
        JOIN ml_model_metadata m ON m.model_id = a.model_id
        WHERE a.model_name = $1
        ",
    )
    .bind(name)
    .fetch_optional(conn)
    .await
}

/// Makes (`name`, `version`) the active model for `name`.
///
/// # Errors
///
/// Returns [`sqlx::Error::RowNotFound`] if the version is not registered, or
/// an error if a database operation fails.
pub async fn activate_model(
    conn: &mut SqliteConnection,
    name: &str,
    version: &str,
) -> Result<ModelMetadata, sqlx::Error> {
    let target = find_model_by_name_version(&mut *conn, name, version)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let activated_at = Utc::now();

    sqlx::query(
        r"
        UPDATE ml_model_metadata
        SET is_active = CASE WHEN model_id = $1 THEN 1 ELSE 0 END
        WHERE model_name = $2
        ",
    )
    .bind(target.model_id)
    .bind(name)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
        INSERT INTO ml_model_active (model_name, model_id, activated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (model_name) DO UPDATE SET
            model_id = excluded.model_id,
            activated_at = excluded.activated_at
        ",
    )
    .bind(name)
    .bind(target.model_id)
    .bind(activated_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
        INSERT INTO ml_model_activation (model_name, model_id, activated_at)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(name)
    .bind(target.model_id)
    .bind(activated_at)
    .execute(&mut *conn)
    .await?;

    info!(model_name = name, version, model_id = target.model_id, "Model activated");

    Ok(ModelMetadata {
        is_active: true,
        ..target
    })
}

/// Lists up to `limit` active models across all names, most recently trained first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_active_models(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<ModelMetadata>, sqlx::Error> {
    sqlx::query_as::<_, ModelMetadata>(
        r"
        SELECT m.model_id, m.model_name, m.model_version, m.algorithm, m.trained_at,
               m.trained_data_from, m.trained_data_to, m.eval_metric_name, m.eval_metric_value,
               m.is_active, m.artifact_path, m.notes
        FROM ml_model_active a
        JOIN ml_model_metadata m ON m.model_id = a.model_id
        ORDER BY m.trained_at DESC, m.model_id DESC
        LIMIT $1
        ",
    )
    .bind(limit)
    .fetch_all(conn)
    .await
}

/// Lists all versions of a model, newest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_model_versions(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Vec<ModelMetadata>, sqlx::Error> {
    sqlx::query_as::<_, ModelMetadata>(
        r"
        SELECT model_id, model_name, model_version, algorithm, trained_at, trained_data_from,
               trained_data_to, eval_metric_name, eval_metric_value, is_active, artifact_path, notes
        FROM ml_model_metadata
        WHERE model_name = $1
        ORDER BY trained_at DESC, model_id DESC
        ",
    )
    .bind(name)
    .fetch_all(conn)
    .await
}

/// Lists the activation history of a model name, oldest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_activations(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Vec<ModelActivation>, sqlx::Error> {
    sqlx::query_as::<_, ModelActivation>(
        r"
        SELECT h.activation_id, h.model_name, h.model_id, m.model_version, h.activated_at
        FROM ml_model_activation h
        JOIN ml_model_metadata m ON m.model_id = h.model_id
        WHERE h.model_name = $1
        ORDER BY h.activation_id ASC
        ",
    )
    .bind(name)
    .fetch_all(conn)
    .await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{create_memory_pool, run_migrations};

    fn new_model(name: &str, version: &str) -> CreateModelMetadata {
        CreateModelMetadata {
            model_name: name.to_string(),
            model_version: version.to_string(),
            algorithm: "TFIDF+SoftmaxLinear".to_string(),
            trained_at: Utc::now(),
            eval_metric_name: Some("F1".to_string()),
            eval_metric_value: Some(1.0),
            artifact_path: format!("artifacts/{name}_{version}.model.json"),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_activation_swaps_single_active_version() {
        let pool = create_memory_pool().await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        let mut conn = pool.acquire().await.expect("connection");

        insert_model_metadata(&mut conn, &new_model("risk_classifier", "v1"))
            .await
            .expect("insert v1");
        insert_model_metadata(&mut conn, &new_model("risk_classifier", "v2"))
            .await
            .expect("insert v2");

        assert!(get_active_model(&mut conn, "risk_classifier").await.expect("query").is_none());

        activate_model(&mut conn, "risk_classifier", "v1").await.expect("activate v1");
        activate_model(&mut conn, "risk_classifier", "v2").await.expect("activate v2");

        let active = get_active_model(&mut conn, "risk_classifier")
            .await
            .expect("query")
            .expect("active model");
        assert_eq!(active.model_version, "v2");
        assert!(active.is_active);

        let flagged: Vec<String> = list_model_versions(&mut conn, "risk_classifier")
            .await
            .expect("versions")
            .into_iter()
            .filter(|m| m.is_active)
            .map(|m| m.model_version)
            .collect();
        assert_eq!(flagged, vec!["v2".to_string()]);

        let history: Vec<String> = list_activations(&mut conn, "risk_classifier")
            .await
            .expect("history")
            .into_iter()
            .map(|a| a.model_version)
            .collect();
        assert_eq!(history, vec!["v1".to_string(), "v2".to_string()]);
    }

    #[tokio::test]
    async fn test_activation_of_unknown_version_fails() {
        let pool = create_memory_pool().await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        let mut conn = pool.acquire().await.expect("connection");

        let result = activate_model(&mut conn, "risk_classifier", "missing").await;
        assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
    }

    #[tokio::test]
    async fn test_active_models_are_scoped_per_name() {
        let pool = create_memory_pool().await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        let mut conn = pool.acquire().await.expect("connection");

        insert_model_metadata(&mut conn, &new_model("risk_classifier", "v1"))
            .await
            .expect("insert");
        insert_model_metadata(&mut conn, &new_model("fraud_classifier", "v1"))
            .await
            .expect("insert");
        activate_model(&mut conn, "risk_classifier", "v1").await.expect("activate");
        activate_model(&mut conn, "fraud_classifier", "v1").await.expect("activate");

        let active = list_active_models(&mut conn, 5).await.expect("list");
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|m| m.is_active));
    }
}
