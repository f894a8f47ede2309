mod common;

use chrono::{Duration, Utc};
use common::*;
use database::{DecisionStatus, EventType};
use pretty_assertions::assert_eq;
use risk_pipeline::PipelineError;
use risk_pipeline::commands::infer::{self, InferOptions, SelectionMode};

#[tokio::test]
async fn test_end_to_end_high_risk_support_chat() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let model = seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Casey Morgan", Some(2000.0)).await;
    let text_id = seed_text(&pool, customer_id, "The roof collapsed after the storm").await;

    let options = InferOptions::new(MODEL_NAME).with_batch_size(1);
    let report = infer::run_with_loader(&pool, &options, fixed_loader("high", Some(0.9)))
        .await
        .expect("inference");

    assert_eq!(report.mode, SelectionMode::Unprocessed);
    assert_eq!(report.model_id, model.model_id);
    assert_eq!(report.texts_scored, 1);
    assert_eq!(report.adjustments_created, 1);

    let mut conn = pool.acquire().await.expect("connection");

    let history = database::list_scores_for_customer(&mut conn, customer_id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].risk_label, "HIGH");
    assert!((history[0].risk_score - 0.9).abs() < 1e-9);
    assert_eq!(history[0].text_id, text_id);
    assert_eq!(
        history[0].explanation.as_deref(),
        Some("artifact=risk_classifier_v1.model.json")
    );

    let latest = database::find_latest_score(&mut conn, customer_id)
        .await
        .expect("latest")
        .expect("latest row");
    assert_eq!(latest.risk_score_id, history[0].risk_score_id);
    assert_eq!(latest.risk_label, "HIGH");

    let stored = database::find_text(&mut conn, text_id)
        .await
        .expect("text")
        .expect("text row");
    assert!(stored.is_processed);
    assert!(stored.processed_at.is_some());

    let adjustments = database::list_adjustments_for_customer(&mut conn, customer_id)
        .await
        .expect("adjustments");
    assert_eq!(adjustments.len(), 1);
    assert!((adjustments[0].adjustment_pct - 15.0).abs() < 1e-9);
    assert!((adjustments[0].suggested_premium - 2300.0).abs() < 1e-9);
    assert_eq!(adjustments[0].decision_status, DecisionStatus::Suggested);
    assert_eq!(adjustments[0].risk_score_id, history[0].risk_score_id);

    let events = database::list_events_by_type(&mut conn, EventType::Infer)
        .await
        .expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_id, Some(model.model_id));
    assert!(events[0].message.contains("Scored 1 texts"));
}

#[tokio::test]
async fn test_processed_text_is_not_reselected() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Riley Chen", Some(1000.0)).await;
    seed_text(&pool, customer_id, "Question about my bill").await;

    let options = InferOptions::new(MODEL_NAME);
    let first = infer::run_with_loader(&pool, &options, fixed_loader("LOW", None))
        .await
        .expect("first run");
    let second = infer::run_with_loader(&pool, &options, fixed_loader("LOW", None))
        .await
        .expect("second run");

    assert_eq!(first.texts_scored, 1);
    assert_eq!(second.texts_scored, 0);
    assert_eq!(count_rows(&pool, "customer_risk_score").await, 1);
    assert_eq!(count_rows(&pool, "policy_premium_adjustment").await, 1);
    assert_eq!(count_rows(&pool, "pipeline_event").await, 1);
}

#[tokio::test]
async fn test_missing_confidence_defaults_to_neutral() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Sam Patel", Some(1000.0)).await;
    seed_text(&pool, customer_id, "Small dent in the door").await;

    infer::run_with_loader(&pool, &InferOptions::new(MODEL_NAME), fixed_loader("Medium", None))
        .await
        .expect("inference");

    let mut conn = pool.acquire().await.expect("connection");
    let latest = database::find_latest_score(&mut conn, customer_id)
        .await
        .expect("latest")
        .expect("latest row");
    assert_eq!(latest.risk_label, "MEDIUM");
    assert!((latest.risk_score - 0.5).abs() < 1e-9);

    let adjustments = database::list_adjustments_for_customer(&mut conn, customer_id)
        .await
        .expect("adjustments");
    assert!((adjustments[0].suggested_premium - 1050.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_rescore_keeps_processed_timestamp_and_appends_adjustments() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Alex Kim", Some(1000.0)).await;
    let text_id = seed_text(&pool, customer_id, "Water leak in the kitchen").await;
    let old_text_id = seed_text_at(
        &pool,
        customer_id,
        "Old complaint",
        Utc::now() - Duration::days(30),
    )
    .await;

    let options = InferOptions::new(MODEL_NAME);
    infer::run_with_loader(&pool, &options, fixed_loader("MEDIUM", Some(0.7)))
        .await
        .expect("inference");
    let processed_at = text(&pool, text_id).await.processed_at;
    assert!(processed_at.is_some());

    let rescore = options.clone().with_rescore_recent_days(7);
    let report = infer::run_with_loader(&pool, &rescore, fixed_loader("HIGH", Some(0.8)))
        .await
        .expect("rescore");

    assert_eq!(report.mode, SelectionMode::Rescore { days: 7 });
    assert_eq!(report.texts_scored, 1);

    let rescored = text(&pool, text_id).await;
    assert!(rescored.is_processed);
    assert_eq!(rescored.processed_at, processed_at);
    assert!(text(&pool, old_text_id).await.is_processed);

    // Two scoring runs touch the recent text, each appending a suggestion.
    assert_eq!(count_rows(&pool, "customer_risk_score").await, 3);
    assert_eq!(count_rows(&pool, "policy_premium_adjustment").await, 3);

    let mut conn = pool.acquire().await.expect("connection");
    let latest = database::find_latest_score(&mut conn, customer_id)
        .await
        .expect("latest")
        .expect("latest row");
    assert_eq!(latest.risk_label, "HIGH");
    assert_eq!(latest.text_id, text_id);

    let events = database::list_events_by_type(&mut conn, EventType::Rescore)
        .await
        .expect("events");
    assert_eq!(events.len(), 1);
    assert!(events[0].message.contains("window=last 7 days"));
}

#[tokio::test]
async fn test_latest_projection_tracks_newest_history_row() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Jamie Ortiz", Some(500.0)).await;
    let other_id = seed_customer(&pool, "Taylor Brooks", Some(800.0)).await;
    seed_text(&pool, customer_id, "first").await;
    seed_text(&pool, other_id, "other").await;
    seed_text(&pool, customer_id, "second").await;

    infer::run_with_loader(&pool, &InferOptions::new(MODEL_NAME), fixed_loader("LOW", Some(0.6)))
        .await
        .expect("inference");

    let mut conn = pool.acquire().await.expect("connection");
    for id in [customer_id, other_id] {
        let history = database::list_scores_for_customer(&mut conn, id)
            .await
            .expect("history");
        let newest = history.first().expect("history row");
        let latest = database::find_latest_score(&mut conn, id)
            .await
            .expect("latest")
            .expect("latest row");

        assert_eq!(latest.risk_score_id, newest.risk_score_id);
        assert_eq!(latest.text_id, newest.text_id);
        assert_eq!(latest.scored_at, newest.scored_at);
    }
}

#[tokio::test]
async fn test_customer_without_active_policy_gets_no_adjustment() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Morgan Reyes", None).await;
    let text_id = seed_text(&pool, customer_id, "Engine fire on the highway").await;

    let options = InferOptions::new(MODEL_NAME);
    let report = infer::run_with_loader(&pool, &options, fixed_loader("HIGH", Some(0.95)))
        .await
        .expect("inference");

    assert_eq!(report.texts_scored, 1);
    assert_eq!(report.adjustments_created, 0);
    assert_eq!(count_rows(&pool, "policy_premium_adjustment").await, 0);
    assert!(text(&pool, text_id).await.is_processed);
}

#[tokio::test]
async fn test_failure_after_history_insert_rolls_back_everything() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Drew Walsh", Some(1000.0)).await;
    let text_id = seed_text(&pool, customer_id, "Burst pipe flooded the garage").await;

    sqlx::query(
        r"
        CREATE TRIGGER fail_latest_upsert
        BEFORE INSERT ON customer_risk_score_latest
        BEGIN
            SELECT RAISE(ABORT, 'injected failure');
        END
        ",
    )
    .execute(&pool)
    .await
    .expect("trigger");

    let options = InferOptions::new(MODEL_NAME);
    let result = infer::run_with_loader(&pool, &options, fixed_loader("HIGH", Some(0.9))).await;

    assert!(result.is_err());
    assert_eq!(count_rows(&pool, "customer_risk_score").await, 0);
    assert_eq!(count_rows(&pool, "customer_risk_score_latest").await, 0);
    assert_eq!(count_rows(&pool, "policy_premium_adjustment").await, 0);
    assert_eq!(count_rows(&pool, "pipeline_event").await, 0);

    let stored = text(&pool, text_id).await;
    assert!(!stored.is_processed);
    assert!(stored.processed_at.is_none());
}

#[tokio::test]
async fn test_no_active_model_is_fatal() {
    let pool = setup_pool().await;
    let customer_id = seed_customer(&pool, "Quinn Hayes", Some(1000.0)).await;
    let text_id = seed_text(&pool, customer_id, "anything").await;

    let options = InferOptions::new(MODEL_NAME);
    let err = infer::run_with_loader(&pool, &options, fixed_loader("HIGH", None))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoActiveModel(name)) if name == MODEL_NAME
    ));
    assert!(!text(&pool, text_id).await.is_processed);
}

#[tokio::test]
async fn test_missing_artifact_is_fatal() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let model = seed_active_model(&pool, &dir, "v1").await;
    std::fs::remove_file(model.artifact_path.as_deref().expect("path")).expect("remove artifact");
    let customer_id = seed_customer(&pool, "Avery Scott", Some(1000.0)).await;
    seed_text(&pool, customer_id, "anything").await;

    let options = InferOptions::new(MODEL_NAME);
    let err = infer::run_with_loader(&pool, &options, fixed_loader("HIGH", None))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::ArtifactNotFound { .. })
    ));
    assert_eq!(count_rows(&pool, "customer_risk_score").await, 0);
}

#[tokio::test]
async fn test_artifact_override_replaces_missing_registered_artifact() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let model = seed_active_model(&pool, &dir, "v1").await;
    std::fs::remove_file(model.artifact_path.as_deref().expect("path")).expect("remove artifact");
    let override_path = dir.path().join("override.model.json");
    std::fs::write(&override_path, "{}").expect("override artifact");

    let customer_id = seed_customer(&pool, "Parker Lane", Some(1000.0)).await;
    seed_text(&pool, customer_id, "anything").await;

    let options = InferOptions::new(MODEL_NAME).with_artifact_override(Some(override_path.clone()));
    let report = infer::run_with_loader(&pool, &options, fixed_loader("LOW", None))
        .await
        .expect("inference");

    assert_eq!(report.artifact_path, override_path);
    assert_eq!(report.texts_scored, 1);
}

#[tokio::test]
async fn test_nothing_to_score_writes_nothing() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;

    let options = InferOptions::new(MODEL_NAME);
    let report = infer::run_with_loader(&pool, &options, fixed_loader("LOW", None))
        .await
        .expect("inference");

    assert_eq!(report.texts_scored, 0);
    assert_eq!(count_rows(&pool, "pipeline_event").await, 0);
    assert_eq!(infer::render_report(&report), "No texts to score (unprocessed).");
}

#[tokio::test]
async fn test_negative_batch_size_is_rejected() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Morgan Ellis", Some(1000.0)).await;
    let mut text_ids = Vec::new();
    for raw in ["first claim", "second claim", "third claim"] {
        text_ids.push(seed_text(&pool, customer_id, raw).await);
    }

    let options = InferOptions::new(MODEL_NAME).with_batch_size(-1);
    let err = infer::run_with_loader(&pool, &options, fixed_loader("HIGH", None))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Validation(_))
    ));
    for text_id in text_ids {
        assert!(!text(&pool, text_id).await.is_processed);
    }
    assert_eq!(count_rows(&pool, "customer_risk_score").await, 0);
    assert_eq!(count_rows(&pool, "pipeline_event").await, 0);
}

#[tokio::test]
async fn test_unbounded_rescore_window_covers_all_text() {
    let pool = setup_pool().await;
    let dir = tempfile::tempdir().expect("temp dir");
    seed_active_model(&pool, &dir, "v1").await;
    let customer_id = seed_customer(&pool, "Jules Park", Some(1000.0)).await;
    let ancient = Utc::now() - Duration::days(36_500);
    seed_text_at(&pool, customer_id, "claim from long ago", ancient).await;
    seed_text(&pool, customer_id, "claim from today").await;

    let options = InferOptions::new(MODEL_NAME).with_rescore_recent_days(100_000_000);
    let report = infer::run_with_loader(&pool, &options, fixed_loader("LOW", Some(0.7)))
        .await
        .expect("rescore");

    assert_eq!(report.mode, SelectionMode::Rescore { days: 100_000_000 });
    assert_eq!(report.texts_scored, 2);
}
