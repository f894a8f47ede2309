#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use database::{
    CreateCustomer, CreateModelMetadata, CreatePolicy, CreateUnstructuredText, ModelMetadata,
    SourceType, UnstructuredText, create_memory_pool, run_migrations,
};
use ml_model::RiskClassifier;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const MODEL_NAME: &str = "risk_classifier";

/// Classifier returning the same label for every text.
pub struct FixedClassifier {
    pub label: &'static str,
    pub confidence: Option<f64>,
}

impl RiskClassifier for FixedClassifier {
    fn classify(&self, texts: &[String]) -> anyhow::Result<Vec<String>> {
        Ok(texts.iter().map(|_| self.label.to_string()).collect())
    }

    fn confidence(&self, texts: &[String]) -> anyhow::Result<Option<Vec<f64>>> {
        Ok(self.confidence.map(|c| vec![c; texts.len()]))
    }
}

pub fn fixed_loader(
    label: &'static str,
    confidence: Option<f64>,
) -> impl FnOnce(&Path) -> anyhow::Result<Box<dyn RiskClassifier>> {
    move |_| Ok(Box::new(FixedClassifier { label, confidence }) as Box<dyn RiskClassifier>)
}

pub async fn setup_pool() -> SqlitePool {
    let pool = create_memory_pool().await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}

pub async fn seed_customer(pool: &SqlitePool, name: &str, base_premium: Option<f64>) -> i64 {
    let mut conn = pool.acquire().await.expect("connection");
    let customer = database::insert_customer(
        &mut conn,
        &CreateCustomer {
            full_name: name.to_string(),
            ..CreateCustomer::default()
        },
    )
    .await
    .expect("customer");

    if let Some(base_premium) = base_premium {
        database::insert_policy(
            &mut conn,
            &CreatePolicy {
                customer_id: customer.customer_id,
                product_type: Some("AUTO".to_string()),
                base_premium,
                status: "ACTIVE".to_string(),
            },
        )
        .await
        .expect("policy");
    }

    customer.customer_id
}

pub async fn seed_text(pool: &SqlitePool, customer_id: i64, raw_text: &str) -> i64 {
    seed_text_at(pool, customer_id, raw_text, Utc::now()).await
}

pub async fn seed_text_at(
    pool: &SqlitePool,
    customer_id: i64,
    raw_text: &str,
    ingested_at: DateTime<Utc>,
) -> i64 {
    let mut conn = pool.acquire().await.expect("connection");
    database::insert_text_at(
        &mut conn,
        &CreateUnstructuredText {
            customer_id,
            source_type: SourceType::SupportChat,
            raw_text: raw_text.to_string(),
        },
        ingested_at,
    )
    .await
    .expect("text")
    .text_id
}

/// Registers and activates a model whose artifact is an existing file.
pub async fn seed_active_model(pool: &SqlitePool, dir: &TempDir, version: &str) -> ModelMetadata {
    let artifact_path = dir.path().join(format!("{MODEL_NAME}_{version}.model.json"));
    std::fs::write(&artifact_path, "{}").expect("artifact file");

    let mut conn = pool.acquire().await.expect("connection");
    database::insert_model_metadata(
        &mut conn,
        &CreateModelMetadata {
            model_name: MODEL_NAME.to_string(),
            model_version: version.to_string(),
            algorithm: "fixed".to_string(),
            trained_at: Utc::now(),
            eval_metric_name: Some("F1".to_string()),
            eval_metric_value: Some(1.0),
            artifact_path: artifact_path.display().to_string(),
            notes: None,
        },
    )
    .await
    .expect("model");

    database::activate_model(&mut conn, MODEL_NAME, version)
        .await
        .expect("activate")
}

pub async fn text(pool: &SqlitePool, text_id: i64) -> UnstructuredText {
    let mut conn = pool.acquire().await.expect("connection");
    database::find_text(&mut conn, text_id)
        .await
        .expect("query")
        .expect("text exists")
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let mut conn = pool.acquire().await.expect("connection");
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut *conn)
        .await
        .expect("count")
}

pub fn write_training_csv(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("train.csv");
    std::fs::write(
        &path,
        "raw_text,label\n\
         Kitchen fire destroyed the house,HIGH\n\
         Flood ruined the basement and foundation,HIGH\n\
         Total loss after highway collision,HIGH\n\
         Minor scratch on the rear bumper,MEDIUM\n\
         Hail dented the car roof slightly,MEDIUM\n\
         Cracked windshield needs repair,MEDIUM\n\
         Thanks for the quick billing answer,LOW\n\
         Please update my mailing address,LOW\n\
         \"Great service, very friendly agent\",low\n",
    )
    .expect("training csv");
    path
}
