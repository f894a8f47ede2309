//! Dashboard command - latest risk picture for one customer.

use std::fmt::Display;

use anyhow::Result;
use database::CustomerDashboard;
use sqlx::SqlitePool;

/// Loads the dashboard and renders it as text.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn run(pool: &SqlitePool, customer_id: i64) -> Result<String> {
    let mut conn = pool.acquire().await?;
    let dashboard = database::customer_dashboard(&mut *conn, customer_id).await?;
    Ok(render(dashboard.as_ref()))
}

/// Renders a dashboard row, or the not-found message.
#[must_use]
pub fn render(dashboard: Option<&CustomerDashboard>) -> String {
    let Some(d) = dashboard else {
        return "Customer not found.".to_string();
    };

    [
        "=== Customer Risk Dashboard ===".to_string(),
        format!("Customer: {} | {}", d.customer_id, d.full_name),
        format!(
            "Latest Text: text_id={} source={} ingested={} processed={}",
            show(d.text_id),
            show(d.source_type),
            show(d.ingested_at),
            show(d.processed_at)
        ),
        format!("Text Preview: {}", show(d.text_preview.as_deref())),
        format!(
            "Risk: risk_score_id={} label={} score={} scored_at={} model={}",
            show(d.risk_score_id),
            show(d.risk_label.as_deref()),
            show(d.risk_score),
            show(d.scored_at),
            show(d.model_version.as_deref())
        ),
        format!(
            "Policy: policy_id={} type={} base={} status={}",
            show(d.policy_id),
            show(d.product_type.as_deref()),
            show(d.base_premium),
            show(d.status.as_deref())
        ),
        format!(
            "Premium Suggestion: pct={} suggested={} status={} at={}",
            show(d.adjustment_pct),
            show(d.suggested_premium),
            show(d.decision_status),
            show(d.adjustment_time)
        ),
        "==============================".to_string(),
    ]
    .join("\n")
}

fn show<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}
