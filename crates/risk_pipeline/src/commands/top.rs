//! Top command - highest recent risk scores.

use anyhow::Result;
use chrono::Utc;
use database::HighRiskCustomer;
use sqlx::SqlitePool;

use super::window_start;
use crate::PipelineError;

/// Rows listed unless overridden.
pub const DEFAULT_TOP_N: i64 = 5;

/// Only scores newer than this many days are ranked.
pub const LOOKBACK_DAYS: i64 = 730;

/// Loads the top `top_n` customers by latest risk score and renders them.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] for a negative `top_n`, or an error
/// if the database query fails.
pub async fn run(pool: &SqlitePool, top_n: i64) -> Result<String> {
    if top_n < 0 {
        let message = format!("top requires -n >= 0, got {top_n}");
        return Err(PipelineError::Validation(message).into());
    }

    let mut conn = pool.acquire().await?;
    let since = window_start(Utc::now(), LOOKBACK_DAYS);
    let rows = database::top_high_risk_customers(&mut *conn, since, top_n).await?;
    Ok(render(top_n, &rows))
}

#[must_use]
pub fn render(top_n: i64, rows: &[HighRiskCustomer]) -> String {
    let mut lines = vec![format!("Top {top_n} high-risk customers (last 2 years):")];
    lines.extend(rows.iter().map(|r| {
        format!(
            "- {} {} | {} {} @ {}",
            r.customer_id, r.full_name, r.risk_label, r.risk_score, r.scored_at
        )
    }));
    lines.join("\n")
}
