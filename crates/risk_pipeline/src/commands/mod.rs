//! CLI command implementations.

use chrono::{DateTime, TimeDelta, Utc};

pub mod activate;
pub mod dashboard;
pub mod infer;
pub mod ingest;
pub mod pipeline;
pub mod retrain;
pub mod show_model;
pub mod top;
pub mod train;

/// Start of a window reaching `days` back from `now`.
///
/// A window too wide for `DateTime` starts at the earliest representable
/// instant, so it covers everything.
pub(crate) fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
