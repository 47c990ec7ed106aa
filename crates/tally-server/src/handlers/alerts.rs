//! Threshold alert handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use crate::{AppError, AppState};
use tally_core::{run_threshold_scan, ScanReport};

/// POST /api/alerts/scan - Run one threshold alert sweep now
pub async fn run_alert_scan(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScanReport>, AppError> {
    let today = Utc::now().date_naive();
    let report = run_threshold_scan(&state.db, &state.notifier, &state.engine.alerts, today).await?;

    state.db.log_audit(
        "api",
        "alert_scan",
        Some("budget"),
        None,
        Some(&format!(
            "sent={} failures={}",
            report.alerts_sent, report.failures
        )),
    )?;

    Ok(Json(report))
}
