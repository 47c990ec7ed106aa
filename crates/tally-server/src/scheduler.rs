//! Background threshold alert scheduler
//!
//! Runs the budget threshold scan periodically. Configured via environment:
//!
//! - `TALLY_ALERT_SCAN_HOURS`: Interval in hours (default 24, "0" disables,
//!   capped at one year)
//!
//! The first scan happens one interval after startup.

use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use tally_core::{run_threshold_scan, AlertConfig, Database, NotifierClient, ScanReport};

/// Default scan interval (daily)
pub const DEFAULT_SCAN_HOURS: u64 = 24;

/// Longest accepted scan interval (one year)
pub const MAX_SCAN_HOURS: u64 = 24 * 365;

/// Configuration for scheduled alert scans
#[derive(Debug, Clone)]
pub struct AlertScheduleConfig {
    /// Interval between scans in hours
    pub interval_hours: u64,
    /// Threshold settings applied on each scan
    pub alerts: AlertConfig,
}

impl AlertScheduleConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None if scanning is disabled (`TALLY_ALERT_SCAN_HOURS=0`)
    pub fn from_env() -> Option<Self> {
        let interval_hours = match std::env::var("TALLY_ALERT_SCAN_HOURS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(hours) => hours,
                Err(_) => {
                    warn!(
                        value = %raw,
                        "Invalid TALLY_ALERT_SCAN_HOURS, using {} hours", DEFAULT_SCAN_HOURS
                    );
                    DEFAULT_SCAN_HOURS
                }
            },
            Err(_) => DEFAULT_SCAN_HOURS,
        };

        if interval_hours == 0 {
            warn!("TALLY_ALERT_SCAN_HOURS is 0, scheduled alert scans disabled");
            return None;
        }
        let interval_hours = if interval_hours > MAX_SCAN_HOURS {
            warn!(
                value = interval_hours,
                "TALLY_ALERT_SCAN_HOURS too large, using {} hours", MAX_SCAN_HOURS
            );
            MAX_SCAN_HOURS
        } else {
            interval_hours
        };

        Some(Self {
            interval_hours,
            alerts: AlertConfig::default(),
        })
    }

    /// Use these threshold settings instead of the defaults
    pub fn with_alerts(mut self, alerts: AlertConfig) -> Self {
        self.alerts = alerts;
        self
    }
}

/// Start the alert scheduler as a background task
pub fn start_alert_scheduler(db: Database, notifier: NotifierClient, config: AlertScheduleConfig) {
    info!(
        "Starting alert scheduler: every {} hours, notifier={}",
        config.interval_hours,
        tally_core::Notifier::name(&notifier)
    );

    tokio::spawn(async move {
        let period = Duration::from_secs(config.interval_hours.saturating_mul(3600));
        let mut ticker = interval(period);

        // Skip the first immediate tick; scans start one interval after boot
        ticker.tick().await;

        loop {
            ticker.tick().await;

            info!("Running scheduled alert scan...");

            match run_scheduled_scan(&db, &notifier, &config.alerts).await {
                Ok(report) => {
                    info!(
                        "Scheduled alert scan completed: {} sent, {} failed",
                        report.alerts_sent, report.failures
                    );
                }
                Err(e) => {
                    error!("Scheduled alert scan failed: {}", e);
                }
            }
        }
    });
}

/// Run a single scheduled scan for today's UTC date
async fn run_scheduled_scan(
    db: &Database,
    notifier: &NotifierClient,
    alerts: &AlertConfig,
) -> tally_core::Result<ScanReport> {
    let today = Utc::now().date_naive();
    let report = run_threshold_scan(db, notifier, alerts, today).await?;

    // Log to audit (as "scheduler" user)
    if let Err(e) = db.log_audit(
        "scheduler",
        "alert_scan",
        Some("budget"),
        None,
        Some(&format!(
            "users={} budgets={} sent={} failures={}",
            report.users_scanned, report.budgets_checked, report.alerts_sent, report.failures
        )),
    ) {
        warn!("Failed to log scheduled alert scan to audit: {}", e);
    }

    Ok(report)
}
