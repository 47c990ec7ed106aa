//! Threshold alert command

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tally_core::{run_threshold_scan, Notifier, NotifierClient};

use super::{load_engine_config, open_db};

pub async fn cmd_scan(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;
    let config = load_engine_config()?;
    let notifier = NotifierClient::from_env();

    println!("🔔 Scanning budgets for threshold alerts...");
    println!("   Sender: {}", notifier.name());

    let report = run_threshold_scan(&db, &notifier, &config.alerts, Utc::now().date_naive()).await?;
    db.log_audit(
        "cli",
        "alert_scan",
        Some("budget"),
        None,
        Some(&format!("sent={} failures={}", report.alerts_sent, report.failures)),
    )?;

    println!();
    println!("📊 Scan Results");
    println!("   ─────────────────────────────");
    println!("   Users scanned:   {}", report.users_scanned);
    println!("   Budgets checked: {}", report.budgets_checked);
    println!("   Alerts sent:     {}", report.alerts_sent);
    if report.failures > 0 {
        println!(
            "   ⚠️  {} alert(s) failed; they will be retried on the next scan",
            report.failures
        );
    }

    Ok(())
}
