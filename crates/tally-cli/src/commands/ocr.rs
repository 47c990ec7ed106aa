//! Screenshot text import command

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tally_core::db::Database;
use tally_core::import_statement;

use super::{load_engine_config, truncate};

pub fn cmd_ocr(db: &Database, user_id: i64, file: &Path, category: Option<&str>) -> Result<()> {
    println!("📷 Importing screenshot text from {}...", file.display());

    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let config = load_engine_config()?;

    let report = import_statement(
        db,
        user_id,
        &text,
        &config.ocr,
        category,
        Utc::now().date_naive(),
    )?;
    db.log_audit(
        "cli",
        "import_ocr",
        Some("expense"),
        None,
        Some(&format!(
            "file={} imported={} duplicates={}",
            file.display(),
            report.imported.len(),
            report.duplicates
        )),
    )?;

    for expense in &report.imported {
        println!(
            "   + {} │ {:>10.2} │ {} ({})",
            expense.date,
            expense.amount,
            truncate(&expense.title, 30),
            expense.status
        );
    }

    println!();
    println!("✅ Imported {} expense(s)", report.imported.len());
    if report.duplicates > 0 {
        println!("   Skipped {} already imported", report.duplicates);
    }
    if report.income_skipped > 0 {
        println!("   Skipped {} incoming payment(s)", report.income_skipped);
    }
    if report.failed_skipped > 0 {
        println!("   Skipped {} failed payment(s)", report.failed_skipped);
    }
    if report.unparsed > 0 {
        println!("   ⚠️  {} block(s) could not be parsed", report.unparsed);
    }

    Ok(())
}
