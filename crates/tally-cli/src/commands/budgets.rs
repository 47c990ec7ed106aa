//! Budget command implementations

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate, Utc};
use tally_core::db::Database;
use tally_core::models::{Budget, BudgetPeriod, BudgetWindow, NewBudget};
use tally_core::period_window;

use super::truncate;

/// Options for `tally budgets add`
pub struct BudgetArgs {
    pub title: String,
    pub category: Option<String>,
    pub amount: f64,
    pub period: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub auto_renew: bool,
}

fn parse_period(period: &str) -> Result<BudgetPeriod> {
    period.parse().map_err(|e: String| anyhow::anyhow!(e))
}

/// Explicit window when both ends are given, else the period anchored at `start`
///
/// A non-custom period snaps the anchor to the first of its month.
fn resolve_window(args: &BudgetArgs, period: BudgetPeriod, today: NaiveDate) -> Result<BudgetWindow> {
    match (args.start, args.end) {
        (Some(start), Some(end)) => Ok(BudgetWindow::new(start, end)?),
        (None, Some(_)) => bail!("--end requires --start"),
        (anchor, None) => {
            let reference = anchor.unwrap_or(today);
            Ok(period_window(
                period,
                reference.year(),
                reference.month(),
                anchor,
                today,
            ))
        }
    }
}

fn usage_bar(budget: &Budget) -> String {
    let ratio = if budget.amount > 0.0 {
        (budget.used / budget.amount).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (ratio * 10.0).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

pub fn cmd_budgets_list(db: &Database, user_id: i64) -> Result<()> {
    let budgets = db.list_budgets(user_id)?;

    if budgets.is_empty() {
        println!("No budgets yet. Create one with:");
        println!("  tally budgets add -u {} -t Groceries -c Food -a 500", user_id);
        return Ok(());
    }

    println!();
    println!("💰 Budgets");
    println!("   ─────────────────────────────────────────────────────────────");

    for budget in budgets {
        let flag = if budget.remaining() <= 0.0 {
            "🔴"
        } else if budget.alert_10_percent_sent {
            "🟡"
        } else {
            "🟢"
        };
        println!(
            "   {} [{}] {:<20} {} {:>10.2} / {:<10.2} {} → {} ({})",
            flag,
            budget.id,
            truncate(&budget.title, 20),
            usage_bar(&budget),
            budget.used,
            budget.amount,
            budget.start_date,
            budget.end_date,
            budget.period
        );
    }

    Ok(())
}

pub fn cmd_budgets_add(db: &Database, user_id: i64, args: &BudgetArgs) -> Result<()> {
    let period = parse_period(&args.period)?;
    let window = resolve_window(args, period, Utc::now().date_naive())?;

    let budget = db.create_budget(
        user_id,
        &NewBudget {
            title: args.title.clone(),
            category: args.category.clone().unwrap_or_default(),
            amount: args.amount,
            period,
            auto_renew: args.auto_renew,
            start_date: window.start,
            end_date: window.end,
        },
    )?;
    db.log_audit(
        "cli",
        "create",
        Some("budget"),
        Some(budget.id),
        Some(&format!("title={} amount={:.2}", budget.title, budget.amount)),
    )?;

    println!("✅ Created budget [{}] {}", budget.id, budget.title);
    println!("   Window: {} → {}", budget.start_date, budget.end_date);
    println!("   Used:   {:.2} of {:.2}", budget.used, budget.amount);

    Ok(())
}

pub fn cmd_budgets_recalc(db: &Database, user_id: i64) -> Result<()> {
    println!("🔄 Recalculating budget usage...");

    let updated = db.recalculate_all_budgets(user_id)?;
    db.log_audit(
        "cli",
        "recalculate",
        Some("budget"),
        None,
        Some(&format!("user={} updated={}", user_id, updated)),
    )?;

    println!("✅ Recalculated {} budget(s)", updated);
    Ok(())
}

pub fn cmd_window(
    period: &str,
    year: Option<i32>,
    month: Option<u32>,
    custom_start: Option<NaiveDate>,
) -> Result<()> {
    let period = parse_period(period)?;
    let today = Utc::now().date_naive();
    let window = period_window(
        period,
        year.unwrap_or(today.year()),
        month.unwrap_or(today.month()),
        custom_start,
        today,
    );

    println!("📅 {} window: {} → {}", period, window.start, window.end);
    Ok(())
}
