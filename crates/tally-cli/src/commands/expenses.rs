//! Expense command implementations

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tally_core::db::Database;
use tally_core::models::NewExpense;

use super::truncate;

pub fn cmd_expenses_list(
    db: &Database,
    user_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let expenses = db.list_expenses(user_id, from, to)?;

    if expenses.is_empty() {
        println!("No expenses found.");
        return Ok(());
    }

    println!();
    println!("📝 Expenses");
    println!("   ─────────────────────────────────────────────────────────────");

    let mut total = 0.0;
    for expense in &expenses {
        total += expense.amount;
        println!(
            "   [{}] {} │ {:>10.2} │ {:<15} │ {} ({})",
            expense.id,
            expense.date,
            expense.amount,
            truncate(&expense.category, 15),
            truncate(&expense.title, 30),
            expense.status
        );
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {} expense(s), total {:.2}", expenses.len(), total);

    Ok(())
}

pub fn cmd_expenses_add(
    db: &Database,
    user_id: i64,
    title: &str,
    amount: f64,
    category: &str,
    date: Option<NaiveDate>,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());

    let expense = db.create_expense(
        user_id,
        &NewExpense {
            title: title.to_string(),
            amount,
            category: category.to_string(),
            date,
            status: Default::default(),
            source: Default::default(),
            import_hash: None,
        },
    )?;
    db.log_audit(
        "cli",
        "create",
        Some("expense"),
        Some(expense.id),
        Some(&format!("category={} amount={:.2}", expense.category, expense.amount)),
    )?;

    println!(
        "✅ Added expense [{}] {:.2} in {} on {}",
        expense.id, expense.amount, expense.category, expense.date
    );

    // Show the budgets this expense counts toward
    for budget in db.list_active_budgets(user_id, date)? {
        if budget.covers(&expense.category, expense.date) {
            println!(
                "   💰 {}: {:.2} of {:.2} used",
                budget.title, budget.used, budget.amount
            );
        }
    }

    Ok(())
}

pub fn cmd_expenses_delete(db: &Database, user_id: i64, id: i64) -> Result<()> {
    db.delete_expense(user_id, id)?;
    db.log_audit("cli", "delete", Some("expense"), Some(id), None)?;

    println!("✅ Deleted expense [{}]", id);
    Ok(())
}
