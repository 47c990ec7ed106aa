//! CLI command tests

use std::io::Write;

use chrono::NaiveDate;
use tally_core::db::Database;

use crate::commands::{self, truncate, BudgetArgs};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup_test_db() -> (Database, i64) {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("lee@example.com", Some("Lee")).unwrap();
    (db, user.id)
}

fn budget_args(title: &str, category: &str, amount: f64) -> BudgetArgs {
    BudgetArgs {
        title: title.to_string(),
        category: Some(category.to_string()),
        amount,
        period: "monthly".to_string(),
        start: Some(date(2025, 6, 1)),
        end: None,
        auto_renew: false,
    }
}

// ========== User Command Tests ==========

#[test]
fn test_cmd_users_add_and_list() {
    let db = Database::in_memory().unwrap();
    commands::cmd_users_add(&db, "new@example.com", Some("New")).unwrap();

    let users = db.list_users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "new@example.com");
    assert!(commands::cmd_users_list(&db).is_ok());
}

#[test]
fn test_cmd_users_add_rejects_duplicate() {
    let (db, _) = setup_test_db();
    assert!(commands::cmd_users_add(&db, "lee@example.com", None).is_err());
}

// ========== Budget Command Tests ==========

#[test]
fn test_cmd_budgets_add_uses_period_window() {
    let (db, user_id) = setup_test_db();
    let mut args = budget_args("Travel", "Transport", 900.0);
    args.period = "quarterly".to_string();
    args.start = Some(date(2025, 11, 15));

    commands::cmd_budgets_add(&db, user_id, &args).unwrap();

    let budget = &db.list_budgets(user_id).unwrap()[0];
    assert_eq!(budget.start_date, date(2025, 11, 1));
    assert_eq!(budget.end_date, date(2026, 1, 31));
}

#[test]
fn test_cmd_budgets_add_monthly_start_snaps_to_month() {
    let (db, user_id) = setup_test_db();
    let mut args = budget_args("Groceries", "Food", 400.0);
    args.start = Some(date(2025, 6, 15));

    commands::cmd_budgets_add(&db, user_id, &args).unwrap();

    let budget = &db.list_budgets(user_id).unwrap()[0];
    assert_eq!(budget.start_date, date(2025, 6, 1));
    assert_eq!(budget.end_date, date(2025, 6, 30));
}

#[test]
fn test_budgets_add_help_explains_start_anchor() {
    use clap::CommandFactory;

    let command = crate::cli::Cli::command();
    let add = command
        .find_subcommand("budgets")
        .and_then(|budgets| budgets.find_subcommand("add"))
        .unwrap();
    let start = add
        .get_arguments()
        .find(|arg| arg.get_id() == "start")
        .unwrap();

    let help = start.get_long_help().unwrap().to_string();
    assert!(help.contains("first of"));
    assert!(add.get_long_about().unwrap().to_string().contains("--period custom"));
}

#[test]
fn test_cmd_budgets_add_explicit_window() {
    let (db, user_id) = setup_test_db();
    let mut args = budget_args("Festival", "Gifts", 300.0);
    args.start = Some(date(2025, 10, 10));
    args.end = Some(date(2025, 11, 5));

    commands::cmd_budgets_add(&db, user_id, &args).unwrap();

    let budget = &db.list_budgets(user_id).unwrap()[0];
    assert_eq!(budget.start_date, date(2025, 10, 10));
    assert_eq!(budget.end_date, date(2025, 11, 5));
}

#[test]
fn test_cmd_budgets_add_rejects_bad_input() {
    let (db, user_id) = setup_test_db();

    let mut args = budget_args("Groceries", "Food", 100.0);
    args.period = "weekly".to_string();
    assert!(commands::cmd_budgets_add(&db, user_id, &args).is_err());

    let mut args = budget_args("Groceries", "Food", 100.0);
    args.start = None;
    args.end = Some(date(2025, 6, 30));
    assert!(commands::cmd_budgets_add(&db, user_id, &args).is_err());

    let args = budget_args("Groceries", "Food", -1.0);
    assert!(commands::cmd_budgets_add(&db, user_id, &args).is_err());

    assert!(db.list_budgets(user_id).unwrap().is_empty());
}

#[test]
fn test_cmd_budgets_add_monthly_budget_without_category() {
    let (db, user_id) = setup_test_db();
    let mut args = budget_args("Monthly Budget", "", 2000.0);
    args.category = None;

    commands::cmd_budgets_add(&db, user_id, &args).unwrap();
    assert_eq!(db.list_budgets(user_id).unwrap().len(), 1);
}

#[test]
fn test_cmd_budgets_recalc() {
    let (db, user_id) = setup_test_db();
    commands::cmd_budgets_add(&db, user_id, &budget_args("Groceries", "Food", 500.0)).unwrap();
    commands::cmd_expenses_add(&db, user_id, "Market", 120.0, "Food", Some(date(2025, 6, 4)))
        .unwrap();

    let budget_id = db.list_budgets(user_id).unwrap()[0].id;
    db.conn()
        .unwrap()
        .execute("UPDATE budgets SET used = 0 WHERE id = ?", [budget_id])
        .unwrap();

    commands::cmd_budgets_recalc(&db, user_id).unwrap();
    assert_eq!(db.get_budget(user_id, budget_id).unwrap().used, 120.0);
    assert!(commands::cmd_budgets_list(&db, user_id).is_ok());
}

#[test]
fn test_cmd_window() {
    assert!(commands::cmd_window("annual", Some(2025), Some(3), None).is_ok());
    assert!(commands::cmd_window("custom", None, None, Some(date(2025, 6, 10))).is_ok());
    assert!(commands::cmd_window("sometimes", None, None, None).is_err());
}

// ========== Expense Command Tests ==========

#[test]
fn test_cmd_expenses_add_and_delete_track_usage() {
    let (db, user_id) = setup_test_db();
    commands::cmd_budgets_add(&db, user_id, &budget_args("Groceries", "Food", 500.0)).unwrap();
    let budget_id = db.list_budgets(user_id).unwrap()[0].id;

    commands::cmd_expenses_add(&db, user_id, "Market", 80.0, "Food", Some(date(2025, 6, 9)))
        .unwrap();
    assert_eq!(db.get_budget(user_id, budget_id).unwrap().used, 80.0);

    let expense_id = db.list_expenses(user_id, None, None).unwrap()[0].id;
    commands::cmd_expenses_delete(&db, user_id, expense_id).unwrap();
    assert_eq!(db.get_budget(user_id, budget_id).unwrap().used, 0.0);
}

#[test]
fn test_cmd_expenses_list_with_range() {
    let (db, user_id) = setup_test_db();
    commands::cmd_expenses_add(&db, user_id, "Taxi", 15.0, "Transport", Some(date(2025, 6, 9)))
        .unwrap();

    assert!(commands::cmd_expenses_list(&db, user_id, None, None).is_ok());
    assert!(
        commands::cmd_expenses_list(&db, user_id, Some(date(2025, 7, 1)), None).is_ok()
    );
}

#[test]
fn test_cmd_expenses_delete_unknown_fails() {
    let (db, user_id) = setup_test_db();
    assert!(commands::cmd_expenses_delete(&db, user_id, 42).is_err());
}

// ========== OCR Command Tests ==========

#[test]
fn test_cmd_ocr_imports_file() {
    let (db, user_id) = setup_test_db();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screenshot.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Paid to Swiggy").unwrap();
    writeln!(file, "₹ 250.00").unwrap();
    writeln!(file, "12 Jun 2025").unwrap();
    writeln!(file, "Completed").unwrap();

    commands::cmd_ocr(&db, user_id, &path, Some("Dining")).unwrap();

    let expenses = db.list_expenses(user_id, None, None).unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, 250.0);
    assert_eq!(expenses[0].category, "Dining");
}

#[test]
fn test_cmd_ocr_missing_file() {
    let (db, user_id) = setup_test_db();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.txt");

    assert!(commands::cmd_ocr(&db, user_id, &path, None).is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer title", 10), "a much ...");
    assert_eq!(truncate("₹₹₹₹₹₹₹₹", 5), "₹₹...");
}
