//! Integration tests for tally-core
//!
//! These tests exercise the full expense → recalculation → alert workflow
//! through the public API only.

use chrono::NaiveDate;
use tally_core::{
    db::Database,
    import_statement,
    models::{BudgetPeriod, BudgetUpdate, ExpenseUpdate, NewBudget, NewExpense},
    period_window, run_threshold_scan, AlertConfig, MockNotifier, OcrConfig, TemplateId,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn spend(title: &str, category: &str, amount: f64, on: NaiveDate) -> NewExpense {
    NewExpense {
        title: title.to_string(),
        amount,
        category: category.to_string(),
        date: on,
        status: Default::default(),
        source: Default::default(),
        import_hash: None,
    }
}

/// A month of spending: budgets track expenses, alerts fire once each
#[tokio::test]
async fn test_month_of_spending_workflow() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("maya@example.com", Some("Maya")).unwrap();
    let today = date(2025, 6, 20);

    let june = period_window(BudgetPeriod::Monthly, 2025, 6, None, today);
    let overall = db.sync_monthly_budget(user.id, 2000.0, date(2025, 6, 1)).unwrap();
    let food = db
        .create_budget(
            user.id,
            &NewBudget {
                title: "Groceries".to_string(),
                category: "Food".to_string(),
                amount: 500.0,
                period: BudgetPeriod::Monthly,
                auto_renew: true,
                start_date: june.start,
                end_date: june.end,
            },
        )
        .unwrap();

    db.create_expense(user.id, &spend("Market", "Food", 300.0, date(2025, 6, 3)))
        .unwrap();
    let snacks = db
        .create_expense(user.id, &spend("Snacks", "Food", 160.0, date(2025, 6, 10)))
        .unwrap();
    db.create_expense(user.id, &spend("Bus pass", "Transport", 90.0, date(2025, 6, 11)))
        .unwrap();

    assert_eq!(db.get_budget(user.id, food.id).unwrap().used, 460.0);
    assert_eq!(db.get_budget(user.id, overall.id).unwrap().used, 550.0);

    // First sweep: Groceries has 40 left, at or under 10% of 500
    let notifier = MockNotifier::new();
    let config = AlertConfig::default();
    let report = run_threshold_scan(&db, &notifier, &config, today).await.unwrap();
    assert_eq!(report.alerts_sent, 1);
    let sent = notifier.sent();
    assert_eq!(sent[0].template, TemplateId::BudgetTenPercent);
    assert_eq!(sent[0].recipient, "maya@example.com");

    // Overspend: the exhausted alert still fires even though the low-balance one did
    db.update_expense(
        user.id,
        snacks.id,
        &ExpenseUpdate {
            amount: Some(250.0),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(db.get_budget(user.id, food.id).unwrap().used, 550.0);

    let report = run_threshold_scan(&db, &notifier, &config, today).await.unwrap();
    assert_eq!(report.alerts_sent, 1);
    assert_eq!(notifier.sent()[1].template, TemplateId::BudgetExhausted);

    // Raising the cap keeps the flags: no repeat alerts this period
    let raised = db
        .update_budget(
            user.id,
            food.id,
            &BudgetUpdate {
                amount: Some(560.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(raised.used, 550.0);
    assert!(raised.alert_10_percent_sent);

    let report = run_threshold_scan(&db, &notifier, &config, today).await.unwrap();
    assert_eq!(report.alerts_sent, 0);
    assert_eq!(notifier.sent().len(), 2);
}

/// Imported screenshot debits count against budgets like manual expenses
#[test]
fn test_ocr_import_then_bulk_recalculation() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("omar@example.com", None).unwrap();
    let dining = db
        .create_budget(
            user.id,
            &NewBudget {
                title: "Eating out".to_string(),
                category: "Dining".to_string(),
                amount: 800.0,
                period: BudgetPeriod::Monthly,
                auto_renew: false,
                start_date: date(2025, 6, 1),
                end_date: date(2025, 6, 30),
            },
        )
        .unwrap();

    let text = "Paid to Cafe Mocha\n₹ 120.00\n5 Jun 2025\nCompleted\n\
                Paid to Pizza Place\n₹ 380\n6 Jun 2025\nFailed";
    let report = import_statement(
        &db,
        user.id,
        text,
        &OcrConfig::default(),
        Some("Dining"),
        date(2025, 6, 30),
    )
    .unwrap();

    assert_eq!(report.imported.len(), 1);
    assert_eq!(report.failed_skipped, 1);
    assert_eq!(db.get_budget(user.id, dining.id).unwrap().used, 120.0);

    // Bulk recalculation agrees with the incremental result
    db.recalculate_all_budgets(user.id).unwrap();
    assert_eq!(db.get_budget(user.id, dining.id).unwrap().used, 120.0);
}
