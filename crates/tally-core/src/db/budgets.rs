//! Budget operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::reconcile::{guarded_recalc, recalc_all, recalc_budget};
use super::users::ensure_user;
use super::{format_date, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    AlertKind, Budget, BudgetPeriod, BudgetScope, BudgetUpdate, NewBudget, MONTHLY_BUDGET_TITLE,
};
use crate::period::month_window;
use crate::reconcile::RecalcPlan;

/// Column order: id, user_id, title, category, scope, amount, used, period,
///               auto_renew, start_date, end_date, alert_10_percent_sent,
///               alert_exhausted_sent, created_at
const BUDGET_COLUMNS: &str = "id, user_id, title, category, scope, amount, used, period, \
     auto_renew, start_date, end_date, alert_10_percent_sent, alert_exhausted_sent, created_at";

impl Database {
    /// Create a budget and compute its initial usage from existing expenses
    pub fn create_budget(&self, user_id: i64, budget: &NewBudget) -> Result<Budget> {
        budget.validate()?;

        let mut conn = self.conn()?;
        ensure_user(&conn, user_id)?;

        let mut tx = conn.transaction()?;
        let id = insert_budget(&tx, user_id, budget)?;
        let created = fetch_budget(&tx, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("budget {}", id)))?;

        guarded_recalc(&mut tx, user_id, "budget_create", |c| recalc_budget(c, &created));

        let created = fetch_budget(&tx, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("budget {}", id)))?;
        tx.commit()?;

        info!(user_id, budget_id = id, title = %created.title, "Budget created");
        Ok(created)
    }

    /// Get a budget owned by `user_id`
    pub fn get_budget(&self, user_id: i64, id: i64) -> Result<Budget> {
        let conn = self.conn()?;
        fetch_budget(&conn, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("budget {}", id)))
    }

    /// List a user's budgets ordered by window start
    pub fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        ensure_user(&conn, user_id)?;
        budgets_for_user(&conn, user_id)
    }

    /// Budgets whose window contains `date`
    pub fn list_active_budgets(&self, user_id: i64, date: NaiveDate) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        budgets_active_on(&conn, user_id, date)
    }

    /// Apply a partial edit, then recompute as much as the edit requires
    ///
    /// Alert flags are left as they are.
    pub fn update_budget(&self, user_id: i64, id: i64, update: &BudgetUpdate) -> Result<Budget> {
        let mut conn = self.conn()?;
        let mut tx = conn.transaction()?;

        let old = fetch_budget(&tx, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("budget {}", id)))?;
        let new = update.apply(&old)?;

        tx.execute(
            r#"
            UPDATE budgets
            SET title = ?, category = ?, scope = ?, amount = ?, period = ?,
                auto_renew = ?, start_date = ?, end_date = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                new.title,
                new.category,
                new.scope.kind(),
                new.amount,
                new.period.as_str(),
                new.auto_renew,
                format_date(new.start_date),
                format_date(new.end_date),
                id,
                user_id,
            ],
        )?;

        match RecalcPlan::for_edit(&old, &new) {
            RecalcPlan::Targeted => {
                guarded_recalc(&mut tx, user_id, "budget_edit", |c| recalc_budget(c, &new))
            }
            RecalcPlan::Bulk => {
                guarded_recalc(&mut tx, user_id, "budget_edit", |c| recalc_all(c, user_id))
            }
        }

        let updated = fetch_budget(&tx, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("budget {}", id)))?;
        tx.commit()?;

        Ok(updated)
    }

    /// Delete a budget; expenses are untouched
    pub fn delete_budget(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM budgets WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("budget {}", id)));
        }
        Ok(())
    }

    /// Record that an alert went out; flags never go back to false
    pub fn mark_alert_sent(&self, budget_id: i64, kind: AlertKind) -> Result<()> {
        let conn = self.conn()?;
        let sql = match kind {
            AlertKind::TenPercentRemaining => {
                "UPDATE budgets SET alert_10_percent_sent = 1 WHERE id = ?"
            }
            AlertKind::Exhausted => "UPDATE budgets SET alert_exhausted_sent = 1 WHERE id = ?",
        };
        conn.execute(sql, params![budget_id])?;
        Ok(())
    }

    /// Create or resize the user's all-categories budget for the month of `today`
    ///
    /// Used at onboarding, where the user states a single monthly figure.
    pub fn sync_monthly_budget(&self, user_id: i64, amount: f64, today: NaiveDate) -> Result<Budget> {
        let window = month_window(today);

        let existing: Option<i64> = {
            let conn = self.conn()?;
            ensure_user(&conn, user_id)?;
            conn.query_row(
                r#"
                SELECT id FROM budgets
                WHERE user_id = ? AND scope = 'all' AND start_date = ? AND end_date = ?
                ORDER BY id LIMIT 1
                "#,
                params![user_id, format_date(window.start), format_date(window.end)],
                |row| row.get(0),
            )
            .optional()?
        };

        let budget = match existing {
            Some(id) => {
                let update = BudgetUpdate {
                    amount: Some(amount),
                    ..Default::default()
                };
                self.update_budget(user_id, id, &update)?
            }
            None => {
                let new = NewBudget {
                    title: MONTHLY_BUDGET_TITLE.to_string(),
                    category: String::new(),
                    amount,
                    period: BudgetPeriod::Monthly,
                    auto_renew: true,
                    start_date: window.start,
                    end_date: window.end,
                };
                self.create_budget(user_id, &new)?
            }
        };

        info!(user_id, budget_id = budget.id, amount, "Monthly budget synced");
        Ok(budget)
    }
}

fn insert_budget(conn: &Connection, user_id: i64, budget: &NewBudget) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO budgets (user_id, title, category, scope, amount, used, period, auto_renew, start_date, end_date)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
        params![
            user_id,
            budget.title,
            budget.category,
            budget.scope().kind(),
            budget.amount,
            budget.period.as_str(),
            budget.auto_renew,
            format_date(budget.start_date),
            format_date(budget.end_date),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_budget(row: &rusqlite::Row) -> rusqlite::Result<Budget> {
    let category: String = row.get(3)?;
    let scope: String = row.get(4)?;
    let period: String = row.get(7)?;
    let start_date: String = row.get(9)?;
    let end_date: String = row.get(10)?;
    let created_at: String = row.get(13)?;
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        scope: BudgetScope::from_parts(&scope, &category),
        category,
        amount: row.get(5)?,
        used: row.get(6)?,
        period: period.parse().unwrap_or_default(),
        auto_renew: row.get(8)?,
        start_date: parse_date(9, &start_date)?,
        end_date: parse_date(10, &end_date)?,
        alert_10_percent_sent: row.get(11)?,
        alert_exhausted_sent: row.get(12)?,
        created_at: parse_datetime(&created_at),
    })
}

pub(super) fn fetch_budget(conn: &Connection, user_id: i64, id: i64) -> Result<Option<Budget>> {
    let budget = conn
        .query_row(
            &format!(
                "SELECT {} FROM budgets WHERE id = ? AND user_id = ?",
                BUDGET_COLUMNS
            ),
            params![id, user_id],
            row_to_budget,
        )
        .optional()?;
    Ok(budget)
}

pub(super) fn budgets_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Budget>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM budgets WHERE user_id = ? ORDER BY start_date, id",
        BUDGET_COLUMNS
    ))?;

    let budgets = stmt
        .query_map(params![user_id], row_to_budget)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(budgets)
}

pub(super) fn budgets_active_on(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
) -> Result<Vec<Budget>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM budgets WHERE user_id = ?1 AND start_date <= ?2 AND end_date >= ?2 ORDER BY start_date, id",
        BUDGET_COLUMNS
    ))?;

    let budgets = stmt
        .query_map(params![user_id, format_date(date)], row_to_budget)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(budgets)
}
