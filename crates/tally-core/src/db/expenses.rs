//! Expense operations
//!
//! Every mutation runs in one transaction together with the recalculation of
//! the budgets it touches. Recalculation failures are contained in a savepoint,
//! so the expense write itself still commits.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::reconcile::{guarded_recalc, recalc_for_expense};
use super::users::ensure_user;
use super::{format_date, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{BudgetWindow, Expense, ExpenseUpdate, NewExpense};

/// Column order: id, user_id, title, amount, category, date, status, source,
///               import_hash, created_at
const EXPENSE_COLUMNS: &str =
    "id, user_id, title, amount, category, date, status, source, import_hash, created_at";

impl Database {
    /// Record an expense and bring the affected budgets up to date
    pub fn create_expense(&self, user_id: i64, expense: &NewExpense) -> Result<Expense> {
        expense.validate()?;

        let mut conn = self.conn()?;
        ensure_user(&conn, user_id)?;

        let mut tx = conn.transaction()?;
        let id = insert_expense(&tx, user_id, expense)?;

        guarded_recalc(&mut tx, user_id, "expense_create", |c| {
            recalc_for_expense(c, user_id, &expense.category, expense.date)
        });

        let created = fetch_expense(&tx, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("expense {}", id)))?;
        tx.commit()?;

        info!(user_id, expense_id = id, amount = created.amount, "Expense recorded");
        Ok(created)
    }

    /// Get an expense owned by `user_id`
    pub fn get_expense(&self, user_id: i64, id: i64) -> Result<Expense> {
        let conn = self.conn()?;
        fetch_expense(&conn, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("expense {}", id)))
    }

    /// List a user's expenses, optionally bounded by date (both ends included)
    pub fn list_expenses(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        ensure_user(&conn, user_id)?;
        query_expenses(&conn, user_id, from, to)
    }

    /// Edit an expense
    ///
    /// When the category or date moves, budgets matching the old values are
    /// recomputed as well as those matching the new ones.
    pub fn update_expense(&self, user_id: i64, id: i64, update: &ExpenseUpdate) -> Result<Expense> {
        let mut conn = self.conn()?;
        let mut tx = conn.transaction()?;

        let old = fetch_expense(&tx, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("expense {}", id)))?;
        let new = update.apply(&old)?;

        tx.execute(
            r#"
            UPDATE expenses
            SET title = ?, amount = ?, category = ?, date = ?, status = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                new.title,
                new.amount,
                new.category,
                format_date(new.date),
                new.status.as_str(),
                id,
                user_id,
            ],
        )?;

        let moved = old.category != new.category || old.date != new.date;
        guarded_recalc(&mut tx, user_id, "expense_edit", |c| {
            let mut written = recalc_for_expense(c, user_id, &new.category, new.date)?;
            if moved {
                written += recalc_for_expense(c, user_id, &old.category, old.date)?;
            }
            Ok(written)
        });

        let updated = fetch_expense(&tx, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("expense {}", id)))?;
        tx.commit()?;

        Ok(updated)
    }

    /// Delete an expense and repair the budgets it counted toward
    pub fn delete_expense(&self, user_id: i64, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let mut tx = conn.transaction()?;

        let old = fetch_expense(&tx, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("expense {}", id)))?;

        tx.execute(
            "DELETE FROM expenses WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;

        guarded_recalc(&mut tx, user_id, "expense_delete", |c| {
            recalc_for_expense(c, user_id, &old.category, old.date)
        });

        tx.commit()?;

        info!(user_id, expense_id = id, "Expense deleted");
        Ok(())
    }

    /// Insert a batch of expenses (OCR import) in one transaction
    ///
    /// Each distinct (category, date) pair is recalculated once.
    pub fn import_expenses(&self, user_id: i64, expenses: &[NewExpense]) -> Result<Vec<Expense>> {
        for expense in expenses {
            expense.validate()?;
        }

        let mut conn = self.conn()?;
        ensure_user(&conn, user_id)?;

        let mut tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(expenses.len());
        for expense in expenses {
            ids.push(insert_expense(&tx, user_id, expense)?);
        }

        let touched: BTreeSet<(&str, NaiveDate)> = expenses
            .iter()
            .map(|e| (e.category.as_str(), e.date))
            .collect();
        guarded_recalc(&mut tx, user_id, "expense_import", |c| {
            let mut written = 0;
            for (category, date) in &touched {
                written += recalc_for_expense(c, user_id, category, *date)?;
            }
            Ok(written)
        });

        let mut imported = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(expense) = fetch_expense(&tx, user_id, id)? {
                imported.push(expense);
            }
        }
        tx.commit()?;

        info!(user_id, count = imported.len(), "Expenses imported");
        Ok(imported)
    }

    /// Import fingerprints already stored for a user
    pub fn known_import_hashes(&self, user_id: i64) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT import_hash FROM expenses WHERE user_id = ? AND import_hash IS NOT NULL",
        )?;

        let hashes = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;

        Ok(hashes)
    }
}

fn insert_expense(conn: &Connection, user_id: i64, expense: &NewExpense) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO expenses (user_id, title, amount, category, date, status, source, import_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            user_id,
            expense.title,
            expense.amount,
            expense.category,
            format_date(expense.date),
            expense.status.as_str(),
            expense.source.as_str(),
            expense.import_hash,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_expense(row: &rusqlite::Row) -> rusqlite::Result<Expense> {
    let date: String = row.get(5)?;
    let status: String = row.get(6)?;
    let source: String = row.get(7)?;
    let created_at: String = row.get(9)?;
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        date: parse_date(5, &date)?,
        status: status.parse().unwrap_or_default(),
        source: source.parse().unwrap_or_default(),
        import_hash: row.get(8)?,
        created_at: parse_datetime(&created_at),
    })
}

fn fetch_expense(conn: &Connection, user_id: i64, id: i64) -> Result<Option<Expense>> {
    let expense = conn
        .query_row(
            &format!(
                "SELECT {} FROM expenses WHERE id = ? AND user_id = ?",
                EXPENSE_COLUMNS
            ),
            params![id, user_id],
            row_to_expense,
        )
        .optional()?;
    Ok(expense)
}

fn query_expenses(
    conn: &Connection,
    user_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {} FROM expenses
        WHERE user_id = ?1
          AND (?2 IS NULL OR date >= ?2)
          AND (?3 IS NULL OR date <= ?3)
        ORDER BY date, id
        "#,
        EXPENSE_COLUMNS
    ))?;

    let expenses = stmt
        .query_map(
            params![user_id, from.map(format_date), to.map(format_date)],
            row_to_expense,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(expenses)
}

/// A user's expenses inside `window`, or all of them when `None`
pub(super) fn expenses_in(
    conn: &Connection,
    user_id: i64,
    window: Option<BudgetWindow>,
) -> Result<Vec<Expense>> {
    query_expenses(
        conn,
        user_id,
        window.map(|w| w.start),
        window.map(|w| w.end),
    )
}
