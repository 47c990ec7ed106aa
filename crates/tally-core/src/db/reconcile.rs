//! Writing recomputed `used` totals back to the budgets table
//!
//! Every helper here takes a plain `&Connection` so it can run on a pooled
//! connection, inside a transaction, or inside a savepoint.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info, warn};

use super::budgets::{budgets_active_on, budgets_for_user};
use super::expenses::expenses_in;
use super::users::ensure_user;
use super::Database;
use crate::error::Result;
use crate::models::Budget;
use crate::reconcile::{affected_budgets, bounding_window, compute_used, recompute_all};

impl Database {
    /// Recompute every budget of a user from scratch
    ///
    /// Self-healing and idempotent: running it twice writes the same values.
    /// Returns the number of budgets written.
    pub fn recalculate_all_budgets(&self, user_id: i64) -> Result<usize> {
        let mut conn = self.conn()?;
        ensure_user(&conn, user_id)?;

        let tx = conn.transaction()?;
        let written = recalc_all(&tx, user_id)?;
        tx.commit()?;

        info!(user_id, budgets = written, "Recalculated all budgets");
        Ok(written)
    }

    /// Recompute the budgets an expense with this category and date touches
    ///
    /// Returns the number of budgets written; zero when nothing matched.
    pub fn recalculate_for(&self, user_id: i64, category: &str, date: NaiveDate) -> Result<usize> {
        let conn = self.conn()?;
        recalc_for_expense(&conn, user_id, category, date)
    }
}

/// Targeted recalculation for one expense change
pub(super) fn recalc_for_expense(
    conn: &Connection,
    user_id: i64,
    category: &str,
    date: NaiveDate,
) -> Result<usize> {
    let candidates = budgets_active_on(conn, user_id, date)?;
    let matched = affected_budgets(&candidates, category, date);

    let Some(window) = bounding_window(matched.iter().copied()) else {
        return Ok(0);
    };

    // One fetch covering every matched window
    let expenses = expenses_in(conn, user_id, Some(window))?;

    for budget in &matched {
        let used = compute_used(budget, &expenses);
        write_used(conn, budget.id, used)?;
        debug!(budget_id = budget.id, used, "Budget usage updated");
    }

    Ok(matched.len())
}

/// Recompute a single budget over its own scope and window
pub(super) fn recalc_budget(conn: &Connection, budget: &Budget) -> Result<usize> {
    let expenses = expenses_in(conn, budget.user_id, Some(budget.window()))?;
    let used = compute_used(budget, &expenses);
    write_used(conn, budget.id, used)?;
    debug!(budget_id = budget.id, used, "Budget usage updated");
    Ok(1)
}

/// Bulk recalculation of every budget of a user
pub(super) fn recalc_all(conn: &Connection, user_id: i64) -> Result<usize> {
    let budgets = budgets_for_user(conn, user_id)?;
    if budgets.is_empty() {
        return Ok(0);
    }

    let expenses = expenses_in(conn, user_id, None)?;
    let totals = recompute_all(&budgets, &expenses);
    for (budget_id, used) in &totals {
        write_used(conn, *budget_id, *used)?;
    }

    Ok(totals.len())
}

fn write_used(conn: &Connection, budget_id: i64, used: f64) -> Result<()> {
    conn.execute(
        "UPDATE budgets SET used = ? WHERE id = ?",
        params![used, budget_id],
    )?;
    Ok(())
}

/// Run a recalculation inside a savepoint of `tx`
///
/// A failure rolls back only the savepoint and is logged; the surrounding
/// write still commits.
pub(super) fn guarded_recalc<F>(tx: &mut Transaction<'_>, user_id: i64, trigger: &str, recalc: F)
where
    F: FnOnce(&Connection) -> Result<usize>,
{
    let savepoint = match tx.savepoint() {
        Ok(sp) => sp,
        Err(e) => {
            warn!(user_id, trigger, error = %e, "Budget recalculation skipped");
            return;
        }
    };

    match recalc(&savepoint) {
        Ok(written) => match savepoint.commit() {
            Ok(()) => debug!(user_id, trigger, budgets = written, "Budget recalculation done"),
            Err(e) => warn!(user_id, trigger, error = %e, "Budget recalculation not saved"),
        },
        // Dropping the savepoint rolls it back
        Err(e) => warn!(user_id, trigger, error = %e, "Budget recalculation failed"),
    }
}
