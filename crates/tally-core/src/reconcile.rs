//! Budget usage reconciliation
//!
//! Pure functions over in-memory budgets and expenses. The database layer
//! (`db::reconcile`) loads the user-scoped slices and writes the results back.
//!
//! A budget's `used` is the sum of the owner's expenses whose date falls in
//! the budget window (both ends included) and whose category matches the
//! budget scope. Expense status does not affect the sum.

use chrono::NaiveDate;

use crate::models::{Budget, BudgetWindow, Expense};

/// Sum of the expenses that count toward `budget`, rounded to cents
pub fn compute_used(budget: &Budget, expenses: &[Expense]) -> f64 {
    let total: f64 = expenses
        .iter()
        .filter(|e| budget.covers(&e.category, e.date))
        .map(|e| e.amount)
        .sum();
    round_cents(total)
}

/// Drop float noise so spending exactly the cap leaves nothing remaining
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Budgets affected by an expense with this category and date
pub fn affected_budgets<'a>(
    budgets: &'a [Budget],
    category: &str,
    date: NaiveDate,
) -> Vec<&'a Budget> {
    budgets.iter().filter(|b| b.covers(category, date)).collect()
}

/// Window spanning every budget in `budgets`, used for a single bounding fetch
pub fn bounding_window<'a, I>(budgets: I) -> Option<BudgetWindow>
where
    I: IntoIterator<Item = &'a Budget>,
{
    BudgetWindow::covering(budgets.into_iter().map(Budget::window))
}

/// New `used` value for every budget, as `(budget_id, used)` pairs
pub fn recompute_all(budgets: &[Budget], expenses: &[Expense]) -> Vec<(i64, f64)> {
    budgets
        .iter()
        .map(|b| (b.id, compute_used(b, expenses)))
        .collect()
}

/// How much recalculation a budget edit needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcPlan {
    /// Only the edited budget, over its unchanged scope and window
    Targeted,
    /// Every budget of the owning user
    Bulk,
}

impl RecalcPlan {
    /// Decide from the budget before and after the edit
    ///
    /// A change to the category, the scope, or either window boundary can
    /// change which expenses match, so it forces a full per-user pass.
    pub fn for_edit(old: &Budget, new: &Budget) -> Self {
        let structural = old.category != new.category
            || old.scope != new.scope
            || old.start_date != new.start_date
            || old.end_date != new.end_date;

        if structural {
            Self::Bulk
        } else {
            Self::Targeted
        }
    }
}
