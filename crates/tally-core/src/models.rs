//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Title that turns a budget into an all-categories budget
pub const MONTHLY_BUDGET_TITLE: &str = "Monthly Budget";

/// A user who owns budgets and expenses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Budget period kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
    Quarterly,
    Biannual,
    Annual,
    Custom,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Biannual => "biannual",
            Self::Annual => "annual",
            Self::Custom => "custom",
        }
    }
}

impl std::str::FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "biannual" | "semiannual" => Ok(Self::Biannual),
            "annual" | "yearly" => Ok(Self::Annual),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("Unknown budget period: {}", s)),
        }
    }
}

impl std::fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which expenses a budget accumulates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum BudgetScope {
    /// Every category counts against the budget
    AllCategories,
    /// Only expenses with exactly this category count
    Category(String),
}

impl BudgetScope {
    /// Derive the scope from a budget's title and category
    ///
    /// The sentinel title [`MONTHLY_BUDGET_TITLE`] maps to `AllCategories`
    /// regardless of the category given.
    pub fn from_title(title: &str, category: &str) -> Self {
        if title == MONTHLY_BUDGET_TITLE {
            Self::AllCategories
        } else {
            Self::Category(category.to_string())
        }
    }

    /// Whether an expense in `category` counts against this scope
    pub fn matches(&self, category: &str) -> bool {
        match self {
            Self::AllCategories => true,
            Self::Category(name) => name == category,
        }
    }

    /// Storage tag for the scope column
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AllCategories => "all",
            Self::Category(_) => "category",
        }
    }

    /// Rebuild a scope from its stored kind and category
    pub fn from_parts(kind: &str, category: &str) -> Self {
        match kind {
            "all" => Self::AllCategories,
            _ => Self::Category(category.to_string()),
        }
    }
}

/// An inclusive date window `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BudgetWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::Validation(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Both boundaries are included
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Smallest window covering every window in `windows`
    pub fn covering<I>(windows: I) -> Option<Self>
    where
        I: IntoIterator<Item = BudgetWindow>,
    {
        windows.into_iter().reduce(|acc, w| Self {
            start: acc.start.min(w.start),
            end: acc.end.max(w.end),
        })
    }
}

/// A budget with its cached usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub category: String,
    pub scope: BudgetScope,
    /// Spending cap, always positive
    pub amount: f64,
    /// Cached sum of matching expenses; recomputable from the expense table
    pub used: f64,
    pub period: BudgetPeriod,
    pub auto_renew: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub alert_10_percent_sent: bool,
    pub alert_exhausted_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn window(&self) -> BudgetWindow {
        BudgetWindow {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.amount - self.used
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.window().contains(date)
    }

    /// Whether an expense with this category and date counts toward the budget
    pub fn covers(&self, category: &str, date: NaiveDate) -> bool {
        self.window().contains(date) && self.scope.matches(category)
    }
}

/// A budget to be created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default)]
    pub auto_renew: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewBudget {
    pub fn scope(&self) -> BudgetScope {
        BudgetScope::from_title(&self.title, &self.category)
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("budget title is required".to_string()));
        }
        validate_amount(self.amount)?;
        if self.scope() != BudgetScope::AllCategories && self.category.trim().is_empty() {
            return Err(Error::Validation("budget category is required".to_string()));
        }
        BudgetWindow::new(self.start_date, self.end_date)?;
        Ok(())
    }
}

/// Partial budget edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetUpdate {
    pub title: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub period: Option<BudgetPeriod>,
    pub auto_renew: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl BudgetUpdate {
    /// Apply the edit to a copy of `budget`, validating the result
    pub fn apply(&self, budget: &Budget) -> Result<Budget> {
        let mut updated = budget.clone();
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("budget title is required".to_string()));
            }
            updated.title = title.clone();
        }
        if let Some(category) = &self.category {
            updated.category = category.clone();
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
            updated.amount = amount;
        }
        if let Some(period) = self.period {
            updated.period = period;
        }
        if let Some(auto_renew) = self.auto_renew {
            updated.auto_renew = auto_renew;
        }
        if let Some(start) = self.start_date {
            updated.start_date = start;
        }
        if let Some(end) = self.end_date {
            updated.end_date = end;
        }
        updated.scope = BudgetScope::from_title(&updated.title, &updated.category);
        if updated.scope != BudgetScope::AllCategories && updated.category.trim().is_empty() {
            return Err(Error::Validation("budget category is required".to_string()));
        }
        BudgetWindow::new(updated.start_date, updated.end_date)?;
        Ok(updated)
    }
}

/// Expense status tag (set by OCR ingestion, informational for reconciliation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    #[default]
    Verified,
    Pending,
    Duplicate,
    Error,
    Failed,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Pending => "pending",
            Self::Duplicate => "duplicate",
            Self::Error => "error",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ExpenseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verified" => Ok(Self::Verified),
            "pending" => Ok(Self::Pending),
            "duplicate" => Ok(Self::Duplicate),
            "error" => Ok(Self::Error),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown expense status: {}", s)),
        }
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an expense entered the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseSource {
    #[default]
    Manual,
    /// Extracted from a payment-app screenshot
    Ocr,
}

impl ExpenseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Ocr => "ocr",
        }
    }
}

impl std::str::FromStr for ExpenseSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "ocr" => Ok(Self::Ocr),
            _ => Err(format!("Unknown expense source: {}", s)),
        }
    }
}

/// A recorded expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    /// Always positive
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    pub status: ExpenseStatus,
    pub source: ExpenseSource,
    /// Fingerprint for OCR imports
    pub import_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An expense to be inserted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: ExpenseStatus,
    #[serde(default)]
    pub source: ExpenseSource,
    #[serde(default)]
    pub import_hash: Option<String>,
}

impl NewExpense {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("expense title is required".to_string()));
        }
        validate_amount(self.amount)?;
        if self.category.trim().is_empty() {
            return Err(Error::Validation("expense category is required".to_string()));
        }
        Ok(())
    }
}

/// Partial expense edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<ExpenseStatus>,
}

impl ExpenseUpdate {
    pub fn apply(&self, expense: &Expense) -> Result<Expense> {
        let mut updated = expense.clone();
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("expense title is required".to_string()));
            }
            updated.title = title.clone();
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
            updated.amount = amount;
        }
        if let Some(category) = &self.category {
            if category.trim().is_empty() {
                return Err(Error::Validation("expense category is required".to_string()));
            }
            updated.category = category.clone();
        }
        if let Some(date) = self.date {
            updated.date = date;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        Ok(updated)
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::Validation(format!(
            "amount must be a positive number, got {}",
            amount
        )));
    }
    Ok(())
}

/// Threshold alerts a budget can emit, each at most once per budget row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Remaining amount fell to 10% of the cap or less
    TenPercentRemaining,
    /// Nothing remains
    Exhausted,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TenPercentRemaining => "ten_percent_remaining",
            Self::Exhausted => "exhausted",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_scope_from_sentinel_title() {
        assert_eq!(
            BudgetScope::from_title(MONTHLY_BUDGET_TITLE, "Income"),
            BudgetScope::AllCategories
        );
        assert_eq!(
            BudgetScope::from_title("Groceries", "Food"),
            BudgetScope::Category("Food".to_string())
        );
    }

    #[test]
    fn test_scope_matching() {
        assert!(BudgetScope::AllCategories.matches("Transport"));
        let food = BudgetScope::Category("Food".to_string());
        assert!(food.matches("Food"));
        assert!(!food.matches("food"));
        assert!(!food.matches("Dining"));
    }

    #[test]
    fn test_window_inclusive() {
        let w = BudgetWindow::new(date(2025, 6, 1), date(2025, 6, 30)).unwrap();
        assert!(w.contains(date(2025, 6, 1)));
        assert!(w.contains(date(2025, 6, 30)));
        assert!(!w.contains(date(2025, 5, 31)));
        assert!(!w.contains(date(2025, 7, 1)));
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        assert!(BudgetWindow::new(date(2025, 7, 1), date(2025, 6, 1)).is_err());
    }

    #[test]
    fn test_covering_window() {
        let a = BudgetWindow::new(date(2025, 6, 1), date(2025, 6, 30)).unwrap();
        let b = BudgetWindow::new(date(2025, 4, 1), date(2025, 6, 15)).unwrap();
        let c = BudgetWindow::covering([a, b]).unwrap();
        assert_eq!(c.start, date(2025, 4, 1));
        assert_eq!(c.end, date(2025, 6, 30));
        assert!(BudgetWindow::covering(Vec::new()).is_none());
    }

    #[test]
    fn test_new_budget_validation() {
        let mut budget = NewBudget {
            title: "Groceries".to_string(),
            category: "Food".to_string(),
            amount: 1000.0,
            period: BudgetPeriod::Monthly,
            auto_renew: false,
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 30),
        };
        assert!(budget.validate().is_ok());

        budget.amount = 0.0;
        assert!(matches!(budget.validate(), Err(Error::Validation(_))));

        budget.amount = 10.0;
        budget.category = String::new();
        assert!(budget.validate().is_err());

        // Sentinel budgets don't need a category
        budget.title = MONTHLY_BUDGET_TITLE.to_string();
        assert!(budget.validate().is_ok());
    }

    #[test]
    fn test_budget_update_recomputes_scope() {
        let budget = Budget {
            id: 1,
            user_id: 1,
            title: "Groceries".to_string(),
            category: "Food".to_string(),
            scope: BudgetScope::Category("Food".to_string()),
            amount: 1000.0,
            used: 0.0,
            period: BudgetPeriod::Monthly,
            auto_renew: false,
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 30),
            alert_10_percent_sent: false,
            alert_exhausted_sent: false,
            created_at: Utc::now(),
        };

        let update = BudgetUpdate {
            title: Some(MONTHLY_BUDGET_TITLE.to_string()),
            ..Default::default()
        };
        let updated = update.apply(&budget).unwrap();
        assert_eq!(updated.scope, BudgetScope::AllCategories);

        let bad = BudgetUpdate {
            end_date: Some(date(2025, 5, 1)),
            ..Default::default()
        };
        assert!(bad.apply(&budget).is_err());
    }

    #[test]
    fn test_budget_update_requires_category_for_scoped_budget() {
        let sentinel = Budget {
            id: 1,
            user_id: 1,
            title: MONTHLY_BUDGET_TITLE.to_string(),
            category: String::new(),
            scope: BudgetScope::AllCategories,
            amount: 500.0,
            used: 100.0,
            period: BudgetPeriod::Monthly,
            auto_renew: true,
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 30),
            alert_10_percent_sent: false,
            alert_exhausted_sent: false,
            created_at: Utc::now(),
        };

        // Renaming away from the sentinel needs a category to match on
        let rename = BudgetUpdate {
            title: Some("Household".to_string()),
            ..Default::default()
        };
        assert!(matches!(rename.apply(&sentinel), Err(Error::Validation(_))));

        let rename_with_category = BudgetUpdate {
            title: Some("Household".to_string()),
            category: Some("Home".to_string()),
            ..Default::default()
        };
        assert_eq!(
            rename_with_category.apply(&sentinel).unwrap().scope,
            BudgetScope::Category("Home".to_string())
        );

        let mut scoped = sentinel.clone();
        scoped.title = "Groceries".to_string();
        scoped.category = "Food".to_string();
        scoped.scope = BudgetScope::Category("Food".to_string());
        let blank = BudgetUpdate {
            category: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(blank.apply(&scoped), Err(Error::Validation(_))));
    }

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!("pending".parse::<ExpenseStatus>().unwrap(), ExpenseStatus::Pending);
        assert_eq!(ExpenseStatus::Duplicate.as_str(), "duplicate");
        assert!("bogus".parse::<ExpenseStatus>().is_err());
        assert_eq!("yearly".parse::<BudgetPeriod>().unwrap(), BudgetPeriod::Annual);
    }
}
