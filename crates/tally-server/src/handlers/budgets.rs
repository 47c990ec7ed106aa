//! Budget handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{actor, parse_date_param, read_json, AppError, AppState, MessageResponse, MAX_BODY_SIZE};
use tally_core::models::{Budget, BudgetPeriod, BudgetUpdate, BudgetWindow, NewBudget};
use tally_core::period_window;

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub success: bool,
    pub budget: Budget,
}

impl BudgetResponse {
    fn ok(budget: Budget) -> Self {
        Self {
            success: true,
            budget,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub success: bool,
    pub message: String,
    pub budgets_updated: usize,
}

#[derive(Debug, Deserialize)]
pub struct MonthlySyncRequest {
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub period: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub custom_start: Option<String>,
}

/// GET /api/users/:user_id/budgets - List a user's budgets
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Budget>>, AppError> {
    let budgets = state.db.list_budgets(user_id)?;

    state.db.log_audit(
        &actor(user_id),
        "list",
        Some("budget"),
        None,
        Some(&format!("count={}", budgets.len())),
    )?;

    Ok(Json(budgets))
}

/// POST /api/users/:user_id/budgets - Create a budget
///
/// The new budget's `used` already counts existing expenses in its window.
pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    request: Request,
) -> Result<(StatusCode, Json<BudgetResponse>), AppError> {
    let body: NewBudget = read_json(request, MAX_BODY_SIZE).await?;

    let budget = state.db.create_budget(user_id, &body)?;

    state.db.log_audit(
        &actor(user_id),
        "create",
        Some("budget"),
        Some(budget.id),
        Some(&format!("title={} amount={:.2}", budget.title, budget.amount)),
    )?;

    Ok((StatusCode::CREATED, Json(BudgetResponse::ok(budget))))
}

/// GET /api/users/:user_id/budgets/:id - Get a budget
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(i64, i64)>,
) -> Result<Json<BudgetResponse>, AppError> {
    let budget = state.db.get_budget(user_id, id)?;

    state
        .db
        .log_audit(&actor(user_id), "view", Some("budget"), Some(id), None)?;

    Ok(Json(BudgetResponse::ok(budget)))
}

/// PUT /api/users/:user_id/budgets/:id - Edit a budget
pub async fn update_budget(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(i64, i64)>,
    request: Request,
) -> Result<Json<BudgetResponse>, AppError> {
    let body: BudgetUpdate = read_json(request, MAX_BODY_SIZE).await?;

    let budget = state.db.update_budget(user_id, id, &body)?;

    state.db.log_audit(
        &actor(user_id),
        "update",
        Some("budget"),
        Some(id),
        Some(&format!("amount={:.2} used={:.2}", budget.amount, budget.used)),
    )?;

    Ok(Json(BudgetResponse::ok(budget)))
}

/// DELETE /api/users/:user_id/budgets/:id - Delete a budget (its expenses stay)
pub async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>, AppError> {
    state.db.delete_budget(user_id, id)?;

    state
        .db
        .log_audit(&actor(user_id), "delete", Some("budget"), Some(id), None)?;

    Ok(Json(MessageResponse::ok("Budget deleted")))
}

/// POST /api/users/:user_id/budgets/recalculate - Recompute every budget's usage
pub async fn recalculate_budgets(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<RecalculateResponse>, AppError> {
    let updated = state.db.recalculate_all_budgets(user_id)?;

    state.db.log_audit(
        &actor(user_id),
        "recalculate",
        Some("budget"),
        None,
        Some(&format!("updated={}", updated)),
    )?;

    Ok(Json(RecalculateResponse {
        success: true,
        message: format!("Recalculated {} budget(s)", updated),
        budgets_updated: updated,
    }))
}

/// POST /api/users/:user_id/budgets/monthly-sync - Set this month's overall budget
pub async fn sync_monthly_budget(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    request: Request,
) -> Result<Json<BudgetResponse>, AppError> {
    let body: MonthlySyncRequest = read_json(request, MAX_BODY_SIZE).await?;
    let today = Utc::now().date_naive();

    let budget = state.db.sync_monthly_budget(user_id, body.amount, today)?;

    state.db.log_audit(
        &actor(user_id),
        "monthly_sync",
        Some("budget"),
        Some(budget.id),
        Some(&format!("amount={:.2}", budget.amount)),
    )?;

    Ok(Json(BudgetResponse::ok(budget)))
}

/// GET /api/budgets/window - Preview the window for a period
///
/// `year` and `month` default to the current UTC month; `month` is 1-based.
pub async fn budget_window(
    Query(params): Query<WindowQuery>,
) -> Result<Json<BudgetWindow>, AppError> {
    let period: BudgetPeriod = match params.period.as_deref() {
        Some(p) => p.parse().map_err(|e: String| AppError::bad_request(&e))?,
        None => BudgetPeriod::default(),
    };
    let custom_start = parse_date_param("custom_start", params.custom_start.as_deref())?;

    let today = Utc::now().date_naive();
    let window = period_window(
        period,
        params.year.unwrap_or(today.year()),
        params.month.unwrap_or(today.month()),
        custom_start,
        today,
    );

    Ok(Json(window))
}
