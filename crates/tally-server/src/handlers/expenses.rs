//! Expense handlers
//!
//! Every write recomputes the cached usage of the budgets it touches before
//! responding.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    actor, parse_date_param, read_json, AppError, AppState, MessageResponse, MAX_BODY_SIZE,
    MAX_OCR_BODY_SIZE,
};
use tally_core::models::{Expense, ExpenseUpdate, NewExpense};
use tally_core::{import_statement, OcrImportReport};

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub success: bool,
    pub message: String,
    pub expense: Expense,
}

#[derive(Debug, Deserialize)]
pub struct ListExpensesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OcrImportRequest {
    /// Raw text recognized from a payment-app screenshot
    pub text: String,
    pub category: Option<String>,
}

/// GET /api/users/:user_id/expenses - List expenses, optionally by date range
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<ListExpensesQuery>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let from = parse_date_param("from", params.from.as_deref())?;
    let to = parse_date_param("to", params.to.as_deref())?;

    let expenses = state.db.list_expenses(user_id, from, to)?;

    state.db.log_audit(
        &actor(user_id),
        "list",
        Some("expense"),
        None,
        Some(&format!("count={}", expenses.len())),
    )?;

    Ok(Json(expenses))
}

/// POST /api/users/:user_id/expenses - Record an expense
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    request: Request,
) -> Result<(StatusCode, Json<ExpenseResponse>), AppError> {
    let body: NewExpense = read_json(request, MAX_BODY_SIZE).await?;

    let expense = state.db.create_expense(user_id, &body)?;

    state.db.log_audit(
        &actor(user_id),
        "create",
        Some("expense"),
        Some(expense.id),
        Some(&format!(
            "category={} amount={:.2} date={}",
            expense.category, expense.amount, expense.date
        )),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(ExpenseResponse {
            success: true,
            message: "Expense added".to_string(),
            expense,
        }),
    ))
}

/// GET /api/users/:user_id/expenses/:id - Get an expense
pub async fn get_expense(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(i64, i64)>,
) -> Result<Json<Expense>, AppError> {
    let expense = state.db.get_expense(user_id, id)?;
    Ok(Json(expense))
}

/// PUT /api/users/:user_id/expenses/:id - Edit an expense
pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(i64, i64)>,
    request: Request,
) -> Result<Json<ExpenseResponse>, AppError> {
    let body: ExpenseUpdate = read_json(request, MAX_BODY_SIZE).await?;

    let expense = state.db.update_expense(user_id, id, &body)?;

    state.db.log_audit(
        &actor(user_id),
        "update",
        Some("expense"),
        Some(id),
        Some(&format!(
            "category={} amount={:.2} date={}",
            expense.category, expense.amount, expense.date
        )),
    )?;

    Ok(Json(ExpenseResponse {
        success: true,
        message: "Expense updated".to_string(),
        expense,
    }))
}

/// DELETE /api/users/:user_id/expenses/:id - Delete an expense
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>, AppError> {
    state.db.delete_expense(user_id, id)?;

    state
        .db
        .log_audit(&actor(user_id), "delete", Some("expense"), Some(id), None)?;

    Ok(Json(MessageResponse::ok("Expense deleted")))
}

/// POST /api/users/:user_id/expenses/ocr - Import debits from screenshot text
pub async fn import_ocr_expenses(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    request: Request,
) -> Result<Json<OcrImportReport>, AppError> {
    let body: OcrImportRequest = read_json(request, MAX_OCR_BODY_SIZE).await?;
    if body.text.trim().is_empty() {
        return Err(AppError::bad_request("OCR text is empty"));
    }

    let today = Utc::now().date_naive();
    let report = import_statement(
        &state.db,
        user_id,
        &body.text,
        &state.engine.ocr,
        body.category.as_deref(),
        today,
    )?;

    state.db.log_audit(
        &actor(user_id),
        "import_ocr",
        Some("expense"),
        None,
        Some(&format!(
            "imported={} duplicates={}",
            report.imported.len(),
            report.duplicates
        )),
    )?;

    Ok(Json(report))
}
