//! User handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{actor, read_json, AppError, AppState, MAX_BODY_SIZE};
use tally_core::models::User;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: Option<String>,
}

/// POST /api/users - Register a user
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<User>), AppError> {
    let body: CreateUserRequest = read_json(request, MAX_BODY_SIZE).await?;

    let user = state.db.create_user(&body.email, body.name.as_deref())?;

    state.db.log_audit(
        "api",
        "create",
        Some("user"),
        Some(user.id),
        Some(&format!("email={}", user.email)),
    )?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/:user_id - Get a user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let user = state.db.get_user(user_id)?;

    state
        .db
        .log_audit(&actor(user_id), "view", Some("user"), Some(user_id), None)?;

    Ok(Json(user))
}
