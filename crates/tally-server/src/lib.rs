//! Tally Web Server
//!
//! Axum-based REST API over the Tally budget engine.
//!
//! - Every route is user-scoped by the `:user_id` path segment
//! - Restrictive CORS policy and security headers
//! - Audit logging for API reads and writes
//! - Sanitized error responses (`{"success": false, "message": ...}`)

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info};

use tally_core::{Database, EngineConfig, Error as CoreError, NotifierClient, Notifier};

mod handlers;
mod scheduler;

pub use scheduler::{start_alert_scheduler, AlertScheduleConfig};

/// Maximum JSON body size for ordinary requests (10 KB)
pub const MAX_BODY_SIZE: usize = 10 * 1024;

/// Maximum JSON body size for OCR text uploads (256 KB)
pub const MAX_OCR_BODY_SIZE: usize = 256 * 1024;

/// Maximum audit log page size
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub notifier: NotifierClient,
    pub engine: EngineConfig,
}

/// Audit actor for user-scoped requests
pub(crate) fn actor(user_id: i64) -> String {
    format!("user:{}", user_id)
}

/// Read and parse a JSON request body
pub(crate) async fn read_json<T: DeserializeOwned>(
    request: Request,
    limit: usize,
) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::bad_request(&format!("Invalid JSON: {}", e)))
}

/// Parse an optional `YYYY-MM-DD` query parameter
pub(crate) fn parse_date_param(
    name: &str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, AppError> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request(&format!("Invalid {} format (use YYYY-MM-DD)", name)))
}

/// Success/message envelope
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Create the application router
pub fn create_router(
    db: Database,
    notifier: NotifierClient,
    engine: EngineConfig,
    config: ServerConfig,
) -> Router {
    info!(notifier = notifier.name(), "Notification sender configured");

    let state = Arc::new(AppState {
        db,
        notifier,
        engine,
    });

    let api_routes = Router::new()
        // Users
        .route("/users", post(handlers::create_user))
        .route("/users/:user_id", get(handlers::get_user))
        // Budgets
        .route(
            "/users/:user_id/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route(
            "/users/:user_id/budgets/recalculate",
            post(handlers::recalculate_budgets),
        )
        .route(
            "/users/:user_id/budgets/monthly-sync",
            post(handlers::sync_monthly_budget),
        )
        .route(
            "/users/:user_id/budgets/:id",
            get(handlers::get_budget)
                .put(handlers::update_budget)
                .delete(handlers::delete_budget),
        )
        .route("/budgets/window", get(handlers::budget_window))
        // Expenses
        .route(
            "/users/:user_id/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/users/:user_id/expenses/ocr",
            post(handlers::import_ocr_expenses),
        )
        .route(
            "/users/:user_id/expenses/:id",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
        // Alerts
        .route("/alerts/scan", post(handlers::run_alert_scan))
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server with notifier and engine config taken from the environment
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let engine = EngineConfig::load()?;
    let notifier = NotifierClient::from_env();

    if let Some(schedule) = AlertScheduleConfig::from_env() {
        start_alert_scheduler(
            db.clone(),
            notifier.clone(),
            schedule.with_alerts(engine.alerts.clone()),
        );
    }

    let app = create_router(db, notifier, engine, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "success": false,
            "message": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Caller mistakes surface as-is; everything else stays internal
        match err.downcast_ref::<CoreError>() {
            Some(CoreError::Validation(msg)) => Self::bad_request(msg),
            Some(CoreError::NotFound(what)) => Self::not_found(&format!("{} not found", what)),
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(err),
            },
        }
    }
}
