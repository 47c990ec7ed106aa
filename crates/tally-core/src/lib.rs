//! Tally Core Library
//!
//! Shared functionality for the Tally personal finance backend:
//! - Database access and migrations
//! - Budget period window calculation
//! - Usage reconciliation between budgets and expenses
//! - One-shot threshold alerts with pluggable notification senders
//! - Payment screenshot (OCR text) import

pub mod alerts;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod ocr;
pub mod period;
pub mod reconcile;

pub use alerts::{pending_alerts, run_threshold_scan, ScanReport};
pub use config::{AlertConfig, EngineConfig, OcrConfig};
pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use notify::{
    LogNotifier, MockNotifier, Notification, Notifier, NotifierClient, TemplateId,
    WebhookNotifier,
};
pub use ocr::{import_statement, OcrImportReport, OcrParser};
pub use period::{current_period_window, month_window, period_window};
pub use reconcile::RecalcPlan;
