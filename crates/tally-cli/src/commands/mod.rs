//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `alerts` - Threshold alert scan
//! - `budgets` - Budget commands (list, add, recalc) and the window preview
//! - `core` - Init and shared utilities (open_db)
//! - `expenses` - Expense commands (list, add, delete)
//! - `ocr` - Screenshot text import
//! - `serve` - Web server command
//! - `users` - User commands (add, list)

pub mod alerts;
pub mod budgets;
pub mod core;
pub mod expenses;
pub mod ocr;
pub mod serve;
pub mod users;

// Re-export command functions for main.rs
pub use alerts::*;
pub use budgets::*;
pub use core::*;
pub use expenses::*;
pub use ocr::*;
pub use serve::*;
pub use users::*;

/// Truncate a string for display, appending "..." when cut
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
