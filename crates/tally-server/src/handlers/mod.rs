//! HTTP request handlers
//!
//! Each submodule holds the handlers for one resource.

pub mod alerts;
pub mod audit;
pub mod budgets;
pub mod expenses;
pub mod users;

pub use alerts::*;
pub use audit::*;
pub use budgets::*;
pub use expenses::*;
pub use users::*;
