//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Tally - Budgets that keep up with your spending
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted budget tracker with threshold alerts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable; same-origin only when omitted)
        #[arg(long = "origin")]
        origins: Vec<String>,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Manage budgets
    Budgets {
        #[command(subcommand)]
        action: BudgetsAction,
    },

    /// Manage expenses
    Expenses {
        #[command(subcommand)]
        action: ExpensesAction,
    },

    /// Show the date window a budget period covers
    Window {
        /// Period: monthly, quarterly, biannual, annual, custom
        #[arg(short, long, default_value = "monthly")]
        period: String,

        /// Reference year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Reference month, 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,

        /// Start date for custom periods (YYYY-MM-DD)
        #[arg(long)]
        custom_start: Option<NaiveDate>,
    },

    /// Run the threshold alert scan once
    ///
    /// Sends low-balance and exhausted alerts through the sender chosen by
    /// the NOTIFIER environment variable (log, webhook).
    Scan,

    /// Import expenses from payment screenshot text
    Ocr {
        /// User to import for
        #[arg(short, long)]
        user: i64,

        /// Text file holding the recognized screenshot text
        #[arg(short, long)]
        file: PathBuf,

        /// Category for imported expenses (defaults to the configured one)
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// Register a user
    Add {
        /// Email address (alert recipient)
        email: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List users
    List,
}

#[derive(Subcommand)]
pub enum BudgetsAction {
    /// List a user's budgets
    List {
        #[arg(short, long)]
        user: i64,
    },

    /// Create a budget
    ///
    /// The window comes from --period anchored at --start (or today), unless
    /// both --start and --end are given. Periods other than custom begin on
    /// the first of the anchor's month, so pass --end or --period custom to
    /// start on the exact --start date.
    Add {
        #[arg(short, long)]
        user: i64,

        /// Budget title ("Monthly Budget" covers every category)
        #[arg(short, long)]
        title: String,

        /// Category the budget tracks
        #[arg(short, long)]
        category: Option<String>,

        /// Spending cap
        #[arg(short, long)]
        amount: f64,

        /// Period: monthly, quarterly, biannual, annual, custom
        #[arg(short, long, default_value = "monthly")]
        period: String,

        /// Window start, or the anchor date for the period (YYYY-MM-DD)
        ///
        /// Without --end, non-custom periods begin on the first of this date's month
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Window end (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Roll the budget over when its period ends
        #[arg(long)]
        auto_renew: bool,
    },

    /// Recompute every budget's usage from the expense table
    Recalc {
        #[arg(short, long)]
        user: i64,
    },
}

#[derive(Subcommand)]
pub enum ExpensesAction {
    /// List a user's expenses
    List {
        #[arg(short, long)]
        user: i64,

        /// Earliest date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Record an expense
    Add {
        #[arg(short, long)]
        user: i64,

        /// What was bought
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        amount: f64,

        #[arg(short, long)]
        category: String,

        /// Expense date (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Delete an expense
    Delete {
        #[arg(short, long)]
        user: i64,

        /// Expense ID
        id: i64,
    },
}
