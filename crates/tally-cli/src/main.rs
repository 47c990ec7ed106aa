//! Tally CLI - Budgets that keep up with your spending
//!
//! Usage:
//!   tally init                                   Initialize database
//!   tally users add me@example.com               Register a user
//!   tally budgets add -u 1 -t Groceries -c Food -a 500
//!   tally expenses add -u 1 -t Lunch -a 12.5 -c Food
//!   tally scan                                   Send due threshold alerts
//!   tally serve --port 3000                      Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            origins,
        } => commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt, origins).await,
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                Some(UsersAction::Add { email, name }) => {
                    commands::cmd_users_add(&db, &email, name.as_deref())
                }
                None | Some(UsersAction::List) => commands::cmd_users_list(&db),
            }
        }
        Commands::Budgets { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                BudgetsAction::List { user } => commands::cmd_budgets_list(&db, user),
                BudgetsAction::Add {
                    user,
                    title,
                    category,
                    amount,
                    period,
                    start,
                    end,
                    auto_renew,
                } => commands::cmd_budgets_add(
                    &db,
                    user,
                    &commands::BudgetArgs {
                        title,
                        category,
                        amount,
                        period,
                        start,
                        end,
                        auto_renew,
                    },
                ),
                BudgetsAction::Recalc { user } => commands::cmd_budgets_recalc(&db, user),
            }
        }
        Commands::Expenses { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                ExpensesAction::List { user, from, to } => {
                    commands::cmd_expenses_list(&db, user, from, to)
                }
                ExpensesAction::Add {
                    user,
                    title,
                    amount,
                    category,
                    date,
                } => commands::cmd_expenses_add(&db, user, &title, amount, &category, date),
                ExpensesAction::Delete { user, id } => commands::cmd_expenses_delete(&db, user, id),
            }
        }
        Commands::Window {
            period,
            year,
            month,
            custom_start,
        } => commands::cmd_window(&period, year, month, custom_start),
        Commands::Scan => commands::cmd_scan(&cli.db, cli.no_encrypt).await,
        Commands::Ocr {
            user,
            file,
            category,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_ocr(&db, user, &file, category.as_deref())
        }
    }
}
