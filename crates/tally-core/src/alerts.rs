//! Threshold alert scanner
//!
//! Sweeps every user's active budgets and sends each one-shot alert at most
//! once per budget row:
//!
//! - `TenPercentRemaining`: `0 < remaining <= ratio * amount`
//! - `Exhausted`: `remaining <= 0`, independent of the low-balance flag
//!
//! A flag is set only after the notifier reports success, so a failed send is
//! retried on the next sweep.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AlertConfig;
use crate::db::Database;
use crate::error::Result;
use crate::models::{AlertKind, Budget};
use crate::notify::{Notification, Notifier};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub users_scanned: usize,
    pub budgets_checked: usize,
    pub alerts_sent: usize,
    /// Sends or flag writes that failed; those alerts are retried next sweep
    pub failures: usize,
}

/// Alerts `budget` is due to send, given its current flags
pub fn pending_alerts(budget: &Budget, ratio: f64) -> Vec<AlertKind> {
    let remaining = budget.remaining();
    let mut due = Vec::new();

    if remaining > 0.0 && remaining <= ratio * budget.amount && !budget.alert_10_percent_sent {
        due.push(AlertKind::TenPercentRemaining);
    }
    if remaining <= 0.0 && !budget.alert_exhausted_sent {
        due.push(AlertKind::Exhausted);
    }

    due
}

/// Run one sweep over all users and their budgets active on `today`
///
/// Per-budget failures are logged and counted, never propagated; only a
/// failure to list users aborts the sweep.
pub async fn run_threshold_scan<N>(
    db: &Database,
    notifier: &N,
    config: &AlertConfig,
    today: NaiveDate,
) -> Result<ScanReport>
where
    N: Notifier + ?Sized,
{
    let users = db.list_users()?;
    let mut report = ScanReport::default();

    for user in &users {
        report.users_scanned += 1;

        let budgets = match db.list_active_budgets(user.id, today) {
            Ok(budgets) => budgets,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "Failed to load budgets for alert scan");
                report.failures += 1;
                continue;
            }
        };

        for budget in &budgets {
            report.budgets_checked += 1;

            for kind in pending_alerts(budget, config.ten_percent_ratio) {
                let notification = Notification::budget_alert(&user.email, kind, budget);

                if let Err(e) = notifier.send(&notification).await {
                    warn!(
                        user_id = user.id,
                        budget_id = budget.id,
                        alert = %kind,
                        notifier = notifier.name(),
                        error = %e,
                        "Alert delivery failed, will retry next scan"
                    );
                    report.failures += 1;
                    continue;
                }

                match db.mark_alert_sent(budget.id, kind) {
                    Ok(()) => {
                        debug!(budget_id = budget.id, alert = %kind, "Alert sent");
                        report.alerts_sent += 1;
                    }
                    Err(e) => {
                        warn!(budget_id = budget.id, alert = %kind, error = %e, "Failed to record alert");
                        report.failures += 1;
                    }
                }
            }
        }
    }

    info!(
        users = report.users_scanned,
        budgets = report.budgets_checked,
        sent = report.alerts_sent,
        failures = report.failures,
        "Alert scan complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetPeriod, BudgetScope};
    use chrono::Utc;

    fn budget(amount: f64, used: f64) -> Budget {
        Budget {
            id: 1,
            user_id: 1,
            title: "Groceries".to_string(),
            category: "Food".to_string(),
            scope: BudgetScope::Category("Food".to_string()),
            amount,
            used,
            period: BudgetPeriod::Monthly,
            auto_renew: false,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            alert_10_percent_sent: false,
            alert_exhausted_sent: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_plenty_remaining_sends_nothing() {
        assert!(pending_alerts(&budget(1000.0, 500.0), 0.10).is_empty());
    }

    #[test]
    fn test_ten_percent_boundary_is_inclusive() {
        assert_eq!(
            pending_alerts(&budget(1000.0, 900.0), 0.10),
            vec![AlertKind::TenPercentRemaining]
        );
        assert!(pending_alerts(&budget(1000.0, 899.0), 0.10).is_empty());
    }

    #[test]
    fn test_exhausted_alone_when_nothing_remains() {
        assert_eq!(
            pending_alerts(&budget(1000.0, 1000.0), 0.10),
            vec![AlertKind::Exhausted]
        );
        assert_eq!(
            pending_alerts(&budget(1000.0, 1010.0), 0.10),
            vec![AlertKind::Exhausted]
        );
    }

    #[test]
    fn test_exhausted_independent_of_low_balance_flag() {
        let mut b = budget(1000.0, 1010.0);
        b.alert_10_percent_sent = true;
        assert_eq!(pending_alerts(&b, 0.10), vec![AlertKind::Exhausted]);
    }

    #[test]
    fn test_flags_suppress_alerts() {
        let mut b = budget(1000.0, 950.0);
        b.alert_10_percent_sent = true;
        assert!(pending_alerts(&b, 0.10).is_empty());

        let mut b = budget(1000.0, 1200.0);
        b.alert_exhausted_sent = true;
        assert!(pending_alerts(&b, 0.10).is_empty());
    }

    #[test]
    fn test_custom_ratio() {
        assert_eq!(
            pending_alerts(&budget(1000.0, 800.0), 0.25),
            vec![AlertKind::TenPercentRemaining]
        );
    }
}
