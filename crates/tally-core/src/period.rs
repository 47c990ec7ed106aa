//! Budget period windows
//!
//! Maps a period kind and a reference year/month to the inclusive date window a
//! budget covers. Months are 1-based everywhere in this module.
//!
//! | Period    | Start                  | End                          |
//! |-----------|------------------------|------------------------------|
//! | monthly   | first of (year, month) | last day of the same month   |
//! | quarterly | first of (year, month) | last day of month + 2        |
//! | biannual  | first of (year, month) | last day of month + 5        |
//! | annual    | Jan 1 of year          | Dec 31 of year               |
//! | custom    | custom start           | last day of the start's month|
//!
//! Windows that span past December roll into the next year. Invalid input
//! never errors: the window of the reference day's calendar month is returned.

use chrono::{Datelike, Days, NaiveDate, Utc};
use tracing::warn;

use crate::models::{BudgetPeriod, BudgetWindow};

/// Compute the window for `period` anchored at `year`/`month`
///
/// `today` is only used for the fallback window when the inputs can't form a
/// valid date.
pub fn period_window(
    period: BudgetPeriod,
    year: i32,
    month: u32,
    custom_start: Option<NaiveDate>,
    today: NaiveDate,
) -> BudgetWindow {
    match try_period_window(period, year, month, custom_start) {
        Some(window) => window,
        None => {
            warn!(
                period = %period,
                year,
                month,
                "Invalid period reference, falling back to current month"
            );
            month_window(today)
        }
    }
}

/// Compute the window for `period` anchored at the current UTC month
pub fn current_period_window(period: BudgetPeriod, custom_start: Option<NaiveDate>) -> BudgetWindow {
    let today = Utc::now().date_naive();
    period_window(period, today.year(), today.month(), custom_start, today)
}

/// The calendar month containing `date`
pub fn month_window(date: NaiveDate) -> BudgetWindow {
    let start = date.with_day(1).unwrap_or(date);
    let end = last_day_of_month(date.year(), date.month(), 0).unwrap_or(date);
    BudgetWindow { start, end }
}

fn try_period_window(
    period: BudgetPeriod,
    year: i32,
    month: u32,
    custom_start: Option<NaiveDate>,
) -> Option<BudgetWindow> {
    let (start, end) = match period {
        BudgetPeriod::Monthly => (
            NaiveDate::from_ymd_opt(year, month, 1)?,
            last_day_of_month(year, month, 0)?,
        ),
        BudgetPeriod::Quarterly => (
            NaiveDate::from_ymd_opt(year, month, 1)?,
            last_day_of_month(year, month, 2)?,
        ),
        BudgetPeriod::Biannual => (
            NaiveDate::from_ymd_opt(year, month, 1)?,
            last_day_of_month(year, month, 5)?,
        ),
        BudgetPeriod::Annual => (
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        ),
        // Custom still collapses to a single month after the start date
        BudgetPeriod::Custom => match custom_start {
            Some(start) => (start, last_day_of_month(start.year(), start.month(), 0)?),
            None => (
                NaiveDate::from_ymd_opt(year, month, 1)?,
                last_day_of_month(year, month, 0)?,
            ),
        },
    };

    Some(BudgetWindow { start, end })
}

/// Last day of the month `offset` months after (`year`, `month`)
fn last_day_of_month(year: i32, month: u32, offset: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    // Index of the month after the target, counted from year 0
    let next = i64::from(year) * 12 + i64::from(month - 1) + i64::from(offset) + 1;
    let next_year = i32::try_from(next.div_euclid(12)).ok()?;
    let next_month = u32::try_from(next.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 6, 15)
    }

    #[test]
    fn test_monthly_window() {
        let w = period_window(BudgetPeriod::Monthly, 2025, 6, None, today());
        assert_eq!(w.start, date(2025, 6, 1));
        assert_eq!(w.end, date(2025, 6, 30));
    }

    #[test]
    fn test_monthly_leap_february() {
        let w = period_window(BudgetPeriod::Monthly, 2024, 2, None, today());
        assert_eq!(w.end, date(2024, 2, 29));

        let w = period_window(BudgetPeriod::Monthly, 2025, 2, None, today());
        assert_eq!(w.end, date(2025, 2, 28));
    }

    #[test]
    fn test_quarterly_window() {
        let w = period_window(BudgetPeriod::Quarterly, 2025, 4, None, today());
        assert_eq!(w.start, date(2025, 4, 1));
        assert_eq!(w.end, date(2025, 6, 30));
    }

    #[test]
    fn test_quarterly_rolls_into_next_year() {
        let w = period_window(BudgetPeriod::Quarterly, 2025, 11, None, today());
        assert_eq!(w.start, date(2025, 11, 1));
        assert_eq!(w.end, date(2026, 1, 31));
    }

    #[test]
    fn test_biannual_window() {
        let w = period_window(BudgetPeriod::Biannual, 2025, 1, None, today());
        assert_eq!(w.start, date(2025, 1, 1));
        assert_eq!(w.end, date(2025, 6, 30));

        let w = period_window(BudgetPeriod::Biannual, 2025, 9, None, today());
        assert_eq!(w.end, date(2026, 2, 28));
    }

    #[test]
    fn test_annual_ignores_month() {
        let w = period_window(BudgetPeriod::Annual, 2025, 7, None, today());
        assert_eq!(w.start, date(2025, 1, 1));
        assert_eq!(w.end, date(2025, 12, 31));
    }

    #[test]
    fn test_custom_collapses_to_start_month() {
        let w = period_window(
            BudgetPeriod::Custom,
            2025,
            1,
            Some(date(2025, 3, 10)),
            today(),
        );
        assert_eq!(w.start, date(2025, 3, 10));
        assert_eq!(w.end, date(2025, 3, 31));
    }

    #[test]
    fn test_custom_without_start_is_monthly() {
        let w = period_window(BudgetPeriod::Custom, 2025, 8, None, today());
        assert_eq!(w.start, date(2025, 8, 1));
        assert_eq!(w.end, date(2025, 8, 31));
    }

    #[test]
    fn test_invalid_month_falls_back_to_today() {
        let w = period_window(BudgetPeriod::Monthly, 2025, 13, None, today());
        assert_eq!(w.start, date(2025, 6, 1));
        assert_eq!(w.end, date(2025, 6, 30));

        let w = period_window(BudgetPeriod::Quarterly, 2025, 0, None, today());
        assert_eq!(w, month_window(today()));
    }

    #[test]
    fn test_unrepresentable_year_falls_back() {
        let w = period_window(BudgetPeriod::Annual, i32::MAX, 1, None, today());
        assert_eq!(w, month_window(today()));
    }

    #[test]
    fn test_month_window_december() {
        let w = month_window(date(2025, 12, 25));
        assert_eq!(w.start, date(2025, 12, 1));
        assert_eq!(w.end, date(2025, 12, 31));
    }
}
