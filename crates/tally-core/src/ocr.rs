//! Payment-app screenshot text to expenses
//!
//! Takes the raw text an OCR engine extracted from a payment history
//! screenshot and turns it into expenses. Parsing is line based: a header
//! line such as `Paid to Swiggy` or `Received from Asha` opens a record, and
//! the following lines fill in its amount, date, status, and reference number.
//!
//! Income records and failed payments are reported but never imported.
//! Duplicates are detected by fingerprint, both within one screenshot and
//! against expenses imported earlier.

use std::collections::HashSet;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseSource, ExpenseStatus, NewExpense};

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Money flow of a parsed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

/// One record recovered from the screenshot text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTransaction {
    pub counterparty: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub status: ExpenseStatus,
    pub direction: Direction,
    /// UPI / transaction reference, when the screenshot shows one
    pub reference: Option<String>,
    pub import_hash: String,
}

/// Everything recovered from one screenshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedStatement {
    pub transactions: Vec<ParsedTransaction>,
    /// Records that opened but never showed an amount
    pub unparsed: usize,
}

/// Which parsed records become expenses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportPlan {
    pub expenses: Vec<NewExpense>,
    pub duplicates: usize,
    pub income_skipped: usize,
    pub failed_skipped: usize,
}

/// Result of importing one screenshot
#[derive(Debug, Clone, Serialize)]
pub struct OcrImportReport {
    pub imported: Vec<Expense>,
    pub duplicates: usize,
    pub income_skipped: usize,
    pub failed_skipped: usize,
    pub unparsed: usize,
}

#[derive(Default)]
struct Draft {
    direction: Option<Direction>,
    counterparty: String,
    amount: Option<f64>,
    date: Option<NaiveDate>,
    status: Option<ExpenseStatus>,
    reference: Option<String>,
}

/// Heuristic parser for payment history text
pub struct OcrParser {
    header: Regex,
    amount: Regex,
    day_month_year: Regex,
    month_day_year: Regex,
    iso_date: Regex,
    numeric_date: Regex,
    reference: Regex,
    failed: Regex,
    pending: Regex,
    verified: Regex,
}

impl OcrParser {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        // Longest symbol first so "Rs." wins over "Rs"
        let mut symbols: Vec<&str> = config
            .currency_symbols
            .iter()
            .map(String::as_str)
            .collect();
        symbols.sort_by_key(|s| std::cmp::Reverse(s.len()));
        let symbols = symbols
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        if symbols.is_empty() {
            return Err(Error::Config("ocr.currency_symbols is empty".to_string()));
        }

        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Config(format!("Invalid OCR pattern: {}", e)))
        };

        Ok(Self {
            header: build(
                r"(?i)^(paid to|sent to|payment to|transferred to|debited|received from|credited|refund(?:ed)?|cashback)\b(?:\s+(from|to)\b)?[:\s]*(.*)$",
            )?,
            amount: build(
                format!(r"(?:{})\s*([0-9][0-9,]*(?:\.[0-9]{{1,2}})?)", symbols).as_str(),
            )?,
            day_month_year: build(r"\b(\d{1,2})\s+([A-Za-z]{3,9})\.?,?\s+(\d{4})\b")?,
            month_day_year: build(r"\b([A-Za-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})\b")?,
            iso_date: build(r"\b(\d{4})-(\d{2})-(\d{2})\b")?,
            numeric_date: build(r"\b(\d{1,2})[/.-](\d{1,2})[/.-](\d{4})\b")?,
            reference: build(
                r"(?i)\b(?:upi\s+)?(?:transaction|txn|ref(?:erence)?|utr)\s*(?:id|no\.?|number)?\s*[:#]?\s*([A-Za-z0-9]{8,})",
            )?,
            failed: build(r"(?i)\b(failed|declined|unsuccessful|cancell?ed|reversed)\b")?,
            pending: build(r"(?i)\b(pending|processing|in progress|awaiting)\b")?,
            verified: build(r"(?i)\b(completed|successful|success|paid)\b")?,
        })
    }

    /// Parse screenshot text; records without a visible date use `fallback_date`
    pub fn parse(&self, text: &str, fallback_date: NaiveDate) -> ParsedStatement {
        let mut statement = ParsedStatement::default();
        let mut current: Option<Draft> = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(caps) = self.header.captures(line) {
                let keyword = caps
                    .get(1)
                    .map(|m| m.as_str().to_lowercase())
                    .unwrap_or_default();
                let rest = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

                // "Debited from HDFC Bank" under a payment names the funding account
                let funding_line =
                    caps.get(2).is_some() && matches!(keyword.as_str(), "debited" | "credited");
                if let Some(draft) = current.as_mut().filter(|_| funding_line) {
                    self.fill(draft, rest);
                    continue;
                }

                if let Some(done) = current.take() {
                    self.finish(done, fallback_date, &mut statement);
                }
                let mut draft = Draft {
                    direction: Some(direction_of(&keyword)),
                    ..Default::default()
                };

                // "Paid to Swiggy ₹250" keeps everything before the amount as the name
                let name_end = self
                    .amount
                    .find(rest)
                    .map(|m| m.start())
                    .unwrap_or(rest.len());
                draft.counterparty = rest[..name_end]
                    .trim()
                    .trim_end_matches(['-', ':'])
                    .trim()
                    .to_string();
                self.fill(&mut draft, rest);

                current = Some(draft);
                continue;
            }

            let Some(draft) = current.as_mut() else {
                continue;
            };

            let consumed = self.fill(draft, line);
            if !consumed && draft.counterparty.is_empty() {
                draft.counterparty = line.to_string();
            }
        }

        if let Some(done) = current.take() {
            self.finish(done, fallback_date, &mut statement);
        }

        debug!(
            parsed = statement.transactions.len(),
            unparsed = statement.unparsed,
            "OCR text parsed"
        );
        statement
    }

    /// Pull whatever fields `line` carries into the draft; true if it carried any
    fn fill(&self, draft: &mut Draft, line: &str) -> bool {
        let mut consumed = false;

        if let Some(amount) = self.parse_amount(line) {
            draft.amount.get_or_insert(amount);
            consumed = true;
        }
        if let Some(date) = self.parse_date(line) {
            draft.date.get_or_insert(date);
            consumed = true;
        }
        if let Some(reference) = self
            .reference
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
        {
            draft.reference.get_or_insert(reference);
            consumed = true;
        }
        if let Some(status) = self.detect_status(line) {
            draft.status.get_or_insert(status);
            consumed = true;
        }

        consumed
    }

    fn finish(&self, draft: Draft, fallback_date: NaiveDate, statement: &mut ParsedStatement) {
        let Some(amount) = draft.amount else {
            statement.unparsed += 1;
            return;
        };

        let counterparty = if draft.counterparty.is_empty() {
            "Payment".to_string()
        } else {
            draft.counterparty
        };
        let date = draft.date.unwrap_or(fallback_date);
        let import_hash = fingerprint(&counterparty, amount, date, draft.reference.as_deref());

        statement.transactions.push(ParsedTransaction {
            counterparty,
            amount,
            date,
            status: draft.status.unwrap_or(ExpenseStatus::Verified),
            direction: draft.direction.unwrap_or(Direction::Debit),
            reference: draft.reference,
            import_hash,
        });
    }

    fn parse_amount(&self, line: &str) -> Option<f64> {
        let caps = self.amount.captures(line)?;
        let amount: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
        (amount > 0.0).then_some(amount)
    }

    fn parse_date(&self, line: &str) -> Option<NaiveDate> {
        if let Some(c) = self.iso_date.captures(line) {
            return ymd(&c[1], c[2].parse().ok()?, &c[3]);
        }
        // Day first, as payment apps in INR locales print it
        if let Some(c) = self.numeric_date.captures(line) {
            return ymd(&c[3], c[2].parse().ok()?, &c[1]);
        }
        if let Some(c) = self.day_month_year.captures(line) {
            if let Some(month) = month_from_name(&c[2]) {
                return ymd(&c[3], month, &c[1]);
            }
        }
        if let Some(c) = self.month_day_year.captures(line) {
            if let Some(month) = month_from_name(&c[1]) {
                return ymd(&c[3], month, &c[2]);
            }
        }
        None
    }

    fn detect_status(&self, line: &str) -> Option<ExpenseStatus> {
        if self.failed.is_match(line) {
            Some(ExpenseStatus::Failed)
        } else if self.pending.is_match(line) {
            Some(ExpenseStatus::Pending)
        } else if self.verified.is_match(line) {
            Some(ExpenseStatus::Verified)
        } else {
            None
        }
    }
}

fn direction_of(keyword: &str) -> Direction {
    if keyword.starts_with("received")
        || keyword.starts_with("credited")
        || keyword.starts_with("refund")
        || keyword.starts_with("cashback")
    {
        Direction::Credit
    } else {
        Direction::Debit
    }
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let prefix = lower.get(..3)?;
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

/// Stable fingerprint of a record
///
/// A reference number, when present, tells apart two otherwise identical
/// payments on the same day. Status is left out so a payment seen first as
/// pending and later as completed is still the same record.
pub fn fingerprint(
    counterparty: &str,
    amount: f64,
    date: NaiveDate,
    reference: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(counterparty.trim().to_lowercase().as_bytes());
    hasher.update(format!("{:.2}", amount).as_bytes());
    if let Some(reference) = reference {
        hasher.update(reference.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Decide which parsed records to import
///
/// `known` holds fingerprints already stored for the user.
pub fn plan_import(
    transactions: &[ParsedTransaction],
    known: &HashSet<String>,
    category: &str,
) -> ImportPlan {
    let mut plan = ImportPlan::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for tx in transactions {
        if tx.direction == Direction::Credit {
            plan.income_skipped += 1;
            continue;
        }
        if tx.status == ExpenseStatus::Failed {
            plan.failed_skipped += 1;
            continue;
        }
        if known.contains(&tx.import_hash) || !seen.insert(tx.import_hash.as_str()) {
            plan.duplicates += 1;
            continue;
        }

        plan.expenses.push(NewExpense {
            title: tx.counterparty.clone(),
            amount: tx.amount,
            category: category.to_string(),
            date: tx.date,
            status: tx.status,
            source: ExpenseSource::Ocr,
            import_hash: Some(tx.import_hash.clone()),
        });
    }

    plan
}

/// Parse screenshot text and import the new debits for `user_id`
///
/// Imported expenses go through the same recalculation as manual ones.
pub fn import_statement(
    db: &Database,
    user_id: i64,
    text: &str,
    config: &OcrConfig,
    category: Option<&str>,
    today: NaiveDate,
) -> Result<OcrImportReport> {
    db.get_user(user_id)?;

    let parser = OcrParser::new(config)?;
    let statement = parser.parse(text, today);
    let known = db.known_import_hashes(user_id)?;

    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&config.default_category);
    let plan = plan_import(&statement.transactions, &known, category);

    let imported = if plan.expenses.is_empty() {
        Vec::new()
    } else {
        db.import_expenses(user_id, &plan.expenses)?
    };

    info!(
        user_id,
        imported = imported.len(),
        duplicates = plan.duplicates,
        income_skipped = plan.income_skipped,
        failed_skipped = plan.failed_skipped,
        "OCR statement imported"
    );

    Ok(OcrImportReport {
        imported,
        duplicates: plan.duplicates,
        income_skipped: plan.income_skipped,
        failed_skipped: plan.failed_skipped,
        unparsed: statement.unparsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parser() -> OcrParser {
        OcrParser::new(&OcrConfig::default()).unwrap()
    }

    const SCREENSHOT: &str = "
        Paid to Swiggy
        ₹ 250.00
        12 Jun 2025, 8:15 PM
        Completed

        Received from Asha Rao
        ₹1,500
        11 Jun 2025
        Completed

        Sent to Metro Card Recharge
        Rs. 200
        10/06/2025
        Pending

        Paid to Zomato
        ₹ 180
        09 Jun 2025
        Failed
    ";

    #[test]
    fn test_parses_records_and_fields() {
        let statement = parser().parse(SCREENSHOT, date(2025, 6, 30));
        assert_eq!(statement.transactions.len(), 4);
        assert_eq!(statement.unparsed, 0);

        let swiggy = &statement.transactions[0];
        assert_eq!(swiggy.counterparty, "Swiggy");
        assert_eq!(swiggy.amount, 250.0);
        assert_eq!(swiggy.date, date(2025, 6, 12));
        assert_eq!(swiggy.status, ExpenseStatus::Verified);
        assert_eq!(swiggy.direction, Direction::Debit);

        let asha = &statement.transactions[1];
        assert_eq!(asha.direction, Direction::Credit);
        assert_eq!(asha.amount, 1500.0);

        let metro = &statement.transactions[2];
        assert_eq!(metro.amount, 200.0);
        assert_eq!(metro.date, date(2025, 6, 10));
        assert_eq!(metro.status, ExpenseStatus::Pending);

        assert_eq!(statement.transactions[3].status, ExpenseStatus::Failed);
    }

    #[test]
    fn test_inline_amount_and_missing_date() {
        let statement = parser().parse("Paid to Chai Point ₹40", date(2025, 6, 30));
        let tx = &statement.transactions[0];
        assert_eq!(tx.counterparty, "Chai Point");
        assert_eq!(tx.amount, 40.0);
        assert_eq!(tx.date, date(2025, 6, 30));
    }

    #[test]
    fn test_counterparty_on_following_line() {
        let text = "Paid to\nBlue Tokai Coffee\n$ 6.50\nJun 3, 2025";
        let statement = parser().parse(text, date(2025, 6, 30));
        let tx = &statement.transactions[0];
        assert_eq!(tx.counterparty, "Blue Tokai Coffee");
        assert_eq!(tx.amount, 6.5);
        assert_eq!(tx.date, date(2025, 6, 3));
    }

    #[test]
    fn test_funding_account_line_stays_with_its_payment() {
        let text = "Paid to Swiggy\nDebited from HDFC Bank\n₹250\n12 Jun 2025";
        let statement = parser().parse(text, date(2025, 6, 30));
        assert_eq!(statement.transactions.len(), 1);
        assert_eq!(statement.unparsed, 0);
        let tx = &statement.transactions[0];
        assert_eq!(tx.counterparty, "Swiggy");
        assert_eq!(tx.amount, 250.0);
        assert_eq!(tx.date, date(2025, 6, 12));

        // Without a payment above it, a debit line is its own record
        let statement = parser().parse("Debited ₹99\n13 Jun 2025", date(2025, 6, 30));
        assert_eq!(statement.transactions.len(), 1);
        assert_eq!(statement.transactions[0].amount, 99.0);
        assert_eq!(statement.transactions[0].date, date(2025, 6, 13));
    }

    #[test]
    fn test_record_without_amount_is_unparsed() {
        let statement = parser().parse("Paid to Someone\nCompleted", date(2025, 6, 30));
        assert!(statement.transactions.is_empty());
        assert_eq!(statement.unparsed, 1);
    }

    #[test]
    fn test_reference_distinguishes_identical_payments() {
        let text = "Paid to Canteen\n₹50\n12 Jun 2025\nUPI transaction ID: 412345678901\n\
                    Paid to Canteen\n₹50\n12 Jun 2025\nUPI transaction ID: 412345678902";
        let statement = parser().parse(text, date(2025, 6, 30));
        assert_eq!(statement.transactions.len(), 2);
        assert_eq!(
            statement.transactions[0].reference.as_deref(),
            Some("412345678901")
        );
        assert_ne!(
            statement.transactions[0].import_hash,
            statement.transactions[1].import_hash
        );
    }

    #[test]
    fn test_plan_skips_income_failed_and_duplicates() {
        let text = format!("{}\nPaid to Swiggy\n₹ 250.00\n12 Jun 2025", SCREENSHOT);
        let statement = parser().parse(&text, date(2025, 6, 30));
        let plan = plan_import(&statement.transactions, &HashSet::new(), "Food");

        assert_eq!(plan.expenses.len(), 2);
        assert_eq!(plan.income_skipped, 1);
        assert_eq!(plan.failed_skipped, 1);
        assert_eq!(plan.duplicates, 1);
        assert!(plan.expenses.iter().all(|e| e.source == ExpenseSource::Ocr));
        assert!(plan.expenses.iter().all(|e| e.category == "Food"));

        // Planning is deterministic for the same input
        let again = plan_import(&statement.transactions, &HashSet::new(), "Food");
        assert_eq!(plan, again);
    }

    #[test]
    fn test_plan_skips_known_hashes() {
        let statement = parser().parse("Paid to Swiggy\n₹250\n12 Jun 2025", date(2025, 6, 30));
        let known: HashSet<String> = statement
            .transactions
            .iter()
            .map(|t| t.import_hash.clone())
            .collect();
        let plan = plan_import(&statement.transactions, &known, "Food");
        assert!(plan.expenses.is_empty());
        assert_eq!(plan.duplicates, 1);
    }

    #[test]
    fn test_fingerprint_ignores_case_and_status() {
        let a = fingerprint("Swiggy", 250.0, date(2025, 6, 12), None);
        let b = fingerprint("  swiggy ", 250.0, date(2025, 6, 12), None);
        assert_eq!(a, b);
        assert_ne!(a, fingerprint("Swiggy", 250.5, date(2025, 6, 12), None));
    }

    #[test]
    fn test_empty_symbols_rejected() {
        let config = OcrConfig {
            default_category: "Misc".to_string(),
            currency_symbols: vec![],
        };
        assert!(matches!(OcrParser::new(&config), Err(Error::Config(_))));
    }
}
