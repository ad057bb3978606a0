//! Brokerage statement parsing
//!
//! The statement is a plain text export listing activity newest first, grouped
//! under year and day headers:
//!
//! ```text
//! 2021
//! 15 March
//! Sell AAPL 2 shares at $121.03 +$242.06
//! Dividend AAPL +$0.82
//! 4 January
//! Buy AAPL 2.5 shares at $129.41 -$323.53
//! ```

use crate::tax::{RawTransaction, TransactionKind, Warning};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Result of parsing a statement: transactions oldest first, plus every line
/// that looked like a transaction but could not be read.
#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub transactions: Vec<RawTransaction>,
    pub failures: Vec<Warning>,
}

/// A statement layout that can be turned into raw transactions
pub trait StatementFormat {
    fn parse(&self, text: &str) -> ParsedStatement;
}

/// Line oriented text statement with year and day headers
pub struct TextStatement {
    year: Regex,
    day: Regex,
    amount: Regex,
}

impl TextStatement {
    pub fn new() -> anyhow::Result<Self> {
        Ok(TextStatement {
            year: Regex::new(r"^\d{4}$")?,
            day: Regex::new(r"^\d{1,2} \w+$")?,
            amount: Regex::new(r"[+-]\$([\d.,]+)")?,
        })
    }

    fn usd_amount(&self, line: &str) -> Option<Decimal> {
        let caps = self.amount.captures(line)?;
        parse_number(caps.get(1)?.as_str())
    }

    fn transaction(
        &self,
        kind: TransactionKind,
        line: &str,
        line_number: usize,
        date: NaiveDate,
    ) -> Result<RawTransaction, String> {
        let usd_amount = self
            .usd_amount(line)
            .ok_or_else(|| "no dollar amount".to_string())?;
        let mut fields = line.split_whitespace().skip(1);
        let security = fields
            .next()
            .filter(|s| !s.contains('$'))
            .unwrap_or_default()
            .to_string();

        let shares = if kind.is_trade() {
            if security.is_empty() {
                return Err("no security".to_string());
            }
            let field = fields.next().unwrap_or_default();
            let shares =
                parse_number(field).ok_or_else(|| format!("invalid share count '{}'", field))?;
            if shares <= Decimal::ZERO {
                return Err(format!("share count must be positive, got '{}'", field));
            }
            Some(shares)
        } else {
            None
        };

        Ok(RawTransaction {
            kind,
            security,
            shares,
            date,
            usd_amount,
            line_number,
            source_line: line.to_string(),
        })
    }
}

impl StatementFormat for TextStatement {
    fn parse(&self, text: &str) -> ParsedStatement {
        let mut parsed = ParsedStatement::default();
        let mut year: Option<i32> = None;
        let mut date: Option<NaiveDate> = None;

        for (i, raw_line) in text.lines().enumerate() {
            let line_number = i + 1;
            let line = raw_line.trim();
            let mut fail = |reason: &str| {
                let warning = Warning::ParseFailure {
                    line_number,
                    line: line.to_string(),
                    reason: reason.to_string(),
                };
                log::warn!("{}", warning);
                parsed.failures.push(warning);
            };

            if line.is_empty() {
                continue;
            }
            if self.year.is_match(line) {
                year = line.parse().ok();
                continue;
            }
            if self.day.is_match(line) {
                date = None;
                match year {
                    Some(y) => match NaiveDate::parse_from_str(&format!("{} {}", y, line), "%Y %d %B") {
                        Ok(d) => date = Some(d),
                        Err(_) => fail("invalid date"),
                    },
                    None => fail("date before any year header"),
                }
                continue;
            }

            let kind = match line.split_whitespace().next() {
                Some("Buy") => TransactionKind::Buy,
                Some("Sell") => TransactionKind::Sell,
                Some("Dividend") => TransactionKind::Dividend,
                _ => {
                    log::warn!("Unrecognised statement line {}: {}", line_number, line);
                    continue;
                }
            };
            let Some(date) = date else {
                fail("transaction before any date header");
                continue;
            };
            match self.transaction(kind, line, line_number, date) {
                Ok(tx) => parsed.transactions.push(tx),
                Err(reason) => fail(&reason),
            }
        }

        // statements list newest first
        parsed.transactions.reverse();
        log::info!(
            "Parsed {} transactions ({} failures)",
            parsed.transactions.len(),
            parsed.failures.len()
        );
        parsed
    }
}

/// Parse a statement number, which may use `,` as a thousands separator
fn parse_number(s: &str) -> Option<Decimal> {
    Decimal::from_str(&s.replace(',', "")).ok()
}
