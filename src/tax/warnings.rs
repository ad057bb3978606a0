use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Data-integrity warnings emitted while parsing, converting and matching.
/// None of these abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// A statement line could not be turned into a transaction and was dropped.
    ParseFailure {
        line_number: usize,
        line: String,
        reason: String,
    },
    /// No exchange rate is known before the transaction date.
    /// `dropped` is true when the transaction was skipped rather than converted at 0.
    RateGap {
        date: NaiveDate,
        security: String,
        line: String,
        dropped: bool,
    },
    /// Prior purchase lots did not cover the full quantity of a sale.
    UnmatchedSale {
        date: NaiveDate,
        security: String,
        shortfall: Decimal,
    },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::ParseFailure { .. } => "ParseFailure",
            Warning::RateGap { .. } => "RateGap",
            Warning::UnmatchedSale { .. } => "UnmatchedSale",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ParseFailure {
                line_number,
                line,
                reason,
            } => write!(f, "line {}: {} ({})", line_number, reason, line.trim()),
            Warning::RateGap {
                date,
                security,
                dropped,
                ..
            } => {
                let action = if *dropped {
                    "transaction skipped"
                } else {
                    "converted at rate 0"
                };
                write!(f, "{} {}: no exchange rate covers this date, {}", date, security, action)
            }
            Warning::UnmatchedSale {
                date,
                security,
                shortfall,
            } => write!(
                f,
                "{} {}: could not find purchases for {} sold shares",
                date,
                security,
                shortfall.normalize()
            ),
        }
    }
}
