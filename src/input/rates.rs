//! Reader for central bank exchange rate archives
//!
//! Semicolon separated, two header lines, date `yyyyMMdd` in the first
//! column and comma decimal rates. A blank line ends the data; anything
//! after it is footer.

use crate::tax::RateObservation;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;

/// Header lines preceding the data rows
const HEADER_LINES: usize = 2;

/// Default column holding the rate
pub const DEFAULT_RATE_COLUMN: usize = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateFileError {
    #[error("row {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}: invalid rate '{value}'")]
    InvalidRate { row: usize, value: String },
    #[error("row {row}: no column {column}")]
    MissingColumn { row: usize, column: usize },
}

pub fn read_rates<R: Read>(mut reader: R, rate_column: usize) -> anyhow::Result<Vec<RateObservation>> {
    // archives are published in windows-1250; only the header and footer
    // carry non-ASCII text
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = String::from_utf8_lossy(&bytes);

    let data: Vec<&str> = text
        .lines()
        .skip(HEADER_LINES)
        .take_while(|line| !line.trim().is_empty())
        .collect();

    let joined = data.join("\n");
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(joined.as_bytes());

    let mut observations = Vec::with_capacity(data.len());
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + HEADER_LINES + 1;
        let date_field = record.get(0).unwrap_or_default().trim();
        let date = NaiveDate::parse_from_str(date_field, "%Y%m%d").map_err(|_| {
            RateFileError::InvalidDate {
                row,
                value: date_field.to_string(),
            }
        })?;
        let rate_field = record
            .get(rate_column)
            .ok_or(RateFileError::MissingColumn {
                row,
                column: rate_column,
            })?
            .trim();
        let rate = parse_rate(rate_field).ok_or_else(|| RateFileError::InvalidRate {
            row,
            value: rate_field.to_string(),
        })?;
        observations.push(RateObservation::new(date, rate));
    }

    log::info!("Read {} rate observations", observations.len());
    Ok(observations)
}

fn parse_rate(s: &str) -> Option<Decimal> {
    Decimal::from_str(&s.replace(',', "."))
        .ok()
        .filter(|rate| *rate > Decimal::ZERO)
}
