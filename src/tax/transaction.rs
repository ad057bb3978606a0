use super::rates::RateTable;
use super::splits::SplitTable;
use super::warnings::Warning;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("{kind} of {security} on {date} has no share count")]
    MissingShares {
        kind: TransactionKind,
        security: String,
        date: NaiveDate,
    },
    #[error("{kind} of {security} on {date} is too large to convert")]
    AmountOverflow {
        kind: TransactionKind,
        security: String,
        date: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    Buy,
    Sell,
    Dividend,
}

impl TransactionKind {
    pub fn is_trade(self) -> bool {
        matches!(self, TransactionKind::Buy | TransactionKind::Sell)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Buy => "Buy",
            TransactionKind::Sell => "Sell",
            TransactionKind::Dividend => "Dividend",
        };
        write!(f, "{}", s)
    }
}

/// Transaction as extracted from the statement, amounts in USD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub kind: TransactionKind,
    pub security: String,
    /// Share count as printed on the statement (Buy/Sell only)
    pub shares: Option<Decimal>,
    pub date: NaiveDate,
    /// Unsigned dollar magnitude of the transaction
    pub usd_amount: Decimal,
    pub line_number: usize,
    pub source_line: String,
}

/// Transaction converted to local currency with share counts in current units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTransaction {
    /// Position in chronological ingestion order, used to break date ties
    pub id: usize,
    pub kind: TransactionKind,
    pub security: String,
    pub date: NaiveDate,
    pub raw_shares: Option<Decimal>,
    pub usd_amount: Decimal,
    pub rate: Decimal,
    pub split_multiplier: Decimal,
    pub local_amount: Decimal,
    pub adjusted_shares: Option<Decimal>,
    pub source_line: String,
}

impl NormalizedTransaction {
    /// Split-adjusted share count, zero for dividends
    pub fn shares(&self) -> Decimal {
        self.adjusted_shares.unwrap_or(Decimal::ZERO)
    }
}

/// How to treat a transaction dated before the first known exchange rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateGapPolicy {
    /// Convert with a rate of zero and keep the transaction
    #[default]
    Zero,
    /// Drop the transaction
    Skip,
}

/// Round to whole cents, halves away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a raw transaction using an already resolved rate and split multiplier.
pub fn normalize(
    id: usize,
    raw: &RawTransaction,
    rate: Decimal,
    split_multiplier: Decimal,
) -> Result<NormalizedTransaction, TransactionError> {
    let overflow = || TransactionError::AmountOverflow {
        kind: raw.kind,
        security: raw.security.clone(),
        date: raw.date,
    };
    let adjusted_shares = match (raw.kind.is_trade(), raw.shares) {
        (true, Some(shares)) => Some(shares.checked_mul(split_multiplier).ok_or_else(overflow)?),
        (true, None) => {
            return Err(TransactionError::MissingShares {
                kind: raw.kind,
                security: raw.security.clone(),
                date: raw.date,
            })
        }
        (false, _) => None,
    };

    let local_amount = raw.usd_amount.checked_mul(rate).ok_or_else(overflow)?;

    Ok(NormalizedTransaction {
        id,
        kind: raw.kind,
        security: raw.security.clone(),
        date: raw.date,
        raw_shares: raw.shares,
        usd_amount: raw.usd_amount,
        rate,
        split_multiplier,
        local_amount: round2(local_amount),
        adjusted_shares,
        source_line: raw.source_line.clone(),
    })
}

/// Resolve rates and split multipliers for every transaction and normalize it.
///
/// Transactions must already be in chronological order; ids are assigned in
/// that order. Problems are reported as warnings and the offending
/// transaction is dropped.
pub fn normalize_all(
    raw: &[RawTransaction],
    rates: &RateTable,
    splits: &SplitTable,
    gap_policy: RateGapPolicy,
) -> (Vec<NormalizedTransaction>, Vec<Warning>) {
    let mut transactions = Vec::with_capacity(raw.len());
    let mut warnings = Vec::new();

    for tx in raw {
        let rate = match rates.rate_as_of(tx.date) {
            Some(rate) => rate,
            None => {
                let dropped = gap_policy == RateGapPolicy::Skip;
                let warning = Warning::RateGap {
                    date: tx.date,
                    security: tx.security.clone(),
                    line: tx.source_line.clone(),
                    dropped,
                };
                log::warn!("{}", warning);
                warnings.push(warning);
                if dropped {
                    continue;
                }
                Decimal::ZERO
            }
        };
        let multiplier = if tx.kind.is_trade() {
            splits.multiplier(&tx.security, tx.date)
        } else {
            Decimal::ONE
        };

        match normalize(transactions.len(), tx, rate, multiplier) {
            Ok(normalized) => transactions.push(normalized),
            Err(err) => {
                let warning = Warning::ParseFailure {
                    line_number: tx.line_number,
                    line: tx.source_line.clone(),
                    reason: err.to_string(),
                };
                log::warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    (transactions, warnings)
}
