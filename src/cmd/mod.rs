pub mod lots;
pub mod sales;
pub mod schema;
pub mod summary;
pub mod validate;

use crate::tax::{
    match_lots, normalize_all, MatchReport, NormalizedTransaction, RateGapPolicy, RateTable,
    SplitConfig, SplitTable, Warning,
};
use crate::input::{read_rates, ParsedStatement, StatementFormat, TextStatement, DEFAULT_RATE_COLUMN};
use anyhow::Context;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

/// Input files shared by every command that computes gains
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Statement text export listing buys, sells and dividends
    #[arg(short, long)]
    statement: PathBuf,

    /// Exchange rate archive; repeat for archives covering several years
    #[arg(short, long, required = true)]
    rates: Vec<PathBuf>,

    /// Zero-based column of the rate archive holding the rate
    #[arg(long, default_value_t = DEFAULT_RATE_COLUMN)]
    rate_column: usize,

    /// JSON file with the stock split history (see `schema`)
    #[arg(long)]
    splits: Option<PathBuf>,

    /// What to do with transactions dated before the first known rate
    #[arg(long, value_enum, default_value_t = RateGapArg::Zero)]
    rate_gap: RateGapArg,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum RateGapArg {
    /// Convert at a rate of zero
    #[default]
    Zero,
    /// Leave the transaction out
    Skip,
}

impl From<RateGapArg> for RateGapPolicy {
    fn from(arg: RateGapArg) -> Self {
        match arg {
            RateGapArg::Zero => RateGapPolicy::Zero,
            RateGapArg::Skip => RateGapPolicy::Skip,
        }
    }
}

/// Converted transactions and their matched sales
#[derive(Debug)]
pub struct Portfolio {
    pub transactions: Vec<NormalizedTransaction>,
    pub matches: MatchReport,
    /// Parse failures, rate gaps and unmatched sales, in that order
    pub warnings: Vec<Warning>,
}

impl Portfolio {
    pub fn build(
        parsed: ParsedStatement,
        rates: &RateTable,
        splits: &SplitTable,
        gap_policy: RateGapPolicy,
    ) -> Portfolio {
        let (transactions, conversion_warnings) =
            normalize_all(&parsed.transactions, rates, splits, gap_policy);
        let matches = match_lots(&transactions);

        let mut warnings = parsed.failures;
        warnings.extend(conversion_warnings);
        warnings.extend(matches.warnings.iter().cloned());

        Portfolio {
            transactions,
            matches,
            warnings,
        }
    }
}

impl InputArgs {
    pub fn load(&self) -> anyhow::Result<Portfolio> {
        let rates = self.read_rate_table()?;
        let splits = self.read_splits()?;

        let text = fs::read_to_string(&self.statement)
            .with_context(|| format!("reading statement {}", self.statement.display()))?;
        let parsed = TextStatement::new()?.parse(&text);

        Ok(Portfolio::build(parsed, &rates, &splits, self.rate_gap.into()))
    }

    fn read_rate_table(&self) -> anyhow::Result<RateTable> {
        let mut observations = Vec::new();
        for path in &self.rates {
            let file = File::open(path)
                .with_context(|| format!("opening rate archive {}", path.display()))?;
            let mut rates = read_rates(BufReader::new(file), self.rate_column)
                .with_context(|| format!("reading rate archive {}", path.display()))?;
            observations.append(&mut rates);
        }

        let table = RateTable::new(observations);
        if table.is_empty() {
            anyhow::bail!("No exchange rates found in the given rate archives");
        }
        if let (Some(first), Some(last)) = (table.first_date(), table.last_date()) {
            log::info!("{} exchange rates from {} to {}", table.len(), first, last);
        }
        Ok(table)
    }

    fn read_splits(&self) -> anyhow::Result<SplitTable> {
        let Some(path) = &self.splits else {
            return Ok(SplitTable::default());
        };
        let file = File::open(path)
            .with_context(|| format!("opening split configuration {}", path.display()))?;
        let config = SplitConfig::read_json(BufReader::new(file))?;
        let table = SplitTable::from_config(config)?;
        log::info!("{} stock splits configured", table.event_count());
        Ok(table)
    }
}

fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn format_quantity(qty: Decimal) -> String {
    // Use reasonable precision, removing trailing zeros
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
