use super::matching::MatchedSale;
use super::transaction::{round2, NormalizedTransaction, TransactionKind};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

/// Default flat capital gains rate
pub const DEFAULT_TAX_RATE: Decimal = dec!(0.19);

/// Fiscal year, which runs with the calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FiscalYear(pub i32);

impl FiscalYear {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.0
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    /// `None` summarises every year
    pub fiscal_year: Option<FiscalYear>,
    pub flat_rate: Decimal,
    pub include_dividends: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        SummaryOptions {
            fiscal_year: None,
            flat_rate: DEFAULT_TAX_RATE,
            include_dividends: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxSummary {
    pub fiscal_year: Option<FiscalYear>,
    pub sale_count: usize,
    pub unmatched_sale_count: usize,
    pub total_proceeds: Decimal,
    pub total_cost_basis: Decimal,
    /// Sum of realized gains rounded to cents
    pub realized_gain: Decimal,
    pub dividend_income: Decimal,
    pub dividends_included: bool,
    /// Amount the flat rate is applied to
    pub taxable_amount: Decimal,
    pub flat_rate: Decimal,
    pub tax_due: Decimal,
}

/// Aggregate realized gains of the sales in the fiscal year and apply the flat rate.
///
/// Dividend income is always totalled but only taxed when
/// `include_dividends` is set.
pub fn summarize(
    sales: &[MatchedSale],
    dividends: &[NormalizedTransaction],
    options: &SummaryOptions,
) -> TaxSummary {
    let in_year = |date: NaiveDate| options.fiscal_year.is_none_or(|y| y.contains(date));

    let sales: Vec<&MatchedSale> = sales
        .iter()
        .filter(|s| in_year(s.transaction.date))
        .collect();

    let total_proceeds: Decimal = sales.iter().map(|s| s.proceeds()).sum();
    let total_cost_basis: Decimal = sales.iter().map(|s| s.cost_basis).sum();
    let realized_gain = round2(sales.iter().map(|s| s.realized_gain).sum());

    let dividend_income: Decimal = dividends
        .iter()
        .filter(|d| d.kind == TransactionKind::Dividend && in_year(d.date))
        .map(|d| d.local_amount)
        .sum();

    let taxable_amount = if options.include_dividends {
        round2(realized_gain + dividend_income)
    } else {
        realized_gain
    };
    let tax_due = round2(taxable_amount * options.flat_rate);

    TaxSummary {
        fiscal_year: options.fiscal_year,
        sale_count: sales.len(),
        unmatched_sale_count: sales.iter().filter(|s| !s.is_fully_matched()).count(),
        total_proceeds: round2(total_proceeds),
        total_cost_basis: round2(total_cost_basis),
        realized_gain,
        dividend_income: round2(dividend_income),
        dividends_included: options.include_dividends,
        taxable_amount,
        flat_rate: options.flat_rate,
        tax_due,
    }
}
