//! Summary command - realized gains and tax due for a fiscal year

use super::{format_amount, InputArgs};
use crate::tax::{summarize, FiscalYear, SummaryOptions, TaxSummary, DEFAULT_TAX_RATE};
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Fiscal year to report (e.g. 2021); all years when omitted
    #[arg(short, long)]
    year: Option<i32>,

    /// Flat tax rate applied to the realized gain
    #[arg(short, long, default_value_t = DEFAULT_TAX_RATE)]
    tax_rate: Decimal,

    /// Add dividend income to the taxed amount
    #[arg(long)]
    include_dividends: bool,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Summary data for JSON output
#[derive(Debug, Serialize)]
struct SummaryData {
    fiscal_year: String,
    sale_count: usize,
    unmatched_sale_count: usize,
    total_proceeds: String,
    total_cost_basis: String,
    realized_gain: String,
    dividend_income: String,
    dividends_included: bool,
    taxable_amount: String,
    tax_rate_pct: String,
    tax_due: String,
    warning_count: usize,
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.load()?;
        let options = SummaryOptions {
            fiscal_year: self.year.map(FiscalYear),
            flat_rate: self.tax_rate,
            include_dividends: self.include_dividends,
        };
        let summary = summarize(&portfolio.matches.sales, &portfolio.transactions, &options);
        let warning_count = portfolio.warnings.len();

        if self.json {
            self.print_json(&summary, warning_count)
        } else {
            self.print_summary(&summary, warning_count);
            Ok(())
        }
    }

    fn print_summary(&self, summary: &TaxSummary, warning_count: usize) {
        println!();
        println!("TAX SUMMARY ({})", year_label(summary));
        println!();
        println!("CAPITAL GAINS");
        println!("  Sales: {}", summary.sale_count);
        println!(
            "  Proceeds: {} | Cost basis: {} | Gain: {}",
            format_amount(summary.total_proceeds),
            format_amount(summary.total_cost_basis),
            format_amount(summary.realized_gain)
        );
        println!();
        println!("DIVIDENDS");
        let treatment = if summary.dividends_included {
            "included"
        } else {
            "excluded"
        };
        println!(
            "  Income: {} ({} from tax)",
            format_amount(summary.dividend_income),
            treatment
        );
        println!();
        println!(
            "TAX DUE @ {}%: {}",
            (summary.flat_rate * dec!(100)).normalize(),
            format_amount(summary.tax_due)
        );

        if summary.unmatched_sale_count > 0 {
            println!();
            println!(
                "WARNING: {} sale(s) without full purchase history, cost basis is incomplete",
                summary.unmatched_sale_count
            );
        }
        if warning_count > 0 {
            println!("{} data warning(s), run `validate` for details", warning_count);
        }
        println!();
    }

    fn print_json(&self, summary: &TaxSummary, warning_count: usize) -> anyhow::Result<()> {
        let data = SummaryData {
            fiscal_year: year_label(summary),
            sale_count: summary.sale_count,
            unmatched_sale_count: summary.unmatched_sale_count,
            total_proceeds: format_amount(summary.total_proceeds),
            total_cost_basis: format_amount(summary.total_cost_basis),
            realized_gain: format_amount(summary.realized_gain),
            dividend_income: format_amount(summary.dividend_income),
            dividends_included: summary.dividends_included,
            taxable_amount: format_amount(summary.taxable_amount),
            tax_rate_pct: (summary.flat_rate * dec!(100)).normalize().to_string(),
            tax_due: format_amount(summary.tax_due),
            warning_count,
        };

        println!("{}", serde_json::to_string_pretty(&data)?);
        Ok(())
    }
}

fn year_label(summary: &TaxSummary) -> String {
    summary
        .fiscal_year
        .map_or("All Years".to_string(), |y| y.to_string())
}
