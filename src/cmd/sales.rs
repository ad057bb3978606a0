//! Sales command - every sale with the purchase lots that funded it

use super::{format_amount, format_quantity, InputArgs};
use crate::tax::{FiscalYear, MatchReport, MatchedSale};
use clap::Args;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SalesCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Fiscal year to filter (e.g. 2021)
    #[arg(short, long)]
    year: Option<i32>,

    /// Filter by security (e.g. AAPL)
    #[arg(long)]
    security: Option<String>,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

impl SalesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.load()?;
        let rows = build_sale_rows(
            &portfolio.matches,
            self.year.map(FiscalYear),
            self.security.as_deref(),
        );

        if self.csv {
            self.write_csv(&rows)
        } else {
            self.print_table(&rows);
            Ok(())
        }
    }

    fn print_table(&self, rows: &[SaleRow]) {
        if rows.is_empty() {
            println!("No sales found matching filters");
            return;
        }

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    fn write_csv(&self, rows: &[SaleRow]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Row for the sales table output
#[derive(Debug, Clone, Tabled, serde::Serialize)]
pub struct SaleRow {
    #[tabled(rename = "Date")]
    pub date: String,

    #[tabled(rename = "Security")]
    pub security: String,

    #[tabled(rename = "Shares")]
    pub shares: String,

    #[tabled(rename = "Rate")]
    pub rate: String,

    #[tabled(rename = "Proceeds")]
    pub proceeds: String,

    #[tabled(rename = "Cost Basis")]
    pub cost_basis: String,

    #[tabled(rename = "Gain/Loss")]
    pub gain: String,

    #[tabled(rename = "Lots")]
    pub lots: String,

    #[tabled(rename = "Unmatched")]
    pub unmatched: String,
}

fn build_sale_rows(
    report: &MatchReport,
    year: Option<FiscalYear>,
    security: Option<&str>,
) -> Vec<SaleRow> {
    report
        .sales_in(year)
        .filter(|s| security.is_none_or(|sec| s.transaction.security.eq_ignore_ascii_case(sec)))
        .map(|sale| SaleRow {
            date: sale.transaction.date.format("%Y-%m-%d").to_string(),
            security: sale.transaction.security.clone(),
            shares: format_quantity(sale.transaction.shares()),
            rate: sale.transaction.rate.normalize().to_string(),
            proceeds: format_amount(sale.proceeds()),
            cost_basis: format_amount(sale.cost_basis),
            gain: format_amount(sale.realized_gain),
            lots: describe_lots(report, sale),
            unmatched: if sale.is_fully_matched() {
                String::new()
            } else {
                format_quantity(sale.shortfall)
            },
        })
        .collect()
}

/// e.g. "2020-01-02 x4 @ 1140.00; 2020-06-01 x2 @ 608.00"
fn describe_lots(report: &MatchReport, sale: &MatchedSale) -> String {
    sale.allocations
        .iter()
        .map(|a| {
            format!(
                "{} x{} @ {}",
                report.lot(a.lot).transaction.date.format("%Y-%m-%d"),
                format_quantity(a.shares),
                format_amount(a.cost)
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{match_lots, NormalizedTransaction, TransactionKind};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tx(id: usize, kind: TransactionKind, date: &str, security: &str, shares: Decimal, local: Decimal) -> NormalizedTransaction {
        NormalizedTransaction {
            id,
            kind,
            security: security.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            raw_shares: Some(shares),
            usd_amount: local,
            rate: dec!(3.80),
            split_multiplier: Decimal::ONE,
            local_amount: local,
            adjusted_shares: Some(shares),
            source_line: String::new(),
        }
    }

    fn report() -> MatchReport {
        match_lots(&[
            tx(0, TransactionKind::Buy, "2020-01-02", "AAPL", dec!(4), dec!(1140)),
            tx(1, TransactionKind::Buy, "2020-06-01", "AAPL", dec!(4), dec!(1216)),
            tx(2, TransactionKind::Sell, "2020-12-01", "TSLA", dec!(1), dec!(100)),
            tx(3, TransactionKind::Sell, "2021-03-15", "AAPL", dec!(6), dec!(2808)),
        ])
    }

    #[test]
    fn rows_describe_lots() {
        let rows = build_sale_rows(&report(), Some(FiscalYear(2021)), None);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.date, "2021-03-15");
        assert_eq!(row.shares, "6");
        assert_eq!(row.rate, "3.8");
        assert_eq!(row.cost_basis, "1748.00");
        assert_eq!(row.gain, "1060.00");
        assert_eq!(row.lots, "2020-01-02 x4 @ 1140.00; 2020-06-01 x2 @ 608.00");
        assert_eq!(row.unmatched, "");
    }

    #[test]
    fn security_filter_is_case_insensitive() {
        let rows = build_sale_rows(&report(), None, Some("tsla"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].security, "TSLA");
        assert_eq!(rows[0].unmatched, "1");
        assert_eq!(rows[0].lots, "");
    }
}
