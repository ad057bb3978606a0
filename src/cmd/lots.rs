//! Lots command - purchase lots and the shares still held from each

use super::{format_amount, format_quantity, InputArgs};
use crate::tax::{BuyLot, MatchReport};
use crate::tax::matching::SHARE_EPSILON;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct LotsCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Filter by security (e.g. AAPL)
    #[arg(long)]
    security: Option<String>,

    /// Include lots that have been fully sold
    #[arg(long)]
    all: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

impl LotsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.load()?;
        let rows = build_lot_rows(&portfolio.matches, self.security.as_deref(), self.all);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if rows.is_empty() {
            println!("No lots found matching filters");
            return Ok(());
        }
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        Ok(())
    }
}

#[derive(Debug, Clone, Tabled, Serialize)]
struct LotRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Security")]
    security: String,
    #[tabled(rename = "Shares")]
    shares: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
    #[tabled(rename = "Remaining Cost")]
    remaining_cost: String,
}

fn build_lot_rows(report: &MatchReport, security: Option<&str>, all: bool) -> Vec<LotRow> {
    report
        .lots
        .iter()
        .filter(|lot| all || lot.remaining_shares > SHARE_EPSILON)
        .filter(|lot| security.is_none_or(|sec| lot.transaction.security.eq_ignore_ascii_case(sec)))
        .map(|lot| LotRow {
            date: lot.transaction.date.format("%Y-%m-%d").to_string(),
            security: lot.transaction.security.clone(),
            shares: format_quantity(lot.transaction.shares()),
            cost: format_amount(lot.transaction.local_amount),
            remaining: format_quantity(lot.remaining_shares),
            remaining_cost: format_amount(remaining_cost(lot)),
        })
        .collect()
}

fn remaining_cost(lot: &BuyLot) -> Decimal {
    let shares = lot.transaction.shares();
    if shares.is_zero() {
        Decimal::ZERO
    } else {
        lot.transaction.local_amount * lot.remaining_shares / shares
    }
}
