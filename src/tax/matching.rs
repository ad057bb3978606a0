//! FIFO lot matching
//!
//! Every sale is funded from the oldest purchase lots of the same security
//! dated on or before the sale. Remaining lot quantities live in a ledger
//! scoped to one security's pass; sales refer to lots by [`LotId`].

use super::summary::FiscalYear;
use super::transaction::{NormalizedTransaction, TransactionKind};
use super::warnings::Warning;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Residual share quantity below which a sale counts as fully matched
pub const SHARE_EPSILON: Decimal = dec!(0.0000001);

/// Index of a lot in [`MatchReport::lots`]
pub type LotId = usize;

/// A purchase and the quantity still unsold after matching
#[derive(Debug, Clone)]
pub struct BuyLot {
    pub transaction: NormalizedTransaction,
    pub remaining_shares: Decimal,
}

/// Quantity a sale drew from one lot and the prorated cost of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleAllocation {
    pub lot: LotId,
    pub shares: Decimal,
    pub cost: Decimal,
}

#[derive(Debug, Clone)]
pub struct MatchedSale {
    pub transaction: NormalizedTransaction,
    pub allocations: Vec<SaleAllocation>,
    pub cost_basis: Decimal,
    pub realized_gain: Decimal,
    /// Shares that no prior lot could cover
    pub shortfall: Decimal,
}

impl MatchedSale {
    pub fn proceeds(&self) -> Decimal {
        self.transaction.local_amount
    }

    pub fn is_fully_matched(&self) -> bool {
        self.shortfall <= SHARE_EPSILON
    }
}

#[derive(Debug, Default)]
pub struct MatchReport {
    pub lots: Vec<BuyLot>,
    /// Sales in chronological order
    pub sales: Vec<MatchedSale>,
    pub warnings: Vec<Warning>,
}

impl MatchReport {
    pub fn lot(&self, id: LotId) -> &BuyLot {
        &self.lots[id]
    }

    pub fn sales_in(&self, year: Option<FiscalYear>) -> impl Iterator<Item = &MatchedSale> {
        self.sales
            .iter()
            .filter(move |s| year.is_none_or(|y| y.contains(s.transaction.date)))
    }
}

/// Working state of one lot during a security's matching pass
#[derive(Debug)]
struct LotState {
    id: LotId,
    remaining: Decimal,
}

/// Buys and sells of a single security, oldest first
#[derive(Debug, Default)]
struct SecurityBook<'a> {
    buys: Vec<&'a NormalizedTransaction>,
    sells: Vec<&'a NormalizedTransaction>,
}

/// Match every sale against prior purchases, first in first out.
///
/// Dividends in the input are ignored. Transactions are ordered by date with
/// ties broken by ingestion id, so the caller's order only matters within a day.
pub fn match_lots(transactions: &[NormalizedTransaction]) -> MatchReport {
    let mut ordered: Vec<&NormalizedTransaction> =
        transactions.iter().filter(|t| t.kind.is_trade()).collect();
    ordered.sort_by_key(|t| (t.date, t.id));

    let mut books: BTreeMap<&str, SecurityBook> = BTreeMap::new();
    for tx in ordered {
        let book = books.entry(tx.security.as_str()).or_default();
        match tx.kind {
            TransactionKind::Buy => book.buys.push(tx),
            TransactionKind::Sell => book.sells.push(tx),
            TransactionKind::Dividend => {}
        }
    }

    let mut report = MatchReport::default();
    for (security, book) in books {
        log::debug!(
            "Matching {}: {} buys, {} sells",
            security,
            book.buys.len(),
            book.sells.len()
        );
        match_security(book, &mut report);
    }

    report
        .sales
        .sort_by_key(|s| (s.transaction.date, s.transaction.id));

    for sale in &report.sales {
        if !sale.is_fully_matched() {
            let warning = Warning::UnmatchedSale {
                date: sale.transaction.date,
                security: sale.transaction.security.clone(),
                shortfall: sale.shortfall,
            };
            log::warn!("{}", warning);
            report.warnings.push(warning);
        }
    }

    report
}

fn match_security(book: SecurityBook, report: &mut MatchReport) {
    let first_id = report.lots.len();
    let mut ledger: Vec<LotState> = book
        .buys
        .iter()
        .enumerate()
        .map(|(i, buy)| LotState {
            id: first_id + i,
            remaining: buy.shares(),
        })
        .collect();

    for sell in book.sells {
        let mut needed = sell.shares();
        let mut allocations = Vec::new();

        for state in ledger.iter_mut() {
            let buy = book.buys[state.id - first_id];
            if buy.date > sell.date || needed.is_zero() {
                break;
            }
            if state.remaining.is_zero() {
                continue;
            }
            let taken = state.remaining.min(needed);
            let cost = buy.local_amount * taken / buy.shares();
            state.remaining -= taken;
            needed -= taken;
            log::debug!(
                "{} SELL {}: {} shares from lot {} ({}) cost={}, lot remaining={}",
                sell.security,
                sell.date,
                taken,
                state.id,
                buy.date,
                cost,
                state.remaining
            );
            allocations.push(SaleAllocation {
                lot: state.id,
                shares: taken,
                cost,
            });
        }

        let cost_basis: Decimal = allocations.iter().map(|a| a.cost).sum();
        report.sales.push(MatchedSale {
            transaction: sell.clone(),
            allocations,
            cost_basis,
            realized_gain: sell.local_amount - cost_basis,
            shortfall: needed,
        });
    }

    report
        .lots
        .extend(book.buys.iter().zip(ledger).map(|(buy, state)| BuyLot {
            transaction: (*buy).clone(),
            remaining_shares: state.remaining,
        }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(
        id: usize,
        kind: TransactionKind,
        date: &str,
        security: &str,
        shares: Decimal,
        local: Decimal,
    ) -> NormalizedTransaction {
        NormalizedTransaction {
            id,
            kind,
            security: security.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            raw_shares: Some(shares),
            usd_amount: local,
            rate: Decimal::ONE,
            split_multiplier: Decimal::ONE,
            local_amount: local,
            adjusted_shares: Some(shares),
            source_line: String::new(),
        }
    }

    fn buy(id: usize, date: &str, shares: Decimal, local: Decimal) -> NormalizedTransaction {
        tx(id, TransactionKind::Buy, date, "AAPL", shares, local)
    }

    fn sell(id: usize, date: &str, shares: Decimal, local: Decimal) -> NormalizedTransaction {
        tx(id, TransactionKind::Sell, date, "AAPL", shares, local)
    }

    #[test]
    fn fifo_across_two_lots() {
        let report = match_lots(&[
            buy(0, "2021-01-01", dec!(10), dec!(100)),
            buy(1, "2021-01-02", dec!(10), dec!(140)),
            sell(2, "2021-01-03", dec!(15), dec!(300)),
        ]);

        assert_eq!(report.sales.len(), 1);
        let sale = &report.sales[0];
        assert_eq!(sale.cost_basis, dec!(170));
        assert_eq!(sale.realized_gain, dec!(130));
        assert!(sale.is_fully_matched());
        assert!(report.warnings.is_empty());

        assert_eq!(
            sale.allocations,
            vec![
                SaleAllocation { lot: 0, shares: dec!(10), cost: dec!(100) },
                SaleAllocation { lot: 1, shares: dec!(5), cost: dec!(70) },
            ]
        );
        assert_eq!(report.lot(0).remaining_shares, Decimal::ZERO);
        assert_eq!(report.lot(1).remaining_shares, dec!(5));
    }

    #[test]
    fn partial_consumption_sums_to_lot_total() {
        let report = match_lots(&[
            buy(0, "2021-01-01", dec!(3), dec!(100.01)),
            sell(1, "2021-02-01", dec!(1), dec!(40)),
            sell(2, "2021-03-01", dec!(2), dec!(90)),
        ]);

        let total: Decimal = report.sales.iter().map(|s| s.cost_basis).sum();
        assert!((total - dec!(100.01)).abs() < dec!(0.000001));
        assert_eq!(report.lot(0).remaining_shares, Decimal::ZERO);
    }

    #[test]
    fn later_purchases_are_not_used() {
        let report = match_lots(&[
            buy(0, "2021-01-01", dec!(5), dec!(50)),
            sell(1, "2021-02-01", dec!(8), dec!(120)),
            buy(2, "2021-03-01", dec!(10), dec!(200)),
        ]);

        let sale = &report.sales[0];
        assert_eq!(sale.cost_basis, dec!(50));
        assert_eq!(sale.shortfall, dec!(3));
        assert_eq!(report.lot(1).remaining_shares, dec!(10));
    }

    #[test]
    fn same_day_purchase_is_eligible() {
        // Sell ingested before the buy, but the buy is still on or before the sale date
        let report = match_lots(&[
            sell(0, "2021-01-01", dec!(1), dec!(20)),
            buy(1, "2021-01-01", dec!(1), dec!(15)),
        ]);
        assert_eq!(report.sales[0].cost_basis, dec!(15));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn sale_without_purchases_warns() {
        let report = match_lots(&[sell(0, "2021-05-01", dec!(2), dec!(50))]);

        let sale = &report.sales[0];
        assert!(sale.allocations.is_empty());
        assert_eq!(sale.cost_basis, Decimal::ZERO);
        assert_eq!(sale.realized_gain, dec!(50));
        assert_eq!(
            report.warnings,
            vec![Warning::UnmatchedSale {
                date: NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
                security: "AAPL".to_string(),
                shortfall: dec!(2),
            }]
        );
    }

    #[test]
    fn oversold_uses_partial_matches() {
        let report = match_lots(&[
            buy(0, "2021-01-01", dec!(2), dec!(30)),
            sell(1, "2021-02-01", dec!(5), dec!(100)),
        ]);
        let sale = &report.sales[0];
        assert_eq!(sale.cost_basis, dec!(30));
        assert_eq!(sale.realized_gain, dec!(70));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn tiny_residual_is_tolerated() {
        let report = match_lots(&[
            buy(0, "2021-01-01", dec!(0.99999999), dec!(10)),
            sell(1, "2021-02-01", dec!(1), dec!(12)),
        ]);
        assert!(report.sales[0].is_fully_matched());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn securities_are_matched_independently() {
        let report = match_lots(&[
            buy(0, "2021-01-01", dec!(10), dec!(100)),
            tx(1, TransactionKind::Buy, "2021-01-01", "TSLA", dec!(1), dec!(700)),
            tx(2, TransactionKind::Sell, "2021-02-01", "TSLA", dec!(1), dec!(900)),
            sell(3, "2021-02-02", dec!(5), dec!(80)),
        ]);

        assert_eq!(report.sales.len(), 2);
        let tsla = &report.sales[0];
        assert_eq!(tsla.transaction.security, "TSLA");
        assert_eq!(tsla.cost_basis, dec!(700));
        let aapl = &report.sales[1];
        assert_eq!(aapl.cost_basis, dec!(50));
        assert_eq!(report.lot(aapl.allocations[0].lot).transaction.security, "AAPL");
        assert_eq!(report.lot(tsla.allocations[0].lot).transaction.security, "TSLA");
    }

    #[test]
    fn identical_dates_keep_ingestion_order() {
        let report = match_lots(&[
            buy(0, "2021-01-01", dec!(1), dec!(10)),
            buy(1, "2021-01-01", dec!(1), dec!(20)),
            sell(2, "2021-01-02", dec!(1), dec!(30)),
        ]);
        assert_eq!(report.sales[0].cost_basis, dec!(10));
        assert_eq!(report.sales[0].allocations[0].lot, 0);
    }

    #[test]
    fn consumed_lots_are_skipped() {
        let report = match_lots(&[
            buy(0, "2021-01-01", dec!(2), dec!(20)),
            buy(1, "2021-01-02", dec!(2), dec!(40)),
            sell(2, "2021-01-03", dec!(2), dec!(50)),
            sell(3, "2021-01-04", dec!(1), dec!(30)),
        ]);
        assert_eq!(report.sales[0].cost_basis, dec!(20));
        assert_eq!(report.sales[1].cost_basis, dec!(20));
        assert_eq!(report.sales[1].allocations[0].lot, 1);
    }

    #[test]
    fn dividends_do_not_form_lots() {
        let dividend = NormalizedTransaction {
            kind: TransactionKind::Dividend,
            adjusted_shares: None,
            raw_shares: None,
            ..buy(0, "2021-01-01", dec!(0), dec!(5))
        };
        let report = match_lots(&[dividend, sell(1, "2021-02-01", dec!(1), dec!(10))]);
        assert!(report.lots.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let input = vec![
            tx(0, TransactionKind::Buy, "2021-01-01", "TSLA", dec!(3), dec!(100)),
            buy(1, "2021-01-01", dec!(3), dec!(100)),
            tx(2, TransactionKind::Sell, "2021-03-01", "TSLA", dec!(2), dec!(90)),
            sell(3, "2021-03-01", dec!(2), dec!(80)),
        ];
        let first = match_lots(&input);
        let second = match_lots(&input);
        let ids = |r: &MatchReport| -> Vec<(usize, Decimal)> {
            r.sales.iter().map(|s| (s.transaction.id, s.cost_basis)).collect()
        };
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first)[0].0, 2);
    }
}
