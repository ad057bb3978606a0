pub mod matching;
pub mod rates;
pub mod splits;
pub mod summary;
pub mod transaction;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use matching::{match_lots, BuyLot, MatchReport, MatchedSale};
pub use rates::{RateObservation, RateTable};
pub use splits::{SplitConfig, SplitTable};
pub use summary::{summarize, FiscalYear, SummaryOptions, TaxSummary, DEFAULT_TAX_RATE};
pub use transaction::{
    normalize_all, NormalizedTransaction, RateGapPolicy, RawTransaction, TransactionKind,
};
pub use warnings::Warning;
