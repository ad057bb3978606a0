pub mod rates;
pub mod statement;

pub use rates::{read_rates, DEFAULT_RATE_COLUMN};
pub use statement::{ParsedStatement, StatementFormat, TextStatement};
