//! Schema command - print expected input formats

use crate::tax::SplitConfig;
use crate::input::DEFAULT_RATE_COLUMN;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Which input format to describe
    #[arg(value_enum, default_value = "splits")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the split configuration file
    Splits,
    /// Layout of the statement text export
    Statement,
    /// Layout of the exchange rate archive
    Rates,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::Splits => self.print_split_schema(),
            SchemaFormat::Statement => {
                print_lines("Statement Format", STATEMENT_LINES);
                Ok(())
            }
            SchemaFormat::Rates => {
                print_lines("Rate Archive Format", RATE_LINES);
                println!("Default rate column: {}", DEFAULT_RATE_COLUMN);
                Ok(())
            }
        }
    }

    fn print_split_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(SplitConfig);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}

fn print_lines(title: &str, lines: &[(&str, &str)]) {
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    println!();
    for (line, description) in lines {
        println!("{:40}  {}", line, description);
    }
    println!();
}

const STATEMENT_LINES: &[(&str, &str)] = &[
    ("2021", "Year header, applies to following days"),
    ("15 March", "Day header, applies to following transactions"),
    ("Buy AAPL 2.5 ... -$323.53", "Purchase: security, shares, dollar amount"),
    ("Sell AAPL 2 ... +$242.06", "Sale: security, shares, dollar amount"),
    ("Dividend AAPL +$0.82", "Dividend: security, dollar amount"),
    ("", "Newest entries first; other lines are ignored"),
];

const RATE_LINES: &[(&str, &str)] = &[
    ("data;nr tabeli;1USD", "Two header lines, skipped"),
    ("20210104;001/A/NBP/2021;3,7314", "yyyyMMdd date, rate with comma decimals"),
    ("", "A blank line ends the data"),
];
