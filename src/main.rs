mod cmd;
mod input;
mod tax;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "stocktax",
    version,
    about = "Calculate capital gains tax on stock sales from a brokerage statement"
)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Realized gains and tax due for a fiscal year
    Summary(cmd::summary::SummaryCommand),
    /// Every sale with the purchase lots that funded it
    Sales(cmd::sales::SalesCommand),
    /// Purchase lots and the shares still held from each
    Lots(cmd::lots::LotsCommand),
    /// List parse failures, rate gaps and unmatched sales
    Validate(cmd::validate::ValidateCommand),
    /// Print expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    match opts.command {
        Command::Summary(summary) => summary.exec(),
        Command::Sales(sales) => sales.exec(),
        Command::Lots(lots) => lots.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
