//! Validate command - surface data quality issues without computing tax

use super::InputArgs;
use crate::tax::Warning;
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput<'a> {
    issue_count: usize,
    issues: &'a [Warning],
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.load()?;
        let issues = &portfolio.warnings;

        if self.json {
            let output = ValidationOutput {
                issue_count: issues.len(),
                issues,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn print_text(issues: &[Warning]) {
    if issues.is_empty() {
        println!("No issues found");
        return;
    }

    println!();
    println!("VALIDATION ISSUES ({})", issues.len());
    println!();
    for issue in issues {
        println!("  [{}] {}", issue.kind(), issue);
    }
    println!();
}
