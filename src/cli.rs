use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use topoff::{codec::ResultLayout, portfolio::TargetUnit};

#[derive(Parser, Debug)]
#[command(version, about = "Spread a new contribution across funds to reach target allocations")]
pub(crate) struct Cli {
    #[arg(short, long, global = true, help = "Policy file (defaults to policy.yml in the config dir)")]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = TargetUnit::Fraction,
        help = "Unit of the Target column in portfolio CSV files"
    )]
    pub target_unit: TargetUnit,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Check that a portfolio is ready to rebalance
    Validate {
        #[arg(help = "Portfolio CSV with Fund, Balance and Target columns")]
        portfolio: PathBuf,
    },
    /// Show current allocation and drift per fund
    Metrics {
        #[arg(help = "Portfolio CSV with Fund, Balance and Target columns")]
        portfolio: PathBuf,
        #[arg(short, long, help = "Sort funds from most overweight to most underweight")]
        sort: bool,
    },
    /// Compute how much of a contribution each fund should receive
    Rebalance {
        #[arg(help = "Portfolio CSV with Fund, Balance and Target columns")]
        portfolio: PathBuf,
        #[arg(
            short = 'd',
            long,
            allow_hyphen_values = true,
            help = "Dollars to add to the portfolio"
        )]
        contribution: String,
        #[arg(short, long, help = "Permit selling overweight funds")]
        allow_selling: bool,
        #[arg(short, long, help = "Write the results to this CSV file")]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ResultLayout::Signed, help = "Column layout of the exported results")]
        layout: ResultLayout,
    },
    /// Rewrite a portfolio as a normalized CSV with fractional targets
    Export {
        #[arg(help = "Portfolio CSV with Fund, Balance and Target columns")]
        portfolio: PathBuf,
        #[arg(short, long, help = "Write to this file instead of stdout")]
        output: Option<PathBuf>,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
