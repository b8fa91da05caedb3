use std::path::Path;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use directories::ProjectDirs;
use tabled::{Table, Tabled, settings::Style};
use tracing::debug;

use topoff::{
    Action,
    codec,
    metrics::{self, DerivedLine},
    policy::Policy,
    portfolio::{Portfolio, TargetUnit},
    rebalance::{RebalanceLine, RebalanceRequest, RebalanceSummary, rebalance},
    validate::validate,
};

use crate::cli::Command;

mod cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    run(cli::Cli::parse())
}

fn run(opts: cli::Cli) -> anyhow::Result<()> {
    let policy = || load_policy(opts.config.as_deref());

    match opts.command {
        Command::Validate { portfolio } => {
            let portfolio = load_portfolio(&portfolio, opts.target_unit)?;
            validate(&portfolio, &policy()?)?;
            println!(
                "Portfolio OK: {} funds, ${:.2} total",
                portfolio.len(),
                portfolio.total_balance()
            );
        }
        Command::Metrics { portfolio, sort } => {
            let portfolio = load_portfolio(&portfolio, opts.target_unit)?;
            let lines = metrics::metrics(&portfolio, &policy()?);
            let lines = match sort {
                true => metrics::ranked_by_drift(&lines),
                false => lines,
            };
            print_metrics(&lines);
        }
        Command::Rebalance {
            portfolio,
            contribution,
            allow_selling,
            output,
            layout,
        } => {
            let portfolio = load_portfolio(&portfolio, opts.target_unit)?;
            let request = RebalanceRequest::parse(&contribution, allow_selling)?;
            let results = rebalance(&portfolio, &request, &policy()?)?;
            print_results(&portfolio, &request, &results);
            if let Some(path) = output {
                let text = codec::results_to_csv(&results, layout)?;
                write_output(&path, &text)?;
                println!();
                println!("Results written to {}", path.display());
            }
        }
        Command::Export { portfolio, output } => {
            let portfolio = load_portfolio(&portfolio, opts.target_unit)?;
            let text = codec::portfolio_to_csv(&portfolio)?;
            match output {
                Some(path) => write_output(&path, &text)?,
                None => print!("{text}"),
            }
        }
        Command::Completions { shell } => {
            let mut command = cli::Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        }
    }
    Ok(())
}

fn load_policy(config: Option<&Path>) -> anyhow::Result<Policy> {
    let policy = match config {
        Some(path) => Policy::load_from_file(path),
        None => match ProjectDirs::from("org", "topoff", "topoff") {
            Some(pdirs) => Policy::load_or_default(&pdirs.config_dir().join("policy.yml")),
            None => {
                debug!("no config dir available, using default policy");
                Ok(Policy::default())
            }
        },
    }?;
    debug!(?policy, "using policy");
    Ok(policy)
}

fn load_portfolio(path: &Path, unit: TargetUnit) -> anyhow::Result<Portfolio> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to open file {path:?}"))?;
    let portfolio = codec::parse_with(&text, unit)
        .with_context(|| format!("Failed to parse portfolio {path:?}"))?;
    debug!(funds = portfolio.len(), ?path, "loaded portfolio");
    Ok(portfolio)
}

fn write_output(path: &Path, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write file {path:?}"))
}

#[derive(Tabled)]
struct MetricsRow {
    #[tabled(rename = "Fund")]
    fund: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Drift")]
    drift: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn print_metrics(lines: &[DerivedLine]) {
    let rows: Vec<MetricsRow> = lines
        .iter()
        .map(|line| MetricsRow {
            fund: line.fund.clone(),
            balance: format!("${:.2}", line.balance),
            current: format!("{:.1}%", line.current_allocation_pct),
            target: format!("{:.1}%", line.target_allocation_pct),
            drift: format!("{:+.1}%", line.difference_pct),
            status: line.weighting.to_string(),
        })
        .collect();
    println!("Current Allocations");
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    let counts = metrics::partition(lines);
    println!(
        "{} balanced, {} overweight, {} underweight",
        counts.balanced, counts.overweight, counts.underweight
    );
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Fund")]
    fund: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Of contribution")]
    allocation: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Difference")]
    difference: String,
}

fn print_results(portfolio: &Portfolio, request: &RebalanceRequest, results: &[RebalanceLine]) {
    let rows: Vec<ResultRow> = results
        .iter()
        .map(|line| {
            let (action, amount) = match line.action() {
                Action::Buy(val) => ("Buy", val),
                Action::Sell(val) => ("Sell", val),
                Action::Nothing => ("-", 0.0),
            };
            ResultRow {
                fund: line.fund.clone(),
                action: action.to_string(),
                amount: format!("${amount:.2}"),
                allocation: format!("{:.2}%", line.allocation_of_contribution * 100.0),
                target: format!("{:.2}%", line.target_allocation * 100.0),
                difference: format!("{:+.2}%", line.difference_from_target * 100.0),
            }
        })
        .collect();
    println!("In order to reach your target allocations, the following actions are necessary.");
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    let summary =
        RebalanceSummary::from_lines(portfolio.total_balance(), request.contribution, results);
    println!("Current balance: ${:.2}", summary.current_total);
    println!("Adding:          ${:.2}", summary.contribution);
    println!("New balance:     ${:.2}", summary.projected_total);
    println!(
        "Bought ${:.2}, sold ${:.2} (turnover ${:.2})",
        summary.bought, summary.sold, summary.turnover
    );
}
