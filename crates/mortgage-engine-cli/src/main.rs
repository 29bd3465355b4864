mod commands;
mod config;
mod input;
mod logger;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::process;

use commands::affordability::AffordabilityArgs;
use commands::investor::{DscrArgs, NonQmArgs};
use commands::monthly_cost::MonthlyCostArgs;
use commands::payment::{PaymentArgs, ScheduleArgs};
use commands::payoff::PayoffArgs;
use commands::rates::RatesArgs;
use commands::refinance::RefinanceArgs;
use commands::rent_vs_buy::RentVsBuyArgs;
use commands::sweep::SweepArgs;
use output::OutputFormat;

/// Mortgage payment, affordability, payoff and DSCR calculations
#[derive(Parser)]
#[command(
    name = "mtg",
    version,
    about = "Mortgage calculations with decimal precision",
    long_about = "A CLI for mortgage calculations with decimal precision. Supports \
                  payments and amortisation schedules, maximum purchase price, \
                  early payoff, DSCR and non-QM qualification, refinance break-even, \
                  rent vs buy, and sweeps of any calculator across input ranges."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Lending assumptions file (YAML or JSON)
    #[arg(long, env = "MTG_ASSUMPTIONS", global = true)]
    assumptions: Option<String>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly principal and interest for a fixed-rate loan
    Payment(PaymentArgs),
    /// Amortisation schedule with optional extra principal
    Schedule(ScheduleArgs),
    /// Maximum home price for an income, debts and down payment
    Affordability(AffordabilityArgs),
    /// Early payoff with extra, lump-sum or bi-weekly payments
    Payoff(PayoffArgs),
    /// Debt service coverage for a rental property
    Dscr(DscrArgs),
    /// Bank-statement vs tax-return income qualification
    NonQm(NonQmArgs),
    /// Refinance savings and break-even
    Refinance(RefinanceArgs),
    /// Net cost of renting against buying over a holding period
    RentVsBuy(RentVsBuyArgs),
    /// Full monthly payment: P&I, taxes, insurance, HOA and PMI
    MonthlyCost(MonthlyCostArgs),
    /// Current rate sheet by product
    Rates(RatesArgs),
    /// Re-run a calculator across a range of input values
    Sweep(SweepArgs),
    /// Print version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    if let Commands::Version = cli.command {
        println!("mtg {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    match run(cli.command, cli.assumptions.as_deref()) {
        Ok(value) => {
            output::format_output(cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

fn run(
    command: Commands,
    assumptions_path: Option<&str>,
) -> Result<Value, Box<dyn std::error::Error>> {
    match command {
        Commands::Payment(args) => commands::payment::run_payment(args),
        Commands::Schedule(args) => commands::payment::run_schedule(args),
        Commands::Affordability(args) => {
            let assumptions = config::load_assumptions(assumptions_path)?;
            commands::affordability::run_affordability(args, &assumptions)
        }
        Commands::Payoff(args) => commands::payoff::run_payoff(args),
        Commands::Dscr(args) => commands::investor::run_dscr(args),
        Commands::NonQm(args) => commands::investor::run_non_qm(args),
        Commands::Refinance(args) => {
            let assumptions = config::load_assumptions(assumptions_path)?;
            commands::refinance::run_refinance(args, &assumptions)
        }
        Commands::RentVsBuy(args) => commands::rent_vs_buy::run_rent_vs_buy(args),
        Commands::MonthlyCost(args) => {
            let assumptions = config::load_assumptions(assumptions_path)?;
            commands::monthly_cost::run_monthly_cost(args, &assumptions)
        }
        Commands::Rates(args) => {
            let assumptions = config::load_assumptions(assumptions_path)?;
            commands::rates::run_rates(args, &assumptions)
        }
        Commands::Sweep(args) => {
            let assumptions = config::load_assumptions(assumptions_path)?;
            commands::sweep::run_sweep_command(args, &assumptions)
        }
        Commands::Version => Ok(Value::String(env!("CARGO_PKG_VERSION").to_string())),
    }
}
