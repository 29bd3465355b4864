use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::payoff::{simulate_payoff, PayoffInput};

use crate::input;

/// Arguments for an early payoff simulation
#[derive(Args)]
pub struct PayoffArgs {
    /// Current loan balance
    #[arg(long, value_parser = super::amount)]
    pub balance: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long, value_parser = super::percent)]
    pub rate: Option<Decimal>,

    /// Years left on the loan
    #[arg(long, default_value = "30")]
    pub years: u32,

    /// Extra principal every month
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub extra: Decimal,

    /// One-time principal payment made now
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub lump_sum: Decimal,

    /// Pay half the payment every two weeks
    #[arg(long)]
    pub bi_weekly: bool,

    /// Simulation start date, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_payoff(args: PayoffArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payoff_input: PayoffInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => PayoffInput {
            current_balance: args.balance.ok_or("--balance is required (or provide --input)")?,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
            remaining_years: args.years,
            monthly_extra: args.extra,
            one_time_lump_sum: args.lump_sum,
            bi_weekly_enabled: args.bi_weekly,
            as_of: args.as_of.unwrap_or_else(|| Local::now().date_naive()),
        },
    };
    let result = simulate_payoff(&payoff_input);
    Ok(serde_json::to_value(result)?)
}
