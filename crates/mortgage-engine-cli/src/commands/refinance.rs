use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::lending_rules::LendingAssumptions;
use mortgage_engine_core::market::{
    refinance_rate, resolve_rate, LoanProduct, RateSheet, NATIONAL_BASE_RATE,
};
use mortgage_engine_core::refinance::{analyze_refinance, RefinanceInput};

use crate::input;

/// Arguments for a refinance break-even analysis
#[derive(Args)]
pub struct RefinanceArgs {
    /// Current home value
    #[arg(long, value_parser = super::amount)]
    pub home_value: Option<Decimal>,

    /// Balance on the existing loan
    #[arg(long, value_parser = super::amount)]
    pub balance: Option<Decimal>,

    /// Rate on the existing loan in percent
    #[arg(long, value_parser = super::percent)]
    pub current_rate: Option<Decimal>,

    /// Years left on the existing loan
    #[arg(long)]
    pub years_remaining: Option<u32>,

    /// Rate on the new loan in percent (defaults to the sheet rate plus the
    /// refinance surcharge)
    #[arg(long, value_parser = super::percent)]
    pub new_rate: Option<Decimal>,

    /// Term of the new loan in years
    #[arg(long, default_value = "30")]
    pub new_term: u32,

    /// Closing costs for the new loan
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub closing_costs: Decimal,

    /// Pay closing costs in cash instead of financing them
    #[arg(long)]
    pub pay_costs: bool,

    /// Cash taken out at closing
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub cash_out: Decimal,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_refinance(
    args: RefinanceArgs,
    assumptions: &LendingAssumptions,
) -> Result<Value, Box<dyn std::error::Error>> {
    let refi_input: RefinanceInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => RefinanceInput {
            home_value: args
                .home_value
                .ok_or("--home-value is required (or provide --input)")?,
            current_balance: args.balance.ok_or("--balance is required (or provide --input)")?,
            current_rate_percent: args
                .current_rate
                .ok_or("--current-rate is required (or provide --input)")?,
            years_remaining: args
                .years_remaining
                .ok_or("--years-remaining is required (or provide --input)")?,
            new_rate_percent: args.new_rate.unwrap_or_else(|| {
                let product = match args.new_term {
                    15 => LoanProduct::Fixed15,
                    20 => LoanProduct::Fixed20,
                    _ => LoanProduct::Fixed30,
                };
                let purchase =
                    resolve_rate(None, &RateSheet::default(), product, NATIONAL_BASE_RATE);
                refinance_rate(purchase, &assumptions.market_adjustments)
            }),
            new_term_years: args.new_term,
            closing_costs: args.closing_costs,
            roll_in_costs: !args.pay_costs,
            cash_out: args.cash_out,
        },
    };
    let result = analyze_refinance(&refi_input);
    Ok(serde_json::to_value(result)?)
}
