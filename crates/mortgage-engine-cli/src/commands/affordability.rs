use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::affordability::{max_affordable_price_with_rules, AffordabilityInput};
use mortgage_engine_core::lending_rules::LendingAssumptions;

use crate::input;

/// Arguments for the maximum purchase price solve
#[derive(Args)]
pub struct AffordabilityArgs {
    /// Gross annual household income
    #[arg(long, value_parser = super::amount)]
    pub income: Option<Decimal>,

    /// Other monthly debt payments (cars, cards, student loans)
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub debts: Decimal,

    /// Cash available for the down payment
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub down_payment: Decimal,

    /// Back-end DTI limit in percent
    #[arg(long, default_value = "36", value_parser = super::percent)]
    pub dti: Decimal,

    /// Annual interest rate in percent
    #[arg(long, value_parser = super::percent)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, default_value = "30")]
    pub years: u32,

    /// Annual property tax in percent of price
    #[arg(long, default_value = "1.15", value_parser = super::percent)]
    pub tax_rate: Decimal,

    /// Annual homeowners insurance in percent of price
    #[arg(long, default_value = "0.35", value_parser = super::percent)]
    pub insurance_rate: Decimal,

    /// Monthly HOA dues
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub hoa: Decimal,

    /// Annual PMI in percent of the loan
    #[arg(long, default_value = "0.5", value_parser = super::percent)]
    pub pmi_rate: Decimal,

    /// Two-letter state code, used to classify the loan for underwriting checks
    #[arg(long)]
    pub state: Option<String>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_affordability(
    args: AffordabilityArgs,
    assumptions: &LendingAssumptions,
) -> Result<Value, Box<dyn std::error::Error>> {
    let aff_input: AffordabilityInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => AffordabilityInput {
            annual_income: args.income.ok_or("--income is required (or provide --input)")?,
            monthly_debts: args.debts,
            down_payment: args.down_payment,
            dti_limit_percent: args.dti,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
            term_years: args.years,
            property_tax_rate_percent: args.tax_rate,
            insurance_rate_percent: args.insurance_rate,
            monthly_hoa: args.hoa,
            pmi_rate_percent: args.pmi_rate,
        },
    };
    let result = max_affordable_price_with_rules(&aff_input, args.state.as_deref(), assumptions);
    Ok(serde_json::to_value(result)?)
}
