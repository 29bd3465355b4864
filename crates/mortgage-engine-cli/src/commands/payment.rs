use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::amortization::payment::analyze_payment;
use mortgage_engine_core::amortization::schedule::{analyze_schedule, Granularity, ScheduleInput};
use mortgage_engine_core::LoanTerms;

use crate::input;

/// Arguments for a monthly payment
#[derive(Args)]
pub struct PaymentArgs {
    /// Loan amount
    #[arg(long, value_parser = super::amount)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (e.g. 6.5)
    #[arg(long, value_parser = super::percent)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, default_value = "30")]
    pub years: u32,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for an amortisation schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Loan amount
    #[arg(long, value_parser = super::amount)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long, value_parser = super::percent)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, default_value = "30")]
    pub years: u32,

    /// Extra principal paid every month
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub extra: Decimal,

    /// Property value for equity figures (defaults to the principal)
    #[arg(long, value_parser = super::amount)]
    pub home_value: Option<Decimal>,

    /// First payment month, YYYY-MM-DD
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// One row per month instead of per year
    #[arg(long)]
    pub monthly: bool,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(terms) => terms,
        None => LoanTerms {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
            term_years: args.years,
        },
    };
    let result = analyze_payment(&terms);
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => ScheduleInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
            term_years: args.years,
            extra_monthly_payment: args.extra,
            home_value: args.home_value,
            start_date: args.start_date,
            granularity: if args.monthly {
                Granularity::Monthly
            } else {
                Granularity::Yearly
            },
        },
    };
    let result = analyze_schedule(&schedule_input);
    Ok(serde_json::to_value(result)?)
}
