use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::investor::{analyze_dscr, compare_non_qm_income, DscrInput, NonQmInput};
use mortgage_engine_core::market::{
    resolve_rate, LoanProduct, RateSheet, INVESTOR_RATE_PREMIUM, NATIONAL_BASE_RATE,
};

use crate::input;

/// Arguments for a debt service coverage test
#[derive(Args)]
pub struct DscrArgs {
    /// Purchase price of the rental
    #[arg(long, value_parser = super::amount)]
    pub price: Option<Decimal>,

    /// Expected monthly rent
    #[arg(long, value_parser = super::amount)]
    pub rent: Option<Decimal>,

    /// Loan-to-value in percent
    #[arg(long, default_value = "80", value_parser = super::percent)]
    pub ltv: Decimal,

    /// 30-year market rate in percent (defaults to the current sheet)
    #[arg(long, value_parser = super::percent)]
    pub base_rate: Option<Decimal>,

    /// Investment property premium over the market rate
    #[arg(long, value_parser = super::percent)]
    pub premium: Option<Decimal>,

    /// Loan term in years
    #[arg(long, default_value = "30")]
    pub years: u32,

    /// Annual taxes and insurance in percent of price
    #[arg(long, default_value = "1.25", value_parser = super::percent)]
    pub tax_insurance_rate: Decimal,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a bank-statement vs tax-return comparison
#[derive(Args)]
pub struct NonQmArgs {
    /// Annual income from tax returns
    #[arg(long, value_parser = super::amount)]
    pub tax_income: Option<Decimal>,

    /// Annual income from bank statement deposits
    #[arg(long, value_parser = super::amount)]
    pub bank_income: Option<Decimal>,

    /// 30-year market rate in percent (defaults to the current sheet)
    #[arg(long, value_parser = super::percent)]
    pub base_rate: Option<Decimal>,

    /// Months of bank statements (12 or 24)
    #[arg(long, default_value = "12")]
    pub statement_months: u32,

    /// DTI limit in percent
    #[arg(long, default_value = "50", value_parser = super::percent)]
    pub dti: Decimal,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

fn market_base_rate(user_override: Option<Decimal>) -> Decimal {
    resolve_rate(
        user_override,
        &RateSheet::default(),
        LoanProduct::Fixed30,
        NATIONAL_BASE_RATE,
    )
}

pub fn run_dscr(args: DscrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dscr_input: DscrInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => DscrInput {
            purchase_price: args.price.ok_or("--price is required (or provide --input)")?,
            monthly_rent: args.rent.ok_or("--rent is required (or provide --input)")?,
            ltv_percent: args.ltv,
            base_rate_percent: market_base_rate(args.base_rate),
            investor_premium_percent: args.premium.unwrap_or(INVESTOR_RATE_PREMIUM),
            term_years: args.years,
            tax_insurance_rate_percent: args.tax_insurance_rate,
        },
    };
    let result = analyze_dscr(&dscr_input);
    Ok(serde_json::to_value(result)?)
}

pub fn run_non_qm(args: NonQmArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let nqm_input: NonQmInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => NonQmInput {
            annual_tax_return_income: args
                .tax_income
                .ok_or("--tax-income is required (or provide --input)")?,
            annual_bank_statement_income: args
                .bank_income
                .ok_or("--bank-income is required (or provide --input)")?,
            base_rate_percent: market_base_rate(args.base_rate),
            statement_months: args.statement_months,
            dti_limit_percent: args.dti,
        },
    };
    let result = compare_non_qm_income(&nqm_input);
    Ok(serde_json::to_value(result)?)
}
