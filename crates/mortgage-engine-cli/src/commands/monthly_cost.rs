use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::lending_rules::LendingAssumptions;
use mortgage_engine_core::market::{
    escrow_rates, is_valid_zip, resolve_rate, LoanProduct, LocationProvider, RateSheet,
    NATIONAL_BASE_RATE,
};
use mortgage_engine_core::monthly_cost::{monthly_cost, MonthlyCostInput};

use crate::{config, input};

/// Arguments for a full monthly payment breakdown
#[derive(Args)]
pub struct MonthlyCostArgs {
    /// Purchase price
    #[arg(long, value_parser = super::amount)]
    pub price: Option<Decimal>,

    /// Down payment in percent of price
    #[arg(long, default_value = "20", value_parser = super::percent)]
    pub down_percent: Decimal,

    /// Annual rate in percent (defaults to the sheet rate for the product)
    #[arg(long, value_parser = super::percent)]
    pub rate: Option<Decimal>,

    /// Loan product: 30Y, 20Y, 15Y, FHA, VA, Jumbo, "5/1 ARM"
    #[arg(long, default_value = "30Y")]
    pub product: LoanProduct,

    /// Borrower credit score
    #[arg(long)]
    pub credit_score: Option<u32>,

    /// Two-letter state code
    #[arg(long)]
    pub state: Option<String>,

    /// ZIP code, used with --locations for local escrow rates
    #[arg(long)]
    pub zip: Option<String>,

    /// JSON file of locations keyed by ZIP
    #[arg(long)]
    pub locations: Option<String>,

    /// Annual property tax in percent of price
    #[arg(long, value_parser = super::percent)]
    pub tax_rate: Option<Decimal>,

    /// Annual homeowners insurance in percent of price
    #[arg(long, value_parser = super::percent)]
    pub insurance_rate: Option<Decimal>,

    /// Monthly HOA dues
    #[arg(long, value_parser = super::amount)]
    pub hoa: Option<Decimal>,

    /// Report principal and interest only
    #[arg(long)]
    pub no_escrow: bool,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_monthly_cost(
    args: MonthlyCostArgs,
    assumptions: &LendingAssumptions,
) -> Result<Value, Box<dyn std::error::Error>> {
    let cost_input: MonthlyCostInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => from_flags(args, assumptions)?,
    };
    let result = monthly_cost(&cost_input, assumptions);
    Ok(serde_json::to_value(result)?)
}

fn from_flags(
    args: MonthlyCostArgs,
    assumptions: &LendingAssumptions,
) -> Result<MonthlyCostInput, Box<dyn std::error::Error>> {
    let price = args.price.ok_or("--price is required (or provide --input)")?;

    let zip = args.zip.as_deref().map(str::trim);
    if let Some(z) = zip {
        if !is_valid_zip(z) {
            return Err(format!("Invalid ZIP code '{}': expected 5 digits", z).into());
        }
    }
    let provider = config::load_locations(args.locations.as_deref())?;
    let (local_tax, local_insurance) = escrow_rates(&provider, zip, assumptions);
    let state_code = args
        .state
        .or_else(|| zip.and_then(|z| provider.lookup(z)).map(|l| l.state_code));

    Ok(MonthlyCostInput {
        home_price: price,
        down_payment_percent: args.down_percent,
        annual_rate_percent: resolve_rate(
            args.rate,
            &RateSheet::default(),
            args.product,
            NATIONAL_BASE_RATE,
        ),
        term_years: args.product.term_years(),
        product: Some(args.product),
        credit_score: args.credit_score,
        state_code,
        property_tax_rate_percent: Some(args.tax_rate.unwrap_or(local_tax)),
        insurance_rate_percent: Some(args.insurance_rate.unwrap_or(local_insurance)),
        monthly_hoa: args.hoa,
        include_escrow: !args.no_escrow,
    })
}
