use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

use mortgage_engine_core::lending_rules::LendingAssumptions;
use mortgage_engine_core::market::{
    escrow_rates, is_valid_zip, CreditTier, LoanProduct, Location, LocationProvider, RateSheet,
};
use mortgage_engine_core::with_metadata;

use crate::config;

/// Arguments for a market rate sheet
#[derive(Args)]
pub struct RatesArgs {
    /// ZIP code; a known ZIP prices off the local base rate
    #[arg(long)]
    pub zip: Option<String>,

    /// Credit tier: excellent, good, fair
    #[arg(long, default_value = "excellent")]
    pub credit: CreditTier,

    /// Loan-to-value in percent
    #[arg(long, default_value = "80", value_parser = super::percent)]
    pub ltv: Decimal,

    /// 30-year base rate to derive the sheet from
    #[arg(long, value_parser = super::percent)]
    pub base_rate: Option<Decimal>,

    /// JSON file of locations keyed by ZIP
    #[arg(long)]
    pub locations: Option<String>,
}

#[derive(Serialize)]
struct RatesOutput {
    rates: BTreeMap<LoanProduct, String>,
    lock_recommendation: &'static str,
    location: Option<Location>,
    property_tax_rate_percent: Decimal,
    insurance_rate_percent: Decimal,
}

pub fn run_rates(
    args: RatesArgs,
    assumptions: &LendingAssumptions,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let zip = args.zip.as_deref().map(str::trim);
    if let Some(z) = zip {
        if !is_valid_zip(z) {
            return Err(format!("Invalid ZIP code '{}': expected 5 digits", z).into());
        }
    }

    let adjustments = &assumptions.market_adjustments;
    let sheet = match args.base_rate {
        Some(base) => RateSheet::derive(base, args.credit, args.ltv, adjustments),
        None => RateSheet::for_location(zip, args.credit, args.ltv, adjustments),
    };
    let provider = config::load_locations(args.locations.as_deref())?;
    let (tax, insurance) = escrow_rates(&provider, zip, assumptions);

    let output = RatesOutput {
        lock_recommendation: sheet.lock_recommendation(),
        rates: sheet.rates,
        location: zip.and_then(|z| provider.lookup(z)),
        property_tax_rate_percent: tax,
        insurance_rate_percent: insurance,
    };

    let mut warnings = Vec::new();
    if zip.is_some() && output.location.is_none() && args.locations.is_some() {
        warnings.push("ZIP not found in locations; using national escrow rates".to_string());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let result = with_metadata(
        "Product spreads over a 30-year base with credit and LTV adjustments",
        &serde_json::json!({
            "zip": zip,
            "credit": args.credit,
            "ltv_percent": args.ltv,
            "base_rate_percent": args.base_rate,
        }),
        warnings,
        elapsed,
        output,
    );
    Ok(serde_json::to_value(result)?)
}
