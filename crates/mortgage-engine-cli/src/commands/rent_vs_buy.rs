use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::rent_vs_buy::{compare_rent_vs_buy, RentVsBuyInput};

use crate::input;

/// Arguments for a rent vs buy comparison
#[derive(Args)]
pub struct RentVsBuyArgs {
    /// Current monthly rent
    #[arg(long, value_parser = super::amount)]
    pub rent: Option<Decimal>,

    /// Annual rent increase in percent
    #[arg(long, default_value = "3", value_parser = super::percent)]
    pub rent_inflation: Decimal,

    /// Annual return on invested savings in percent
    #[arg(long, default_value = "6", value_parser = super::percent)]
    pub investment_return: Decimal,

    /// Purchase price
    #[arg(long, value_parser = super::amount)]
    pub price: Option<Decimal>,

    /// Down payment
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub down_payment: Decimal,

    /// Mortgage rate in percent
    #[arg(long, value_parser = super::percent)]
    pub rate: Option<Decimal>,

    /// Annual home appreciation in percent
    #[arg(long, default_value = "3", value_parser = super::percent)]
    pub appreciation: Decimal,

    /// Years until the home is sold
    #[arg(long, default_value = "7")]
    pub years: u32,

    /// Monthly HOA dues
    #[arg(long, default_value = "0", value_parser = super::amount)]
    pub hoa: Decimal,

    /// Annual property tax in percent of value
    #[arg(long, default_value = "1.15", value_parser = super::percent)]
    pub tax_rate: Decimal,

    /// Annual homeowners insurance in percent of value
    #[arg(long, default_value = "0.35", value_parser = super::percent)]
    pub insurance_rate: Decimal,

    /// Annual maintenance in percent of value
    #[arg(long, default_value = "1", value_parser = super::percent)]
    pub maintenance_rate: Decimal,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_rent_vs_buy(args: RentVsBuyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rvb_input: RentVsBuyInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => RentVsBuyInput {
            monthly_rent: args.rent.ok_or("--rent is required (or provide --input)")?,
            rent_inflation_percent: args.rent_inflation,
            investment_return_percent: args.investment_return,
            home_price: args.price.ok_or("--price is required (or provide --input)")?,
            down_payment: args.down_payment,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
            appreciation_percent: args.appreciation,
            holding_years: args.years,
            monthly_hoa: args.hoa,
            property_tax_rate_percent: args.tax_rate,
            insurance_rate_percent: args.insurance_rate,
            maintenance_rate_percent: args.maintenance_rate,
        },
    };
    let result = compare_rent_vs_buy(&rvb_input);
    Ok(serde_json::to_value(result)?)
}
