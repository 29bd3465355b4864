//! Rent vs buy over a holding period.
//!
//! The buyer pays P&I, escrow, maintenance, HOA and PMI; the renter pays rent
//! plus renter's insurance and invests what the buyer spent up front, then
//! each month's cost difference. At each year end the home is marked to
//! market and sold on paper, net of selling costs, to compare the two paths.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::payment::{monthly_payment, monthly_rate, payment_split};
use crate::lending_rules::{ltv_percent, PMI_LTV_THRESHOLD_PERCENT};
use crate::sanitize::InputGuard;
use crate::types::{with_metadata, ComputationOutput, Money, Percent};

/// The purchase is always financed over 30 years.
const LOAN_TERM_YEARS: u32 = 30;

pub const MAX_HOLDING_YEARS: u32 = 30;

const CLOSING_COST_SHARE: Decimal = dec!(0.03);
const SELLING_COST_SHARE: Decimal = dec!(0.06);
const RENTERS_INSURANCE_MONTHLY: Money = dec!(15);
/// Annual PMI as a fraction of the original loan.
const PMI_ANNUAL_FACTOR: Decimal = dec!(0.005);

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentVsBuyInput {
    pub monthly_rent: Money,
    #[serde(default = "default_three")]
    pub rent_inflation_percent: Percent,
    /// Annual return on the renter's invested savings.
    #[serde(default = "default_investment_return")]
    pub investment_return_percent: Percent,
    pub home_price: Money,
    #[serde(default)]
    pub down_payment: Money,
    pub annual_rate_percent: Percent,
    #[serde(default = "default_three")]
    pub appreciation_percent: Percent,
    #[serde(default = "default_holding_years")]
    pub holding_years: u32,
    #[serde(default)]
    pub monthly_hoa: Money,
    #[serde(default = "default_tax_rate")]
    pub property_tax_rate_percent: Percent,
    #[serde(default = "default_insurance_rate")]
    pub insurance_rate_percent: Percent,
    /// Annual upkeep as a percent of current value.
    #[serde(default = "default_maintenance_rate")]
    pub maintenance_rate_percent: Percent,
}

fn default_three() -> Percent {
    dec!(3)
}

fn default_investment_return() -> Percent {
    dec!(6)
}

fn default_holding_years() -> u32 {
    7
}

fn default_tax_rate() -> Percent {
    dec!(1.15)
}

fn default_insurance_rate() -> Percent {
    dec!(0.35)
}

fn default_maintenance_rate() -> Percent {
    dec!(1.0)
}

/// Cumulative net cost of each path at a year end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentVsBuyYear {
    pub year: u32,
    pub net_rent_cost: Money,
    pub net_buy_cost: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentVsBuyOutput {
    pub upfront_buy_cost: Money,
    pub monthly_principal_and_interest: Money,
    pub total_rent_paid: Money,
    /// Everything spent on the home less the equity recovered on sale.
    pub net_buy_cost: Money,
    /// Rent paid less the renter's investment gains.
    pub net_rent_cost: Money,
    /// Growth of the renter's portfolio beyond the original stake.
    pub investment_gains: Money,
    pub renter_portfolio: Money,
    pub equity_recovered: Money,
    pub net_benefit: Money,
    pub is_buying_better: bool,
    /// First year end at which buying is cheaper.
    pub breakeven_year: Option<u32>,
    pub yearly: Vec<RentVsBuyYear>,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub fn compare_rent_vs_buy(input: &RentVsBuyInput) -> ComputationOutput<RentVsBuyOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let price = guard.money("home_price", input.home_price);
    let down = guard.money("down_payment", input.down_payment);
    let rent = guard.money("monthly_rent", input.monthly_rent);
    let rate = guard.percent("annual_rate_percent", input.annual_rate_percent);
    let rent_inflation = guard.percent("rent_inflation_percent", input.rent_inflation_percent);
    let investment_return =
        guard.percent("investment_return_percent", input.investment_return_percent);
    let appreciation = guard.percent("appreciation_percent", input.appreciation_percent);
    let hoa = guard.money("monthly_hoa", input.monthly_hoa);
    let tax_rate = guard.percent("property_tax_rate_percent", input.property_tax_rate_percent);
    let ins_rate = guard.percent("insurance_rate_percent", input.insurance_rate_percent);
    let maint_rate = guard.percent("maintenance_rate_percent", input.maintenance_rate_percent);
    let holding_years = input.holding_years.clamp(1, MAX_HOLDING_YEARS);
    if holding_years != input.holding_years {
        guard.warn(format!(
            "holding_years = {} coerced to {holding_years}",
            input.holding_years
        ));
    }

    let loan = (price - down).max(Decimal::ZERO);
    let r = monthly_rate(rate);
    let pi = monthly_payment(loan, rate, LOAN_TERM_YEARS);
    let pmi_when_due = loan * PMI_ANNUAL_FACTOR / dec!(12);
    let escrow_rate = (tax_rate + ins_rate + maint_rate) / dec!(1200);
    let monthly_growth = investment_return / dec!(1200);

    let upfront = down + price * CLOSING_COST_SHARE;
    let mut total_buy_outflow = upfront;
    let mut total_rent_outflow = Decimal::ZERO;
    let mut home_value = price;
    let mut balance = loan;
    let mut current_rent = rent;
    let mut portfolio = upfront;
    let mut breakeven_year = None;
    let mut yearly = vec![RentVsBuyYear {
        year: 0,
        net_rent_cost: Decimal::ZERO,
        net_buy_cost: upfront,
    }];

    let (mut net_buy_cost, mut net_rent_cost) = (upfront, Decimal::ZERO);
    let (mut equity_recovered, mut investment_gains) = (Decimal::ZERO, Decimal::ZERO);

    for month in 1..=holding_years * 12 {
        let pmi = if ltv_percent(balance, home_value) > PMI_LTV_THRESHOLD_PERCENT {
            pmi_when_due
        } else {
            Decimal::ZERO
        };
        let buy_cost = pi + home_value * escrow_rate + hoa + pmi;
        total_buy_outflow += buy_cost;

        if month > 1 && month % 12 == 1 {
            current_rent *= Decimal::ONE + rent_inflation / dec!(100);
        }
        let rent_cost = current_rent + RENTERS_INSURANCE_MONTHLY;
        total_rent_outflow += rent_cost;

        portfolio = portfolio * (Decimal::ONE + monthly_growth) + (buy_cost - rent_cost);
        balance -= payment_split(balance, r, pi).principal;

        if month % 12 == 0 {
            home_value *= Decimal::ONE + appreciation / dec!(100);
            let year = month / 12;

            equity_recovered = home_value * (Decimal::ONE - SELLING_COST_SHARE) - balance;
            net_buy_cost = total_buy_outflow - equity_recovered;
            investment_gains = (portfolio - upfront).max(Decimal::ZERO);
            net_rent_cost = total_rent_outflow - investment_gains;

            if breakeven_year.is_none() && net_buy_cost < net_rent_cost {
                breakeven_year = Some(year);
            }
            yearly.push(RentVsBuyYear {
                year,
                net_rent_cost: net_rent_cost.round_dp(0),
                net_buy_cost: net_buy_cost.round_dp(0),
            });
        }
    }

    let output = RentVsBuyOutput {
        upfront_buy_cost: upfront.round_dp(0),
        monthly_principal_and_interest: pi.round_dp(2),
        total_rent_paid: total_rent_outflow.round_dp(0),
        net_buy_cost: net_buy_cost.round_dp(0),
        net_rent_cost: net_rent_cost.round_dp(0),
        investment_gains: investment_gains.round_dp(0),
        renter_portfolio: portfolio.round_dp(0),
        equity_recovered: equity_recovered.round_dp(0),
        net_benefit: (net_rent_cost - net_buy_cost).abs().round_dp(0),
        is_buying_better: net_buy_cost < net_rent_cost,
        breakeven_year,
        yearly,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Monthly rent vs buy simulation with invested opportunity cost",
        input,
        guard.into_warnings(),
        elapsed,
        output,
    )
}
