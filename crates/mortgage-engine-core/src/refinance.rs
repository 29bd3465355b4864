use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::payment::{payment_for_months, term_months, MAX_TERM_YEARS};
use crate::sanitize::{InputGuard, MAX_MONEY};
use crate::types::{default_term_years, with_metadata, ComputationOutput, Money, Percent};

/// Cash-out refinances above this LTV are flagged.
pub const CASH_OUT_LTV_LIMIT: Percent = dec!(80);

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinanceInput {
    pub home_value: Money,
    pub current_balance: Money,
    pub current_rate_percent: Percent,
    /// Years left on the existing loan.
    pub years_remaining: u32,
    pub new_rate_percent: Percent,
    #[serde(default = "default_term_years")]
    pub new_term_years: u32,
    #[serde(default)]
    pub closing_costs: Money,
    /// Finance the closing costs into the new loan instead of paying them.
    #[serde(default = "default_roll_in")]
    pub roll_in_costs: bool,
    #[serde(default)]
    pub cash_out: Money,
}

fn default_roll_in() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefinanceOutput {
    pub current_payment: Money,
    pub new_loan_amount: Money,
    pub new_payment: Money,
    /// Negative when the new payment is higher.
    pub monthly_savings: Money,
    /// Months of savings needed to recover closing costs. `None` when the
    /// refinance never saves money monthly.
    pub breakeven_months: Option<u32>,
    pub year_one_savings: Money,
    pub lifetime_savings: Money,
    pub ltv_percent: Percent,
    pub exceeds_cash_out_ltv: bool,
    /// Cash out less any closing costs paid at the table.
    pub net_cash_to_borrower: Money,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Compare the existing loan with a rate/term or cash-out refinance.
pub fn analyze_refinance(input: &RefinanceInput) -> ComputationOutput<RefinanceOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let value = guard.bounded("home_value", input.home_value, Decimal::ONE, MAX_MONEY);
    let balance = guard.money("current_balance", input.current_balance);
    let current_rate = guard.percent("current_rate_percent", input.current_rate_percent);
    let new_rate = guard.percent("new_rate_percent", input.new_rate_percent);
    let costs = guard.money("closing_costs", input.closing_costs);
    let cash_out = guard.money("cash_out", input.cash_out);
    let years_remaining = input.years_remaining.min(MAX_TERM_YEARS);
    let mut new_term = guard.count_or("new_term_years", input.new_term_years, default_term_years());
    if new_term > MAX_TERM_YEARS {
        guard.warn(format!("new_term_years = {new_term} capped at {MAX_TERM_YEARS}"));
        new_term = MAX_TERM_YEARS;
    }

    let output = if balance.is_zero() || years_remaining == 0 {
        guard.warn("No current balance or no years remaining; nothing to refinance");
        RefinanceOutput::default()
    } else {
        let current_n = term_months(years_remaining);
        let current_payment = payment_for_months(balance, current_rate, current_n);

        let financed_costs = if input.roll_in_costs { costs } else { Decimal::ZERO };
        let upfront_costs = costs - financed_costs;
        let new_loan = balance + cash_out + financed_costs;
        let ltv = new_loan / value * dec!(100);

        let new_n = term_months(new_term);
        let new_payment = payment_for_months(new_loan, new_rate, new_n);
        let savings = current_payment - new_payment;

        let (breakeven_months, year_one_savings) = if savings > Decimal::ZERO {
            let months = if costs > Decimal::ZERO {
                months_to_recover(costs, savings)
            } else {
                0
            };
            (Some(months), savings * dec!(12) - costs)
        } else {
            guard.warn("New payment is not lower than the current payment");
            (None, Decimal::ZERO)
        };

        let current_lifetime = current_payment * Decimal::from(current_n);
        let new_lifetime = new_payment * Decimal::from(new_n) + upfront_costs - cash_out;

        let exceeds = cash_out > Decimal::ZERO && ltv > CASH_OUT_LTV_LIMIT;
        if exceeds {
            guard.warn(format!(
                "LTV {:.2}% exceeds the {CASH_OUT_LTV_LIMIT}% cash-out limit",
                ltv
            ));
        }

        RefinanceOutput {
            current_payment: current_payment.round_dp(2),
            new_loan_amount: new_loan,
            new_payment: new_payment.round_dp(2),
            monthly_savings: savings.round_dp(2),
            breakeven_months,
            year_one_savings: year_one_savings.round_dp(2),
            lifetime_savings: (current_lifetime - new_lifetime).round_dp(2),
            ltv_percent: ltv.round_dp(2),
            exceeds_cash_out_ltv: exceeds,
            net_cash_to_borrower: cash_out - upfront_costs,
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Refinance break-even and lifetime cost comparison",
        input,
        guard.into_warnings(),
        elapsed,
        output,
    )
}

/// ceil(costs / savings) for positive savings.
fn months_to_recover(costs: Money, savings: Money) -> u32 {
    (costs / savings).ceil().to_u32().unwrap_or(u32::MAX)
}
