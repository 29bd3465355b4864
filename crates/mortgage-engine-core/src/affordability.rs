use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::payment::{annuity_factor, monthly_rate, term_months, MAX_TERM_YEARS};
use crate::lending_rules::{loan_category, ltv_percent, LendingAssumptions};
use crate::sanitize::{non_negative, InputGuard};
use crate::types::{
    default_term_years, with_metadata, ComputationOutput, Money, MonthlyBreakdown, Percent,
};

/// Down payment share at or above which no PMI is charged.
const PMI_FREE_DOWN_SHARE: Decimal = dec!(0.20);

/// Closing costs as a share of the purchase price.
const CLOSING_COST_SHARE: Decimal = dec!(0.03);

/// Monthly carrying cost used for reserves, as a share of the price.
const RESERVE_MONTHLY_SHARE: Decimal = dec!(0.007);
const RESERVE_MONTHS: Decimal = dec!(3);

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Borrower profile and loan assumptions for a maximum-price solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityInput {
    pub annual_income: Money,
    #[serde(default)]
    pub monthly_debts: Money,
    #[serde(default)]
    pub down_payment: Money,
    /// Back-end debt-to-income ceiling.
    #[serde(default = "default_dti")]
    pub dti_limit_percent: Percent,
    pub annual_rate_percent: Percent,
    #[serde(default = "default_term_years")]
    pub term_years: u32,
    #[serde(default = "default_tax_rate")]
    pub property_tax_rate_percent: Percent,
    #[serde(default = "default_insurance_rate")]
    pub insurance_rate_percent: Percent,
    #[serde(default)]
    pub monthly_hoa: Money,
    /// Annual PMI as a percent of the loan.
    #[serde(default = "default_pmi_rate")]
    pub pmi_rate_percent: Percent,
}

fn default_dti() -> Percent {
    dec!(36)
}

fn default_tax_rate() -> Percent {
    dec!(1.15)
}

fn default_insurance_rate() -> Percent {
    dec!(0.35)
}

fn default_pmi_rate() -> Percent {
    dec!(0.50)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashToClose {
    pub down_payment: Money,
    pub closing_costs: Money,
    pub reserves: Money,
    pub total: Money,
}

/// Headline figures are floored to whole dollars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityOutput {
    pub max_home_price: Money,
    pub loan_amount: Money,
    pub down_payment_percent: Percent,
    pub monthly_gross_income: Money,
    pub max_total_monthly_debt: Money,
    pub max_monthly_housing_payment: Money,
    pub remaining_monthly_income: Money,
    pub pmi_applied: bool,
    pub monthly_breakdown: MonthlyBreakdown,
    pub cash_to_close: CashToClose,
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Price whose monthly cost (P&I on `price - down`, escrow on `price`, HOA)
/// equals `housing_budget`. `loan_factor` is the monthly cost per dollar
/// borrowed, `escrow_factor` the monthly cost per dollar of value.
///
/// Solves `budget = (price - down) * loan_factor + price * escrow_factor + hoa`.
/// Returns zero when nothing is left after HOA or the denominator is zero.
/// A solution at or below the down payment carries no loan, so escrow alone
/// bounds the price there.
pub fn price_for_housing_budget(
    housing_budget: Money,
    monthly_hoa: Money,
    down_payment: Money,
    loan_factor: Decimal,
    escrow_factor: Decimal,
) -> Money {
    let available = housing_budget - monthly_hoa;
    let denom = loan_factor + escrow_factor;
    if available <= Decimal::ZERO || denom <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let price = (available + down_payment * loan_factor) / denom;
    if price > down_payment {
        return price;
    }
    if escrow_factor > Decimal::ZERO {
        down_payment.min(available / escrow_factor)
    } else {
        down_payment
    }
}

/// Maximum purchase price a borrower qualifies for under a DTI ceiling.
///
/// Solves the price without PMI first. If the down payment is then under 20%
/// of that price, PMI is added to the loan factor and the price is solved once
/// more. A PMI price below the 20%-down price (five times the down payment) is
/// pinned to the 20%-down price, which is affordable without PMI.
pub fn max_affordable_price(input: &AffordabilityInput) -> ComputationOutput<AffordabilityOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let income = guard.money("annual_income", input.annual_income);
    let debts = guard.money("monthly_debts", input.monthly_debts);
    let down = guard.money("down_payment", input.down_payment);
    let dti = guard.percent("dti_limit_percent", input.dti_limit_percent);
    let rate = guard.percent("annual_rate_percent", input.annual_rate_percent);
    let tax_rate = guard.percent("property_tax_rate_percent", input.property_tax_rate_percent);
    let ins_rate = guard.percent("insurance_rate_percent", input.insurance_rate_percent);
    let hoa = guard.money("monthly_hoa", input.monthly_hoa);
    let pmi_rate = guard.percent("pmi_rate_percent", input.pmi_rate_percent);
    let mut years = guard.count_or("term_years", input.term_years, default_term_years());
    if years > MAX_TERM_YEARS {
        guard.warn(format!("term_years = {years} capped at {MAX_TERM_YEARS}"));
        years = MAX_TERM_YEARS;
    }

    let gross_monthly = income / dec!(12);
    let max_total_debt = income * dti / dec!(1200);
    let housing_budget = non_negative(max_total_debt - debts);

    let loan_factor = annuity_factor(monthly_rate(rate), term_months(years));
    let escrow_factor = (tax_rate + ins_rate) / dec!(1200);

    let (price, pmi_applied) = if dti.is_zero() {
        guard.warn("dti_limit_percent is 0; no housing payment qualifies");
        (Decimal::ZERO, false)
    } else {
        let base = price_for_housing_budget(housing_budget, hoa, down, loan_factor, escrow_factor);
        if down < base * PMI_FREE_DOWN_SHARE {
            let pmi_factor = pmi_rate / dec!(1200);
            let with_pmi = price_for_housing_budget(
                housing_budget,
                hoa,
                down,
                loan_factor + pmi_factor,
                escrow_factor,
            );
            let twenty_down_price = down / PMI_FREE_DOWN_SHARE;
            if with_pmi < twenty_down_price {
                (twenty_down_price, false)
            } else {
                (with_pmi, true)
            }
        } else {
            (base, false)
        }
    };

    let price = non_negative(price).floor();
    let loan = non_negative(price - down);
    let pmi = if pmi_applied {
        loan * pmi_rate / dec!(1200)
    } else {
        Decimal::ZERO
    };
    let breakdown = MonthlyBreakdown::new(
        loan * loan_factor,
        price * tax_rate / dec!(1200),
        price * ins_rate / dec!(1200),
        hoa,
        pmi,
    );

    let closing_costs = (price * CLOSING_COST_SHARE).floor();
    let reserves = (price * RESERVE_MONTHLY_SHARE * RESERVE_MONTHS).floor();
    let cash_to_close = CashToClose {
        down_payment: down.floor(),
        closing_costs,
        reserves,
        total: down.floor() + closing_costs + reserves,
    };

    let down_payment_percent = if price.is_zero() {
        Decimal::ZERO
    } else {
        (down / price * dec!(100)).round_dp(2)
    };

    let output = AffordabilityOutput {
        max_home_price: price,
        loan_amount: loan.floor(),
        down_payment_percent,
        monthly_gross_income: gross_monthly.floor(),
        max_total_monthly_debt: max_total_debt.floor(),
        max_monthly_housing_payment: housing_budget.floor(),
        remaining_monthly_income: non_negative(gross_monthly - housing_budget - debts).floor(),
        pmi_applied,
        monthly_breakdown: breakdown,
        cash_to_close,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "DTI-constrained price solve with single PMI correction",
        input,
        guard.into_warnings(),
        elapsed,
        output,
    )
}

/// [`max_affordable_price`] checked against the underwriting thresholds.
/// The solved loan is classified for `state_code`; a DTI limit above that
/// category's ceiling, or an LTV above its maximum, is reported as a warning.
pub fn max_affordable_price_with_rules(
    input: &AffordabilityInput,
    state_code: Option<&str>,
    assumptions: &LendingAssumptions,
) -> ComputationOutput<AffordabilityOutput> {
    let mut out = max_affordable_price(input);
    let result = &out.result;
    if result.loan_amount.is_zero() {
        return out;
    }

    let category = loan_category(result.loan_amount, state_code, assumptions);
    let underwriting = &assumptions.underwriting;
    let ceiling = underwriting.dti_ceiling(category);
    if input.dti_limit_percent > ceiling {
        out.warnings.push(format!(
            "DTI limit {}% exceeds the {ceiling}% ceiling for a {category} loan",
            input.dti_limit_percent
        ));
    }
    let ltv = ltv_percent(result.loan_amount, result.max_home_price);
    let max_ltv = underwriting.max_ltv(None, category);
    if ltv > max_ltv {
        out.warnings.push(format!(
            "LTV {:.2}% exceeds the {max_ltv}% maximum for a {category} loan",
            ltv
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> AffordabilityInput {
        AffordabilityInput {
            annual_income: dec!(95_000),
            monthly_debts: dec!(600),
            down_payment: dec!(40_000),
            dti_limit_percent: dec!(36),
            annual_rate_percent: dec!(6.875),
            term_years: 30,
            property_tax_rate_percent: dec!(1.15),
            insurance_rate_percent: dec!(0.35),
            monthly_hoa: Decimal::ZERO,
            pmi_rate_percent: dec!(0.50),
        }
    }

    #[test]
    fn test_reference_scenario() {
        let out = max_affordable_price(&sample_input()).result;
        assert_eq!(out.max_monthly_housing_payment, dec!(2250));
        assert!(out.max_home_price > dec!(300_000), "{}", out.max_home_price);
        assert!(out.max_home_price < dec!(400_000), "{}", out.max_home_price);
        assert!(out.pmi_applied);
        assert_eq!(out.loan_amount, out.max_home_price - dec!(40_000));
    }

    #[test]
    fn test_breakdown_fits_budget() {
        let out = max_affordable_price(&sample_input()).result;
        // Flooring the price can only bring the payment under the budget.
        assert!(out.monthly_breakdown.total <= dec!(2250.05));
        assert!(out.monthly_breakdown.total > dec!(2240));
    }

    #[test]
    fn test_monotone_in_income() {
        let mut last = Decimal::ZERO;
        for income in (40_000..=250_000).step_by(15_000) {
            let mut input = sample_input();
            input.annual_income = Decimal::from(income);
            let price = max_affordable_price(&input).result.max_home_price;
            assert!(price >= last, "income {income}: {price} < {last}");
            last = price;
        }
    }

    #[test]
    fn test_monotone_in_debts() {
        let mut last = Decimal::MAX;
        for debts in (0..=3_000).step_by(250) {
            let mut input = sample_input();
            input.monthly_debts = Decimal::from(debts);
            let price = max_affordable_price(&input).result.max_home_price;
            assert!(price <= last, "debts {debts}: {price} > {last}");
            last = price;
        }
    }

    #[test]
    fn test_pmi_lowers_price() {
        let input = sample_input();
        let loan_factor = annuity_factor(monthly_rate(input.annual_rate_percent), 360);
        let escrow_factor = dec!(1.50) / dec!(1200);
        let no_pmi = price_for_housing_budget(
            dec!(2250),
            Decimal::ZERO,
            input.down_payment,
            loan_factor,
            escrow_factor,
        );
        let out = max_affordable_price(&input).result;
        assert!(out.pmi_applied);
        assert!(out.max_home_price < no_pmi);
    }

    #[test]
    fn test_large_down_payment_skips_pmi() {
        let mut input = sample_input();
        input.down_payment = dec!(150_000);
        let out = max_affordable_price(&input).result;
        assert!(!out.pmi_applied);
        assert_eq!(out.monthly_breakdown.pmi, Decimal::ZERO);
    }

    #[test]
    fn test_pmi_price_pinned_to_twenty_percent_down() {
        // The no-PMI price is just above 5x down, and adding PMI would drop
        // it below, so the 20%-down price is returned instead.
        let mut input = sample_input();
        input.down_payment = dec!(69_000);
        let out = max_affordable_price(&input).result;
        assert!(!out.pmi_applied);
        assert_eq!(out.max_home_price, dec!(345_000));
        assert_eq!(out.down_payment_percent, dec!(20));
    }

    #[test]
    fn test_zero_dti_is_zero_price() {
        let mut input = sample_input();
        input.dti_limit_percent = Decimal::ZERO;
        let out = max_affordable_price(&input);
        assert_eq!(out.result.max_home_price, Decimal::ZERO);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_negative_dti_coerced() {
        let mut input = sample_input();
        input.dti_limit_percent = dec!(-10);
        let out = max_affordable_price(&input);
        assert_eq!(out.result.max_home_price, Decimal::ZERO);
        assert!(out.warnings.iter().any(|w| w.contains("dti_limit_percent")));
    }

    #[test]
    fn test_zero_rate_and_zero_escrow() {
        let mut input = sample_input();
        input.annual_rate_percent = Decimal::ZERO;
        input.property_tax_rate_percent = Decimal::ZERO;
        input.insurance_rate_percent = Decimal::ZERO;
        input.down_payment = dec!(250_000);
        let out = max_affordable_price(&input).result;
        // 2250 * 360 of principal plus the down payment.
        assert!(!out.pmi_applied);
        assert!((out.max_home_price - dec!(1_060_000)).abs() <= dec!(1));
    }

    #[test]
    fn test_cash_to_close() {
        let out = max_affordable_price(&sample_input()).result;
        let c = &out.cash_to_close;
        assert_eq!(c.total, c.down_payment + c.closing_costs + c.reserves);
        assert_eq!(c.closing_costs, (out.max_home_price * dec!(0.03)).floor());
    }

    #[test]
    fn test_zero_denominator_is_zero() {
        assert_eq!(
            price_for_housing_budget(dec!(2000), dec!(0), dec!(10), Decimal::ZERO, Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_zero_income_is_zero_price() {
        let mut input = sample_input();
        input.annual_income = Decimal::ZERO;
        let out = max_affordable_price(&input).result;
        assert_eq!(out.max_monthly_housing_payment, Decimal::ZERO);
        assert_eq!(out.max_home_price, Decimal::ZERO);
        assert_eq!(out.loan_amount, Decimal::ZERO);
        assert!(!out.pmi_applied);
    }

    #[test]
    fn test_hoa_consuming_budget_is_zero_price() {
        let mut input = sample_input();
        input.monthly_hoa = dec!(2250);
        let out = max_affordable_price(&input).result;
        assert_eq!(out.max_home_price, Decimal::ZERO);
    }

    #[test]
    fn test_escrow_bounds_price_below_down_payment() {
        // 100/month of escrow at 1.5% a year covers an 80,000 house, which
        // the down payment pays for outright.
        let loan_factor = annuity_factor(monthly_rate(dec!(6)), 360);
        let price = price_for_housing_budget(
            dec!(100),
            Decimal::ZERO,
            dec!(500_000),
            loan_factor,
            dec!(1.5) / dec!(1200),
        );
        assert_eq!(price, dec!(80_000));
    }

    #[test]
    fn test_budget_below_hoa_is_zero() {
        let loan_factor = annuity_factor(monthly_rate(dec!(6)), 360);
        assert_eq!(
            price_for_housing_budget(dec!(300), dec!(400), dec!(50_000), loan_factor, dec!(0.001)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_rules_warn_when_dti_above_ceiling() {
        let mut input = sample_input();
        input.dti_limit_percent = dec!(45);
        let assumptions = LendingAssumptions::default();
        let out = max_affordable_price_with_rules(&input, Some("TX"), &assumptions);
        assert!(out.warnings.iter().any(|w| w.contains("43% ceiling")), "{:?}", out.warnings);

        let mut relaxed = LendingAssumptions::default();
        relaxed.underwriting.dti_ceiling_conforming = dec!(50);
        let out = max_affordable_price_with_rules(&input, Some("TX"), &relaxed);
        assert!(!out.warnings.iter().any(|w| w.contains("ceiling")), "{:?}", out.warnings);
    }

    #[test]
    fn test_rules_jumbo_ceiling_and_ltv() {
        let mut input = sample_input();
        input.annual_income = dec!(400_000);
        input.dti_limit_percent = dec!(42);
        let out = max_affordable_price_with_rules(&input, None, &LendingAssumptions::default());
        assert!(out.result.loan_amount > dec!(830_000));
        assert!(out.warnings.iter().any(|w| w.contains("40% ceiling")), "{:?}", out.warnings);
        assert!(out.warnings.iter().any(|w| w.contains("80% maximum")), "{:?}", out.warnings);
    }

    #[test]
    fn test_rules_quiet_for_reference_scenario() {
        let out =
            max_affordable_price_with_rules(&sample_input(), None, &LendingAssumptions::default());
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }
}
