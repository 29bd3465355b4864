//! Investor and self-employed qualification: debt service coverage on a
//! rental, and income-qualified loan amounts for non-QM programs.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::payment::{monthly_payment, principal_for_payment, MAX_TERM_YEARS};
use crate::market::{investor_rate, non_qm_rate, INVESTOR_RATE_PREMIUM};
use crate::sanitize::{non_negative, InputGuard};
use crate::types::{
    default_term_years, with_metadata, ComputationOutput, Money, Multiple, Percent,
};

/// Coverage at or above which a DSCR loan qualifies.
pub const DSCR_PASSING_RATIO: Multiple = dec!(1.00);

/// Share of the DTI budget assumed to go to principal and interest; the rest
/// is left for taxes and insurance.
const PRINCIPAL_AND_INTEREST_SHARE: Decimal = dec!(0.80);

/// Non-QM programs amortise over a fixed 30-year term.
const NON_QM_TERM_MONTHS: u32 = 360;

/// Rent divided by the full monthly payment. Zero when there is no payment.
pub fn debt_service_coverage_ratio(monthly_rent: Money, total_monthly_payment: Money) -> Multiple {
    if total_monthly_payment <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    non_negative(monthly_rent) / total_monthly_payment
}

/// Largest loan whose P&I fits in 80% of the DTI budget over 30 years.
pub fn income_qualified_loan_amount(
    monthly_income: Money,
    dti_limit_percent: Percent,
    annual_rate_percent: Percent,
) -> Money {
    let max_pi = max_principal_and_interest(monthly_income, dti_limit_percent);
    principal_for_payment(max_pi, annual_rate_percent, NON_QM_TERM_MONTHS)
}

fn max_principal_and_interest(monthly_income: Money, dti_limit_percent: Percent) -> Money {
    non_negative(monthly_income) * non_negative(dti_limit_percent) / dec!(100)
        * PRINCIPAL_AND_INTEREST_SHARE
}

// ---------------------------------------------------------------------------
// DSCR
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DscrInput {
    pub purchase_price: Money,
    pub monthly_rent: Money,
    #[serde(default = "default_ltv")]
    pub ltv_percent: Percent,
    /// Market rate for a conventional 30-year loan.
    pub base_rate_percent: Percent,
    /// Spread added to the market rate for investment property.
    #[serde(default = "default_investor_premium")]
    pub investor_premium_percent: Percent,
    #[serde(default = "default_term_years")]
    pub term_years: u32,
    /// Annual tax and insurance estimate as a percent of the price.
    #[serde(default = "default_tax_insurance_rate")]
    pub tax_insurance_rate_percent: Percent,
}

fn default_ltv() -> Percent {
    dec!(80)
}

fn default_investor_premium() -> Percent {
    INVESTOR_RATE_PREMIUM
}

fn default_tax_insurance_rate() -> Percent {
    dec!(1.25)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DscrOutput {
    pub loan_amount: Money,
    pub note_rate_percent: Percent,
    pub principal_and_interest: Money,
    pub estimated_taxes_insurance: Money,
    pub total_monthly_payment: Money,
    /// Rounded to two places before the pass test.
    pub dscr: Multiple,
    pub is_passing: bool,
    pub monthly_cash_flow: Money,
}

pub fn analyze_dscr(input: &DscrInput) -> ComputationOutput<DscrOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let price = guard.money("purchase_price", input.purchase_price);
    let rent = guard.money("monthly_rent", input.monthly_rent);
    let ltv = guard.percent("ltv_percent", input.ltv_percent);
    let base_rate = guard.percent("base_rate_percent", input.base_rate_percent);
    let premium = guard.percent("investor_premium_percent", input.investor_premium_percent);
    let tax_ins = guard.percent("tax_insurance_rate_percent", input.tax_insurance_rate_percent);
    let mut years = guard.count_or("term_years", input.term_years, default_term_years());
    if years > MAX_TERM_YEARS {
        guard.warn(format!("term_years = {years} capped at {MAX_TERM_YEARS}"));
        years = MAX_TERM_YEARS;
    }

    let note_rate = investor_rate(base_rate, premium);
    let loan = price * ltv / dec!(100);
    let pi = monthly_payment(loan, note_rate, years);
    let taxes_insurance = price * tax_ins / dec!(1200);
    let total = pi + taxes_insurance;

    let dscr = debt_service_coverage_ratio(rent, total)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let is_passing = dscr >= DSCR_PASSING_RATIO;
    if !is_passing {
        guard.warn(format!(
            "DSCR {dscr} below {DSCR_PASSING_RATIO}: rent does not cover the payment"
        ));
    }

    let output = DscrOutput {
        loan_amount: loan,
        note_rate_percent: note_rate,
        principal_and_interest: pi.round_dp(2),
        estimated_taxes_insurance: taxes_insurance.round_dp(2),
        total_monthly_payment: total.round_dp(2),
        dscr,
        is_passing,
        monthly_cash_flow: (rent - total).round_dp(2),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Debt service coverage: rent / (P&I + taxes and insurance)",
        input,
        guard.into_warnings(),
        elapsed,
        output,
    )
}

// ---------------------------------------------------------------------------
// Non-QM income comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonQmInput {
    /// Income as reported on tax returns, after write-offs.
    pub annual_tax_return_income: Money,
    /// Average annual deposits from bank statements.
    pub annual_bank_statement_income: Money,
    pub base_rate_percent: Percent,
    /// 12 or 24 months of statements; 24 prices lower.
    #[serde(default = "default_statement_months")]
    pub statement_months: u32,
    #[serde(default = "default_non_qm_dti")]
    pub dti_limit_percent: Percent,
}

fn default_statement_months() -> u32 {
    12
}

fn default_non_qm_dti() -> Percent {
    dec!(50)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonQmOutput {
    pub non_qm_rate_percent: Percent,
    pub tax_return_loan_amount: Money,
    pub bank_statement_loan_amount: Money,
    /// P&I budget under bank-statement income.
    pub bank_statement_payment: Money,
    pub difference: Money,
    /// Bank-statement loan over tax-return loan, one decimal place.
    pub multiplier: Option<Multiple>,
}

pub fn compare_non_qm_income(input: &NonQmInput) -> ComputationOutput<NonQmOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let tax_income = guard.money("annual_tax_return_income", input.annual_tax_return_income);
    let bank_income = guard.money(
        "annual_bank_statement_income",
        input.annual_bank_statement_income,
    );
    let base_rate = guard.percent("base_rate_percent", input.base_rate_percent);
    let dti = guard.percent("dti_limit_percent", input.dti_limit_percent);
    if input.statement_months != 12 && input.statement_months != 24 {
        guard.warn(format!(
            "statement_months = {} is not 12 or 24; priced as {}",
            input.statement_months,
            if input.statement_months >= 24 { 24 } else { 12 }
        ));
    }

    let rate = non_qm_rate(base_rate, input.statement_months);
    let tax_loan = income_qualified_loan_amount(tax_income / dec!(12), dti, rate);
    let bank_loan = income_qualified_loan_amount(bank_income / dec!(12), dti, rate);

    let multiplier = if tax_loan > Decimal::ZERO {
        Some((bank_loan / tax_loan).round_dp(1))
    } else {
        None
    };

    let output = NonQmOutput {
        non_qm_rate_percent: rate,
        tax_return_loan_amount: tax_loan.round_dp(2),
        bank_statement_loan_amount: bank_loan.round_dp(2),
        bank_statement_payment: max_principal_and_interest(bank_income / dec!(12), dti).round_dp(2),
        difference: (bank_loan - tax_loan).round_dp(2),
        multiplier,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Non-QM qualifying loan: 80% of DTI budget to P&I over 360 months",
        input,
        guard.into_warnings(),
        elapsed,
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dscr_input(rent: Decimal) -> DscrInput {
        DscrInput {
            purchase_price: dec!(500_000),
            monthly_rent: rent,
            ltv_percent: dec!(80),
            base_rate_percent: dec!(6.875),
            investor_premium_percent: dec!(0.875),
            term_years: 30,
            tax_insurance_rate_percent: dec!(1.25),
        }
    }

    #[test]
    fn test_dscr_reference_property() {
        let out = analyze_dscr(&dscr_input(dec!(3800))).result;
        assert_eq!(out.note_rate_percent, dec!(7.750));
        assert_eq!(out.loan_amount, dec!(400_000));
        // 400k at 7.75% is about 2,865.65 plus 520.83 taxes and insurance.
        assert!((out.total_monthly_payment - dec!(3386.48)).abs() < dec!(0.05));
        assert_eq!(out.dscr, dec!(1.12));
        assert!(out.is_passing);
    }

    #[test]
    fn test_dscr_flips_around_one() {
        let failing = analyze_dscr(&dscr_input(dec!(3300)));
        assert!(!failing.result.is_passing);
        assert_eq!(failing.warnings.len(), 1);

        let passing = analyze_dscr(&dscr_input(dec!(3400))).result;
        assert!(passing.is_passing);
        assert_eq!(passing.dscr, dec!(1.00));
    }

    #[test]
    fn test_dscr_rounds_before_comparing() {
        // 0.9996 rounds to 1.00 and passes.
        let payment = analyze_dscr(&dscr_input(dec!(3400))).result.total_monthly_payment;
        let rent = payment * dec!(0.9996);
        assert!(analyze_dscr(&dscr_input(rent)).result.is_passing);
    }

    #[test]
    fn test_ratio_zero_payment() {
        assert_eq!(
            debt_service_coverage_ratio(dec!(2000), Decimal::ZERO),
            Decimal::ZERO
        );
        assert_eq!(debt_service_coverage_ratio(dec!(3000), dec!(2000)), dec!(1.5));
    }

    #[test]
    fn test_income_qualified_loan() {
        // 10,000/month at 50% DTI: 4,000 of P&I at 7.625% over 30 years.
        let loan = income_qualified_loan_amount(dec!(10_000), dec!(50), dec!(7.625));
        let back = monthly_payment(loan, dec!(7.625), 30);
        assert!((back - dec!(4000)).abs() < dec!(0.0001));
        assert!(loan > dec!(560_000) && loan < dec!(570_000), "{loan}");
    }

    #[test]
    fn test_income_qualified_zero_income() {
        assert_eq!(
            income_qualified_loan_amount(Decimal::ZERO, dec!(50), dec!(7)),
            Decimal::ZERO
        );
    }

    fn non_qm_input(months: u32) -> NonQmInput {
        NonQmInput {
            annual_tax_return_income: dec!(45_000),
            annual_bank_statement_income: dec!(120_000),
            base_rate_percent: dec!(6.125),
            statement_months: months,
            dti_limit_percent: dec!(50),
        }
    }

    #[test]
    fn test_non_qm_comparison() {
        let out = compare_non_qm_income(&non_qm_input(12));
        let r = &out.result;
        assert!(out.warnings.is_empty());
        assert_eq!(r.non_qm_rate_percent, dec!(7.625));
        assert_eq!(r.bank_statement_payment, dec!(4000));
        // Loan is linear in income, so the multiplier is 120/45.
        assert_eq!(r.multiplier, Some(dec!(2.7)));
        assert!(r.difference > Decimal::ZERO);
    }

    #[test]
    fn test_non_qm_24_months_prices_lower() {
        let twelve = compare_non_qm_income(&non_qm_input(12)).result;
        let twenty_four = compare_non_qm_income(&non_qm_input(24)).result;
        assert_eq!(twenty_four.non_qm_rate_percent, dec!(7.375));
        assert!(twenty_four.bank_statement_loan_amount > twelve.bank_statement_loan_amount);
    }

    #[test]
    fn test_non_qm_no_tax_income() {
        let mut input = non_qm_input(12);
        input.annual_tax_return_income = Decimal::ZERO;
        assert_eq!(compare_non_qm_income(&input).result.multiplier, None);
    }
}
