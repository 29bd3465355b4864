use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::payment::{monthly_payment, term_months, total_interest, MAX_TERM_YEARS};
use crate::lending_rules::{
    estimated_monthly_insurance, estimated_monthly_pmi, estimated_monthly_tax, loan_category,
    loan_limit, ltv_percent, pmi_tier, LendingAssumptions, LoanCategory, LoanLimitStatus, PmiTier,
    PMI_LTV_THRESHOLD_PERCENT,
};
use crate::market::LoanProduct;
use crate::sanitize::InputGuard;
use crate::types::{
    default_term_years, with_metadata, ComputationOutput, Money, MonthlyBreakdown, Percent,
};

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// A purchase scenario. Unset escrow fields come from the lending assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCostInput {
    pub home_price: Money,
    #[serde(default = "default_down_payment_percent")]
    pub down_payment_percent: Percent,
    pub annual_rate_percent: Percent,
    #[serde(default = "default_term_years")]
    pub term_years: u32,
    /// Loan program, used for the LTV ceiling. Unset means conventional.
    #[serde(default)]
    pub product: Option<LoanProduct>,
    #[serde(default)]
    pub credit_score: Option<u32>,
    /// Two-letter state code, used for the conforming limit.
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub property_tax_rate_percent: Option<Percent>,
    #[serde(default)]
    pub insurance_rate_percent: Option<Percent>,
    #[serde(default)]
    pub monthly_hoa: Option<Money>,
    /// Whether tax, insurance, HOA and PMI are paid with the mortgage.
    #[serde(default = "default_include_escrow")]
    pub include_escrow: bool,
}

fn default_down_payment_percent() -> Percent {
    dec!(20)
}

fn default_include_escrow() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyCostOutput {
    pub loan_amount: Money,
    pub ltv_percent: Percent,
    pub loan_category: LoanCategory,
    pub loan_limit: LoanLimitStatus,
    /// Present only when PMI is charged.
    pub pmi_tier: Option<PmiTier>,
    pub breakdown: MonthlyBreakdown,
    /// Tax, insurance, HOA and PMI; zero when escrow is excluded.
    pub monthly_escrow: Money,
    pub total_monthly_payment: Money,
    pub total_interest: Money,
    pub total_cost: Money,
}

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

/// Full monthly housing payment for a purchase, with loan classification.
pub fn monthly_cost(
    input: &MonthlyCostInput,
    assumptions: &LendingAssumptions,
) -> ComputationOutput<MonthlyCostOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let price = guard.money("home_price", input.home_price);
    let down_pct = guard.percent("down_payment_percent", input.down_payment_percent);
    let rate = guard.percent("annual_rate_percent", input.annual_rate_percent);
    let tax_rate = guard.percent(
        "property_tax_rate_percent",
        input
            .property_tax_rate_percent
            .unwrap_or(assumptions.property_tax_rate_percent),
    );
    let ins_rate = guard.percent(
        "insurance_rate_percent",
        input
            .insurance_rate_percent
            .unwrap_or(assumptions.insurance_rate_percent),
    );
    let hoa = guard.money("monthly_hoa", input.monthly_hoa.unwrap_or(assumptions.monthly_hoa));
    let credit_score = input.credit_score.unwrap_or(assumptions.default_credit_score);
    let mut years = guard.count_or("term_years", input.term_years, default_term_years());
    if years > MAX_TERM_YEARS {
        guard.warn(format!("term_years = {years} capped at {MAX_TERM_YEARS}"));
        years = MAX_TERM_YEARS;
    }

    let loan = price * (dec!(100) - down_pct) / dec!(100);
    let ltv = ltv_percent(loan, price);
    let state = input.state_code.as_deref();
    let category = loan_category(loan, state, assumptions);
    let limit = loan_limit(loan, state, assumptions);

    let max_ltv = assumptions.underwriting.max_ltv(input.product, category);
    if ltv > max_ltv {
        let program = input.product.map_or("conventional", LoanProduct::label);
        guard.warn(format!(
            "LTV {:.2}% exceeds the {max_ltv}% maximum for a {category} {program} loan",
            ltv
        ));
    }
    if category == LoanCategory::Jumbo {
        guard.warn(format!(
            "Loan amount exceeds the {} conforming limit of {}",
            limit.limit_type, limit.limit
        ));
    }

    let pi = monthly_payment(loan, rate, years);
    let pmi = estimated_monthly_pmi(loan, price, credit_score, assumptions);
    let breakdown = MonthlyBreakdown::new(
        pi,
        estimated_monthly_tax(price, tax_rate),
        estimated_monthly_insurance(price, ins_rate),
        hoa,
        pmi,
    );

    let monthly_escrow = if input.include_escrow {
        breakdown.total - breakdown.principal_and_interest
    } else {
        Decimal::ZERO
    };
    let interest = total_interest(pi, term_months(years), loan);

    let output = MonthlyCostOutput {
        loan_amount: loan,
        ltv_percent: ltv.round_dp(2),
        loan_category: category,
        loan_limit: limit,
        pmi_tier: (ltv > PMI_LTV_THRESHOLD_PERCENT).then(|| pmi_tier(credit_score)),
        total_monthly_payment: breakdown.principal_and_interest + monthly_escrow,
        breakdown,
        monthly_escrow,
        total_interest: interest.round_dp(2),
        total_cost: (loan + interest).round_dp(2),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "PITI plus HOA and tiered PMI, classified against conforming limits",
        input,
        guard.into_warnings(),
        elapsed,
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> MonthlyCostInput {
        MonthlyCostInput {
            home_price: dec!(480_000),
            down_payment_percent: dec!(20),
            annual_rate_percent: dec!(6.5),
            term_years: 30,
            product: None,
            credit_score: None,
            state_code: Some("TX".into()),
            property_tax_rate_percent: None,
            insurance_rate_percent: None,
            monthly_hoa: None,
            include_escrow: true,
        }
    }

    #[test]
    fn test_twenty_percent_down_breakdown() {
        let out = monthly_cost(&sample_input(), &LendingAssumptions::default());
        let r = &out.result;
        assert!(out.warnings.is_empty());
        assert_eq!(r.loan_amount, dec!(384_000));
        assert_eq!(r.loan_category, LoanCategory::Conforming);
        assert_eq!(r.breakdown.property_tax, dec!(460));
        assert_eq!(r.breakdown.insurance, dec!(140));
        assert_eq!(r.breakdown.pmi, Decimal::ZERO);
        assert_eq!(r.pmi_tier, None);
        assert_eq!(r.total_monthly_payment, r.breakdown.total);
    }

    #[test]
    fn test_low_down_payment_charges_tiered_pmi() {
        let mut input = sample_input();
        input.down_payment_percent = dec!(5);
        input.credit_score = Some(700);
        let r = monthly_cost(&input, &LendingAssumptions::default()).result;
        assert_eq!(r.pmi_tier, Some(PmiTier::Standard));
        // 456k * 0.85% / 12
        assert_eq!(r.breakdown.pmi, dec!(323.00));
    }

    #[test]
    fn test_excluding_escrow() {
        let mut input = sample_input();
        input.include_escrow = false;
        let r = monthly_cost(&input, &LendingAssumptions::default()).result;
        assert_eq!(r.monthly_escrow, Decimal::ZERO);
        assert_eq!(r.total_monthly_payment, r.breakdown.principal_and_interest);
    }

    #[test]
    fn test_jumbo_warns() {
        let mut input = sample_input();
        input.home_price = dec!(1_500_000);
        let out = monthly_cost(&input, &LendingAssumptions::default());
        assert_eq!(out.result.loan_category, LoanCategory::Jumbo);
        assert!(out.warnings.iter().any(|w| w.contains("conforming limit")));
    }

    #[test]
    fn test_high_cost_state_is_high_balance() {
        let mut input = sample_input();
        input.home_price = dec!(1_200_000);
        input.state_code = Some("CA".into());
        let out = monthly_cost(&input, &LendingAssumptions::default());
        assert_eq!(out.result.loan_category, LoanCategory::HighBalance);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_overrides_beat_assumptions() {
        let mut input = sample_input();
        input.property_tax_rate_percent = Some(dec!(2.4));
        input.monthly_hoa = Some(dec!(250));
        let r = monthly_cost(&input, &LendingAssumptions::default()).result;
        assert_eq!(r.breakdown.property_tax, dec!(960));
        assert_eq!(r.breakdown.hoa, dec!(250));
    }

    #[test]
    fn test_ltv_ceiling_follows_product() {
        let mut input = sample_input();
        input.down_payment_percent = dec!(3);
        input.product = Some(LoanProduct::Fha);
        let out = monthly_cost(&input, &LendingAssumptions::default());
        assert!(out.warnings.iter().any(|w| w.contains("96.5% maximum")), "{:?}", out.warnings);

        input.down_payment_percent = Decimal::ZERO;
        input.product = Some(LoanProduct::Va);
        let out = monthly_cost(&input, &LendingAssumptions::default());
        assert!(!out.warnings.iter().any(|w| w.contains("LTV")), "{:?}", out.warnings);

        input.product = None;
        let out = monthly_cost(&input, &LendingAssumptions::default());
        assert!(out.warnings.iter().any(|w| w.contains("97% maximum")));
    }

    #[test]
    fn test_raised_fha_ceiling_clears_warning() {
        let mut input = sample_input();
        input.down_payment_percent = dec!(3);
        input.product = Some(LoanProduct::Fha);
        let mut assumptions = LendingAssumptions::default();
        assumptions.underwriting.max_ltv_fha = dec!(97);
        let out = monthly_cost(&input, &assumptions);
        assert!(!out.warnings.iter().any(|w| w.contains("LTV")), "{:?}", out.warnings);
    }
}
