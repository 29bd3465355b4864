use mortgage_engine_core::investor::{analyze_dscr, compare_non_qm_income, DscrInput, NonQmInput};
use mortgage_engine_core::market::INVESTOR_RATE_PREMIUM;
use mortgage_engine_core::refinance::{analyze_refinance, RefinanceInput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// DSCR tests
// ===========================================================================

fn rental() -> DscrInput {
    DscrInput {
        purchase_price: dec!(500_000),
        monthly_rent: dec!(3_800),
        ltv_percent: dec!(80),
        base_rate_percent: dec!(6.875),
        investor_premium_percent: INVESTOR_RATE_PREMIUM,
        term_years: 30,
        tax_insurance_rate_percent: dec!(1.25),
    }
}

#[test]
fn test_dscr_reference_property() {
    let r = analyze_dscr(&rental()).result;
    assert_eq!(r.note_rate_percent, dec!(7.75));
    assert_eq!(r.loan_amount, dec!(400_000));
    assert!(r.is_passing);
    assert!(r.monthly_cash_flow > Decimal::ZERO);
}

#[test]
fn test_dscr_pass_flag_follows_rent() {
    let mut rents: Vec<Decimal> = Vec::new();
    let mut rent = dec!(2_800);
    while rent <= dec!(4_200) {
        rents.push(rent);
        rent += dec!(100);
    }
    for rent in rents {
        let mut input = rental();
        input.monthly_rent = rent;
        let r = analyze_dscr(&input).result;
        assert_eq!(r.is_passing, r.dscr >= dec!(1.00), "rent {rent}");
    }
}

#[test]
fn test_non_qm_bank_statements_qualify_larger_loan() {
    let r = compare_non_qm_income(&NonQmInput {
        annual_tax_return_income: dec!(60_000),
        annual_bank_statement_income: dec!(150_000),
        base_rate_percent: dec!(6.875),
        statement_months: 12,
        dti_limit_percent: dec!(50),
    })
    .result;
    assert!(r.bank_statement_loan_amount > r.tax_return_loan_amount);
    let gap = r.bank_statement_loan_amount - r.tax_return_loan_amount;
    assert!((r.difference - gap).abs() <= dec!(0.01));
}

// ===========================================================================
// Refinance tests
// ===========================================================================

#[test]
fn test_refinance_lower_rate_breaks_even() {
    let r = analyze_refinance(&RefinanceInput {
        home_value: dec!(550_000),
        current_balance: dec!(380_000),
        current_rate_percent: dec!(7.5),
        years_remaining: 28,
        new_rate_percent: dec!(6.25),
        new_term_years: 30,
        closing_costs: dec!(6_000),
        roll_in_costs: false,
        cash_out: Decimal::ZERO,
    })
    .result;
    assert!(r.monthly_savings > Decimal::ZERO);
    let months = r.breakeven_months.unwrap();
    assert!(months > 0 && months < 60, "{months}");
    assert!(!r.exceeds_cash_out_ltv);
}
