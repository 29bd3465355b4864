use chrono::NaiveDate;
use mortgage_engine_core::format::{format_date, format_duration_months};
use mortgage_engine_core::payoff::{simulate_payoff, PayoffInput};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Payoff acceleration tests
// ===========================================================================

fn homeowner() -> PayoffInput {
    PayoffInput {
        current_balance: dec!(320_000),
        annual_rate_percent: dec!(6.5),
        remaining_years: 25,
        monthly_extra: Decimal::ZERO,
        one_time_lump_sum: Decimal::ZERO,
        bi_weekly_enabled: false,
        as_of: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
    }
}

#[test]
fn test_no_extras_matches_contract() {
    let r = simulate_payoff(&homeowner()).result;
    assert_eq!(r.months_saved, 0);
    assert_eq!(r.new_payoff_months, 300);
    assert_eq!(
        r.projected_freedom_date.map(format_date),
        Some("10/18/2051".to_string())
    );
}

#[test]
fn test_every_strategy_helps_and_they_stack() {
    let mut extra = homeowner();
    extra.monthly_extra = dec!(250);
    let extra = simulate_payoff(&extra).result;

    let mut lump = homeowner();
    lump.one_time_lump_sum = dec!(20_000);
    let lump = simulate_payoff(&lump).result;

    let mut all = homeowner();
    all.monthly_extra = dec!(250);
    all.one_time_lump_sum = dec!(20_000);
    all.bi_weekly_enabled = true;
    let all = simulate_payoff(&all).result;

    assert!(extra.months_saved > 0);
    assert!(lump.months_saved > 0);
    assert!(all.months_saved > extra.months_saved.max(lump.months_saved));
    assert!(all.interest_saved > extra.interest_saved.max(lump.interest_saved));
}

#[test]
fn test_months_saved_reads_as_duration() {
    let mut input = homeowner();
    input.monthly_extra = dec!(500);
    let r = simulate_payoff(&input).result;
    let text = format_duration_months(r.months_saved);
    assert!(text.contains("yr"), "{text}");
}
