//! Early payoff simulation: extra monthly principal, a one-time lump sum and
//! a bi-weekly schedule, compared against the loan as written.

use chrono::{Local, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::payment::{
    monthly_rate, payment_for_months, term_months, total_interest, MAX_TERM_YEARS,
};
use crate::amortization::schedule::{amortize, MAX_SCHEDULE_MONTHS};
use crate::sanitize::{non_negative, InputGuard};
use crate::types::{default_term_years, with_metadata, ComputationOutput, Money, Percent};

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffInput {
    pub current_balance: Money,
    pub annual_rate_percent: Percent,
    #[serde(default = "default_term_years")]
    pub remaining_years: u32,
    #[serde(default)]
    pub monthly_extra: Money,
    /// Applied to the balance before the first simulated month.
    #[serde(default)]
    pub one_time_lump_sum: Money,
    /// Half the payment every two weeks: one extra payment a year.
    #[serde(default)]
    pub bi_weekly_enabled: bool,
    /// Date the simulation starts from. Defaults to today.
    #[serde(default = "today")]
    pub as_of: NaiveDate,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoffOutput {
    pub base_payment: Money,
    pub bi_weekly_extra: Money,
    /// Base payment plus every monthly extra.
    pub total_monthly_payment: Money,
    pub original_total_interest: Money,
    pub new_total_interest: Money,
    pub interest_saved: Money,
    pub original_payoff_months: u32,
    pub new_payoff_months: u32,
    pub months_saved: u32,
    /// `None` when the accelerated loan still never pays off.
    pub projected_freedom_date: Option<NaiveDate>,
    pub never_pays_off: bool,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub fn simulate_payoff(input: &PayoffInput) -> ComputationOutput<PayoffOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let balance = guard.money("current_balance", input.current_balance);
    let rate = guard.percent("annual_rate_percent", input.annual_rate_percent);
    let extra = guard.money("monthly_extra", input.monthly_extra);
    let lump_sum = guard.money("one_time_lump_sum", input.one_time_lump_sum);
    let mut years = guard.count_or("remaining_years", input.remaining_years, default_term_years());
    if years > MAX_TERM_YEARS {
        guard.warn(format!("remaining_years = {years} capped at {MAX_TERM_YEARS}"));
        years = MAX_TERM_YEARS;
    }

    // A paid-off loan has no remaining schedule to shorten.
    let n = if balance.is_zero() { 0 } else { term_months(years) };
    let r = monthly_rate(rate);
    let base_payment = payment_for_months(balance, rate, n);
    let bi_weekly_extra = if input.bi_weekly_enabled {
        base_payment / dec!(12)
    } else {
        Decimal::ZERO
    };
    let total_monthly_payment = base_payment + extra + bi_weekly_extra;

    let original_total_interest = if r.is_zero() {
        Decimal::ZERO
    } else {
        total_interest(base_payment, n, balance)
    };

    let starting_balance = non_negative(balance - lump_sum);
    let run = amortize(
        starting_balance,
        r,
        total_monthly_payment,
        MAX_SCHEDULE_MONTHS,
        |_| {},
    );

    let (months_saved, projected_freedom_date) = if run.never_pays_off {
        guard.warn(format!(
            "Loan does not pay off within {MAX_SCHEDULE_MONTHS} months at {total_monthly_payment:.2} per month"
        ));
        (0, None)
    } else {
        (
            n.saturating_sub(run.months),
            input.as_of.checked_add_months(Months::new(run.months)),
        )
    };

    let output = PayoffOutput {
        base_payment,
        bi_weekly_extra,
        total_monthly_payment,
        original_total_interest,
        new_total_interest: run.total_interest,
        interest_saved: non_negative(original_total_interest - run.total_interest),
        original_payoff_months: n,
        new_payoff_months: run.months,
        months_saved,
        projected_freedom_date,
        never_pays_off: run.never_pays_off,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Monthly payoff simulation with lump sum, extra and bi-weekly payments",
        input,
        guard.into_warnings(),
        elapsed,
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn sample_input() -> PayoffInput {
        PayoffInput {
            current_balance: dec!(400_000),
            annual_rate_percent: dec!(6.5),
            remaining_years: 30,
            monthly_extra: Decimal::ZERO,
            one_time_lump_sum: Decimal::ZERO,
            bi_weekly_enabled: false,
            as_of: as_of(),
        }
    }

    #[test]
    fn test_no_extras_saves_nothing() {
        let out = simulate_payoff(&sample_input());
        let r = &out.result;
        assert_eq!(r.new_payoff_months, 360);
        assert_eq!(r.months_saved, 0);
        assert!(r.interest_saved < dec!(1), "{}", r.interest_saved);
        assert_eq!(
            r.projected_freedom_date,
            NaiveDate::from_ymd_opt(2056, 10, 18)
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_extra_payment_saves_time_and_interest() {
        let mut input = sample_input();
        input.monthly_extra = dec!(500);
        let r = simulate_payoff(&input).result;
        assert!(r.months_saved > 60, "{}", r.months_saved);
        assert!(r.interest_saved > dec!(100_000));
        assert_eq!(r.new_payoff_months + r.months_saved, 360);
    }

    #[test]
    fn test_bi_weekly_adds_one_payment_a_year() {
        let mut input = sample_input();
        input.bi_weekly_enabled = true;
        let r = simulate_payoff(&input).result;
        assert_eq!(r.bi_weekly_extra, r.base_payment / dec!(12));
        assert!(r.months_saved >= 48, "{}", r.months_saved);
    }

    #[test]
    fn test_lump_sum_covering_balance() {
        let mut input = sample_input();
        input.one_time_lump_sum = dec!(450_000);
        let r = simulate_payoff(&input).result;
        assert_eq!(r.new_payoff_months, 0);
        assert_eq!(r.new_total_interest, Decimal::ZERO);
        assert_eq!(r.months_saved, 360);
        assert_eq!(r.projected_freedom_date, Some(as_of()));
    }

    #[test]
    fn test_zero_rate_has_no_interest() {
        let mut input = sample_input();
        input.annual_rate_percent = Decimal::ZERO;
        input.monthly_extra = dec!(1000);
        let r = simulate_payoff(&input).result;
        assert_eq!(r.original_total_interest, Decimal::ZERO);
        assert_eq!(r.new_total_interest, Decimal::ZERO);
        // 400k at 2,111.11 per month.
        assert_eq!(r.new_payoff_months, 190);
    }

    #[test]
    fn test_long_term_never_pays_off() {
        let mut input = sample_input();
        input.remaining_years = 80;
        let out = simulate_payoff(&input);
        let r = &out.result;
        assert!(r.never_pays_off);
        assert_eq!(r.new_payoff_months, 720);
        assert_eq!(r.months_saved, 0);
        assert_eq!(r.projected_freedom_date, None);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_negative_extra_coerced() {
        let mut input = sample_input();
        input.monthly_extra = dec!(-250);
        let out = simulate_payoff(&input);
        assert_eq!(out.result.months_saved, 0);
        assert!(out.warnings[0].contains("monthly_extra"));
    }

    #[test]
    fn test_zero_balance_saves_nothing() {
        let mut input = sample_input();
        input.current_balance = Decimal::ZERO;
        let r = simulate_payoff(&input).result;
        assert_eq!(r.base_payment, Decimal::ZERO);
        assert_eq!(r.original_payoff_months, 0);
        assert_eq!(r.new_payoff_months, 0);
        assert_eq!(r.months_saved, 0);
        assert_eq!(r.interest_saved, Decimal::ZERO);
        assert_eq!(r.projected_freedom_date, Some(as_of()));
    }

    #[test]
    fn test_missing_as_of_defaults_to_today() {
        let input: PayoffInput = serde_json::from_str(
            r#"{"current_balance": "300000", "annual_rate_percent": "6.5"}"#,
        )
        .unwrap();
        assert_eq!(input.as_of, Local::now().date_naive());
        assert_eq!(input.remaining_years, 30);
    }
}
