//! Month-by-month amortisation with optional extra principal.
//!
//! The month loop in [`amortize`] is shared by the schedule builder and the
//! payoff simulator. It always halts: either the balance is settled or the
//! [`MAX_SCHEDULE_MONTHS`] ceiling is reached, in which case the caller gets
//! `never_pays_off = true` instead of a misleading month count.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::payment::{self, monthly_payment, monthly_rate, payment_split, term_months};
use crate::sanitize::{non_negative, InputGuard};
use crate::types::{default_term_years, with_metadata, ComputationOutput, Money, Percent};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Hard ceiling on simulated months (60 years).
pub const MAX_SCHEDULE_MONTHS: u32 = 720;

/// A residual balance below one cent is settled with the final payment.
pub const BALANCE_EPSILON: Decimal = dec!(0.01);

/// Equity milestones reported on yearly schedules: (label, percent of value).
const EQUITY_MILESTONES: [(&str, Decimal); 3] = [
    ("PMI Exit", dec!(20)),
    ("Equity Split", dec!(50)),
    ("Full Ownership", dec!(100)),
];

// ---------------------------------------------------------------------------
// Month loop
// ---------------------------------------------------------------------------

/// One simulated month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthStep {
    /// 1-based month number.
    pub month: u32,
    pub interest: Money,
    pub principal: Money,
    /// Balance after this month's payment.
    pub balance: Money,
}

/// Totals from running a balance down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Amortization {
    pub months: u32,
    pub total_interest: Money,
    pub ending_balance: Money,
    pub never_pays_off: bool,
}

/// Run `balance` down with a fixed monthly `payment`, calling `on_month`
/// after each month. Stops when the balance is settled or `ceiling` months
/// have elapsed.
pub fn amortize<F>(
    balance: Money,
    monthly_rate: Decimal,
    payment: Money,
    ceiling: u32,
    mut on_month: F,
) -> Amortization
where
    F: FnMut(&MonthStep),
{
    let mut balance = non_negative(balance);
    let mut months = 0u32;
    let mut total_interest = Decimal::ZERO;

    while balance > Decimal::ZERO && months < ceiling {
        let split = payment_split(balance, monthly_rate, payment);
        let mut principal = split.principal;
        if balance - principal < BALANCE_EPSILON {
            principal = balance;
        }

        balance -= principal;
        total_interest += split.interest;
        months += 1;

        on_month(&MonthStep {
            month: months,
            interest: split.interest,
            principal,
            balance,
        });
    }

    let never_pays_off = balance > Decimal::ZERO;
    if never_pays_off {
        tracing::warn!(
            months,
            remaining = %balance,
            payment = %payment,
            "balance not settled within the month ceiling"
        );
    }

    Amortization {
        months,
        total_interest,
        ending_balance: balance,
        never_pays_off,
    }
}

// ---------------------------------------------------------------------------
// Schedule types
// ---------------------------------------------------------------------------

/// One row of a schedule: a month, or a year of months summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationPeriod {
    /// 1-based month or year number, depending on granularity.
    pub period_index: u32,
    pub interest_portion: Money,
    pub principal_portion: Money,
    pub remaining_balance: Money,
    pub cumulative_interest: Money,
    /// Home value minus remaining balance.
    pub equity: Money,
    /// Date of the last payment in the period, when a start date is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
}

/// Monthly schedule plus payoff totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub scheduled_payment: Money,
    pub periods: Vec<AmortizationPeriod>,
    pub months_to_payoff: u32,
    pub total_interest: Money,
    pub never_pays_off: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Monthly,
    #[default]
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub principal: Money,
    pub annual_rate_percent: Percent,
    #[serde(default = "default_term_years")]
    pub term_years: u32,
    #[serde(default)]
    pub extra_monthly_payment: Money,
    /// Property value used for equity; defaults to the principal.
    #[serde(default)]
    pub home_value: Option<Money>,
    /// Loan start date; payment `k` falls `k` months later.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub granularity: Granularity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityMilestone {
    pub label: String,
    pub percent_of_value: Percent,
    pub target_equity: Money,
    /// Loan year in which the target is first met; 0 when met at closing,
    /// `None` when never met within the schedule.
    pub year: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub scheduled_payment: Money,
    pub total_monthly_payment: Money,
    pub periods: Vec<AmortizationPeriod>,
    pub months_to_payoff: u32,
    pub total_interest: Money,
    pub total_cost: Money,
    pub baseline_total_interest: Money,
    pub interest_saved: Money,
    pub months_saved: u32,
    pub never_pays_off: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
    pub equity_milestones: Vec<EquityMilestone>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Monthly schedule for a fixed-rate loan with optional extra principal.
pub fn build_schedule(
    principal: Money,
    annual_rate_percent: Percent,
    term_years: u32,
    extra_monthly_payment: Money,
) -> Schedule {
    let principal = non_negative(principal);
    let scheduled_payment = monthly_payment(principal, annual_rate_percent, term_years);
    let payment = scheduled_payment + non_negative(extra_monthly_payment);

    let mut periods = Vec::new();
    let mut cumulative = Decimal::ZERO;
    let run = amortize(
        principal,
        monthly_rate(annual_rate_percent),
        payment,
        MAX_SCHEDULE_MONTHS,
        |step| {
            cumulative += step.interest;
            periods.push(AmortizationPeriod {
                period_index: step.month,
                interest_portion: step.interest,
                principal_portion: step.principal,
                remaining_balance: step.balance,
                cumulative_interest: cumulative,
                equity: principal - step.balance,
                payment_date: None,
            });
        },
    );

    Schedule {
        scheduled_payment,
        periods,
        months_to_payoff: run.months,
        total_interest: run.total_interest,
        never_pays_off: run.never_pays_off,
    }
}

/// Full schedule analysis: monthly or yearly rows, savings against the
/// no-extra baseline, payoff date and equity milestones.
pub fn analyze_schedule(input: &ScheduleInput) -> ComputationOutput<ScheduleOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let principal = guard.money("principal", input.principal);
    let rate = guard.percent("annual_rate_percent", input.annual_rate_percent);
    let term_years = guard.count_or("term_years", input.term_years, default_term_years());
    let extra = guard.money("extra_monthly_payment", input.extra_monthly_payment);
    let home_value = match input.home_value {
        Some(v) => guard.money("home_value", v),
        None => principal,
    };

    let schedule = build_schedule(principal, rate, term_years, extra);
    if schedule.never_pays_off {
        guard.warn(format!(
            "Loan does not pay off within {MAX_SCHEDULE_MONTHS} months"
        ));
    }

    let mut periods: Vec<AmortizationPeriod> = schedule
        .periods
        .into_iter()
        .map(|mut p| {
            p.equity = home_value - p.remaining_balance;
            p.payment_date = add_months(input.start_date, p.period_index);
            p
        })
        .collect();

    let equity_milestones = milestones(home_value, principal, &periods);

    if input.granularity == Granularity::Yearly {
        periods = roll_up_yearly(&periods, input.start_date);
    }

    let n = term_months(term_years);
    let baseline_total_interest =
        payment::total_interest(schedule.scheduled_payment, n, principal);
    let interest_saved = non_negative(baseline_total_interest - schedule.total_interest);
    let months_saved = if schedule.never_pays_off {
        0
    } else {
        n.saturating_sub(schedule.months_to_payoff)
    };
    let payoff_date = if schedule.never_pays_off {
        None
    } else {
        add_months(input.start_date, schedule.months_to_payoff)
    };

    let output = ScheduleOutput {
        scheduled_payment: schedule.scheduled_payment,
        total_monthly_payment: schedule.scheduled_payment + extra,
        periods,
        months_to_payoff: schedule.months_to_payoff,
        total_interest: schedule.total_interest,
        total_cost: principal + schedule.total_interest,
        baseline_total_interest,
        interest_saved,
        months_saved,
        never_pays_off: schedule.never_pays_off,
        payoff_date,
        equity_milestones,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Fixed-rate amortisation schedule",
        input,
        guard.into_warnings(),
        elapsed,
        output,
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn add_months(start: Option<NaiveDate>, months: u32) -> Option<NaiveDate> {
    start.and_then(|d| d.checked_add_months(Months::new(months)))
}

fn year_of_month(month: u32) -> u32 {
    (month + 11) / 12
}

fn roll_up_yearly(
    monthly: &[AmortizationPeriod],
    start_date: Option<NaiveDate>,
) -> Vec<AmortizationPeriod> {
    let mut years: Vec<AmortizationPeriod> = Vec::with_capacity(monthly.len() / 12 + 1);
    for m in monthly {
        let year = year_of_month(m.period_index);
        match years.last_mut() {
            Some(row) if row.period_index == year => {
                row.interest_portion += m.interest_portion;
                row.principal_portion += m.principal_portion;
                row.remaining_balance = m.remaining_balance;
                row.cumulative_interest = m.cumulative_interest;
                row.equity = m.equity;
                row.payment_date = add_months(start_date, m.period_index);
            }
            _ => years.push(AmortizationPeriod {
                period_index: year,
                ..m.clone()
            }),
        }
    }
    years
}

fn milestones(
    home_value: Money,
    principal: Money,
    monthly: &[AmortizationPeriod],
) -> Vec<EquityMilestone> {
    let opening_equity = home_value - principal;
    EQUITY_MILESTONES
        .iter()
        .map(|(label, pct)| {
            let target = home_value * pct / dec!(100);
            let year = if opening_equity >= target {
                Some(0)
            } else {
                monthly
                    .iter()
                    .find(|p| p.equity >= target)
                    .map(|p| year_of_month(p.period_index))
            };
            EquityMilestone {
                label: (*label).to_string(),
                percent_of_value: *pct,
                target_equity: target,
                year,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input() -> ScheduleInput {
        ScheduleInput {
            principal: dec!(350_000),
            annual_rate_percent: dec!(6.95),
            term_years: 30,
            extra_monthly_payment: Decimal::ZERO,
            home_value: None,
            start_date: None,
            granularity: Granularity::Yearly,
        }
    }

    #[test]
    fn test_schedule_runs_full_term_without_extra() {
        let s = build_schedule(dec!(400_000), dec!(6.5), 30, Decimal::ZERO);
        assert_eq!(s.months_to_payoff, 360);
        assert_eq!(s.periods.len(), 360);
        assert!(!s.never_pays_off);
        assert_eq!(s.periods.last().unwrap().remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_balances_non_increasing() {
        let s = build_schedule(dec!(250_000), dec!(7.25), 30, dec!(150));
        let mut prev = dec!(250_000);
        for p in &s.periods {
            assert!(p.remaining_balance <= prev);
            assert!(p.remaining_balance >= Decimal::ZERO);
            prev = p.remaining_balance;
        }
        assert_eq!(prev, Decimal::ZERO);
    }

    #[test]
    fn test_extra_payment_shortens_schedule() {
        let base = build_schedule(dec!(300_000), dec!(6.5), 30, Decimal::ZERO);
        let extra = build_schedule(dec!(300_000), dec!(6.5), 30, dec!(200));
        assert!(extra.months_to_payoff < base.months_to_payoff);
        assert!(extra.total_interest < base.total_interest);
    }

    #[test]
    fn test_term_beyond_ceiling_never_pays_off() {
        let s = build_schedule(dec!(300_000), dec!(6), 80, Decimal::ZERO);
        assert!(s.never_pays_off);
        assert_eq!(s.months_to_payoff, MAX_SCHEDULE_MONTHS);
        assert!(s.periods.last().unwrap().remaining_balance > Decimal::ZERO);
    }

    #[test]
    fn test_payment_below_interest_halts() {
        let run = amortize(dec!(100_000), dec!(0.01), dec!(500), MAX_SCHEDULE_MONTHS, |_| {});
        assert!(run.never_pays_off);
        assert_eq!(run.months, MAX_SCHEDULE_MONTHS);
        assert_eq!(run.ending_balance, dec!(100_000));
    }

    #[test]
    fn test_zero_principal_is_empty() {
        let s = build_schedule(Decimal::ZERO, dec!(6), 30, Decimal::ZERO);
        assert!(s.periods.is_empty());
        assert_eq!(s.months_to_payoff, 0);
        assert!(!s.never_pays_off);
    }

    #[test]
    fn test_yearly_rows_sum_to_totals() {
        let out = analyze_schedule(&base_input());
        let r = &out.result;
        assert_eq!(r.periods.len(), 30);
        let principal: Decimal = r.periods.iter().map(|p| p.principal_portion).sum();
        let interest: Decimal = r.periods.iter().map(|p| p.interest_portion).sum();
        assert!((principal - dec!(350_000)).abs() < dec!(0.000001));
        assert!((interest - r.total_interest).abs() < dec!(0.000001));
        assert_eq!(r.periods[29].period_index, 30);
        assert_eq!(r.months_saved, 0);
    }

    #[test]
    fn test_partial_final_year_row() {
        let mut input = base_input();
        input.extra_monthly_payment = dec!(500);
        let out = analyze_schedule(&input);
        let r = &out.result;
        let expected_rows = (r.months_to_payoff + 11) / 12;
        assert_eq!(r.periods.len() as u32, expected_rows);
        assert!(r.months_saved > 0);
        assert!(r.interest_saved > Decimal::ZERO);
    }

    #[test]
    fn test_payoff_date_from_start() {
        let mut input = base_input();
        input.start_date = NaiveDate::from_ymd_opt(2026, 1, 1);
        let out = analyze_schedule(&input);
        assert_eq!(out.result.payoff_date, NaiveDate::from_ymd_opt(2056, 1, 1));
        assert_eq!(
            out.result.periods[0].payment_date,
            NaiveDate::from_ymd_opt(2027, 1, 1)
        );
    }

    #[test]
    fn test_equity_milestones_with_down_payment() {
        let mut input = base_input();
        input.principal = dec!(360_000);
        input.home_value = Some(dec!(450_000));
        let out = analyze_schedule(&input);
        let ms = &out.result.equity_milestones;
        // 90k down is exactly 20% of 450k.
        assert_eq!(ms[0].year, Some(0));
        assert!(ms[1].year.unwrap() > 0);
        assert_eq!(ms[2].year, Some(30));
    }

    #[test]
    fn test_negative_extra_is_coerced_with_warning() {
        let mut input = base_input();
        input.extra_monthly_payment = dec!(-100);
        let out = analyze_schedule(&input);
        assert_eq!(out.result.total_monthly_payment, out.result.scheduled_payment);
        assert_eq!(out.warnings.len(), 1);
    }
}
