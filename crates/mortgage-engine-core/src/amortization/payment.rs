//! Fixed-rate annuity math: payment, split, inverse solve.
//!
//! Every function here is total. Negative amounts and rates are treated as
//! zero, a zero rate falls back to straight-line repayment and a zero term
//! yields a zero payment.

use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::sanitize::{non_negative, InputGuard};
use crate::types::{with_metadata, ComputationOutput, LoanTerms, Money, Percent};

pub const MONTHS_PER_YEAR: u32 = 12;

/// Longest term any calculator will amortise over.
pub const MAX_TERM_YEARS: u32 = 100;

/// Monthly periodic rate from an annual percentage (6.5 -> 0.0054166..).
pub fn monthly_rate(annual_rate_percent: Percent) -> Decimal {
    non_negative(annual_rate_percent) / dec!(1200)
}

/// Number of monthly payments in a term, capped at [`MAX_TERM_YEARS`].
pub fn term_months(term_years: u32) -> u32 {
    term_years.min(MAX_TERM_YEARS) * MONTHS_PER_YEAR
}

/// (1 + r)^n; `None` once the power overflows.
fn compound(monthly_rate: Decimal, months: u32) -> Option<Decimal> {
    (Decimal::ONE + monthly_rate).checked_powu(u64::from(months))
}

/// Payment per unit of principal: `r / (1 - (1+r)^-n)`, or `1/n` at zero rate.
pub fn annuity_factor(monthly_rate: Decimal, months: u32) -> Decimal {
    if months == 0 {
        return Decimal::ZERO;
    }
    if monthly_rate <= Decimal::ZERO {
        return Decimal::ONE / Decimal::from(months);
    }

    // An overflowing growth factor means (1+r)^-n is indistinguishable from 0.
    let discount = match compound(monthly_rate, months) {
        Some(growth) if !growth.is_zero() => Decimal::ONE / growth,
        _ => Decimal::ZERO,
    };
    let denom = Decimal::ONE - discount;
    if denom <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    monthly_rate / denom
}

/// Monthly principal and interest for a fully amortising loan.
pub fn monthly_payment(principal: Money, annual_rate_percent: Percent, term_years: u32) -> Money {
    payment_for_months(principal, annual_rate_percent, term_months(term_years))
}

/// Monthly payment for an arbitrary number of remaining months.
pub fn payment_for_months(principal: Money, annual_rate_percent: Percent, months: u32) -> Money {
    let principal = non_negative(principal);
    if principal.is_zero() || months == 0 {
        return Decimal::ZERO;
    }
    let r = monthly_rate(annual_rate_percent);
    if r.is_zero() {
        return principal / Decimal::from(months);
    }
    principal * annuity_factor(r, months)
}

/// Largest principal a given monthly payment can amortise over `months`.
pub fn principal_for_payment(payment: Money, annual_rate_percent: Percent, months: u32) -> Money {
    let payment = non_negative(payment);
    let factor = annuity_factor(monthly_rate(annual_rate_percent), months);
    if factor.is_zero() {
        return Decimal::ZERO;
    }
    payment / factor
}

/// Interest and principal components of one payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub interest: Money,
    pub principal: Money,
}

/// Split a payment against the current balance. Principal never exceeds the
/// balance and never goes negative.
pub fn payment_split(balance: Money, monthly_rate: Decimal, payment: Money) -> PaymentSplit {
    let balance = non_negative(balance);
    let interest = balance * non_negative(monthly_rate);
    let principal = (payment - interest).max(Decimal::ZERO).min(balance);
    PaymentSplit {
        interest,
        principal,
    }
}

/// Total interest over the life of the loan: payments made minus principal.
pub fn total_interest(monthly_payment: Money, months: u32, principal: Money) -> Money {
    non_negative(monthly_payment * Decimal::from(months) - principal)
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutput {
    pub monthly_payment: Money,
    pub number_of_payments: u32,
    pub total_paid: Money,
    pub total_interest: Money,
    pub monthly_rate: Decimal,
}

/// Monthly payment plus lifetime totals for a set of loan terms.
pub fn analyze_payment(terms: &LoanTerms) -> ComputationOutput<PaymentOutput> {
    let start = Instant::now();
    let mut guard = InputGuard::new();

    let principal = guard.money("principal", terms.principal);
    let rate = guard.percent("annual_rate_percent", terms.annual_rate_percent);
    let years = terms.term_years.min(MAX_TERM_YEARS);
    if years != terms.term_years {
        guard.warn(format!(
            "term_years = {} capped at {MAX_TERM_YEARS}",
            terms.term_years
        ));
    }
    if years == 0 {
        guard.warn("term_years is 0; no payment schedule exists");
    }

    let months = term_months(years);
    let payment = monthly_payment(principal, rate, years);
    let output = PaymentOutput {
        monthly_payment: payment,
        number_of_payments: months,
        total_paid: payment * Decimal::from(months),
        total_interest: total_interest(payment, months, principal),
        monthly_rate: monthly_rate(rate),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Fixed-rate annuity payment",
        terms,
        guard.into_warnings(),
        elapsed,
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected ~{expected}, got {actual} (diff = {diff})"
        );
    }

    #[test]
    fn test_monthly_payment_400k_at_6_5() {
        let pmt = monthly_payment(dec!(400_000), dec!(6.5), 30);
        assert_close(pmt, dec!(2528.27), dec!(1));
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let pmt = monthly_payment(dec!(360_000), Decimal::ZERO, 30);
        assert_eq!(pmt, dec!(360_000) / dec!(360));
        assert_eq!(pmt, dec!(1000));
    }

    #[test]
    fn test_negative_inputs_are_zero() {
        assert_eq!(monthly_payment(dec!(-5), dec!(6), 30), Decimal::ZERO);
        // A negative rate behaves like zero.
        assert_eq!(
            monthly_payment(dec!(120_000), dec!(-3), 10),
            dec!(1000)
        );
    }

    #[test]
    fn test_zero_term_is_zero_payment() {
        assert_eq!(monthly_payment(dec!(100_000), dec!(6), 0), Decimal::ZERO);
    }

    #[test]
    fn test_payment_covers_principal() {
        for (p, r, t) in [
            (dec!(50_000), dec!(3.25), 15u32),
            (dec!(400_000), dec!(6.5), 30),
            (dec!(1_200_000), dec!(12), 30),
        ] {
            let pmt = monthly_payment(p, r, t);
            assert!(pmt * Decimal::from(t * 12) >= p);
        }
    }

    #[test]
    fn test_compound_growth() {
        assert_eq!(compound(dec!(0.005), 0), Some(Decimal::ONE));
        let growth = compound(dec!(0.005), 12).unwrap();
        assert_close(growth, dec!(1.0616778118644995), dec!(0.000000000001));
        assert_eq!(compound(dec!(0.5), 1200), None);
    }

    #[test]
    fn test_extreme_rate_does_not_overflow() {
        let pmt = monthly_payment(dec!(100_000), dec!(100), 100);
        // Interest-only limit: 100_000 * 100/1200
        assert_close(pmt, dec!(8333.33), dec!(0.01));
    }

    #[test]
    fn test_principal_for_payment_inverts_payment() {
        let pmt = monthly_payment(dec!(250_000), dec!(7), 30);
        let principal = principal_for_payment(pmt, dec!(7), 360);
        assert_close(principal, dec!(250_000), dec!(0.0001));
    }

    #[test]
    fn test_principal_for_payment_zero_term() {
        assert_eq!(principal_for_payment(dec!(2000), dec!(7), 0), Decimal::ZERO);
    }

    #[test]
    fn test_payment_split_caps_at_balance() {
        let split = payment_split(dec!(100), dec!(0.01), dec!(500));
        assert_eq!(split.interest, dec!(1));
        assert_eq!(split.principal, dec!(100));
    }

    #[test]
    fn test_total_interest_never_negative() {
        assert_eq!(total_interest(dec!(100), 10, dec!(5000)), Decimal::ZERO);
    }

    #[test]
    fn test_analyze_payment_envelope() {
        let out = analyze_payment(&LoanTerms {
            principal: dec!(400_000),
            annual_rate_percent: dec!(6.5),
            term_years: 30,
        });
        assert!(out.warnings.is_empty());
        assert_eq!(out.result.number_of_payments, 360);
        assert_close(out.result.total_interest, dec!(510_177), dec!(5));
    }
}
