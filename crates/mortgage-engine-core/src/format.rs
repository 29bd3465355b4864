//! Display formatting for en-US borrowers.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{Money, Percent};

/// Whole-dollar USD with thousands separators: `$2,528`, `-$1,200`.
/// Cents round half away from zero.
pub fn format_currency(amount: Money) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${}", group_thousands(&rounded.abs().trunc().to_string()))
}

/// USD with cents: `$2,528.27`.
pub fn format_currency_cents(amount: Money) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let abs = rounded.abs();
    let whole = group_thousands(&abs.trunc().to_string());
    let cents = ((abs - abs.trunc()) * Decimal::ONE_HUNDRED)
        .trunc()
        .to_u32()
        .unwrap_or(0);
    format!("{sign}${whole}.{cents:02}")
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `10/18/2026`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

/// `Oct 2026`
pub fn format_month_year(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// `6 yrs 4 mos`, dropping a zero component.
pub fn format_duration_months(months: u32) -> String {
    let (years, rem) = (months / 12, months % 12);
    let unit = |n: u32, one: &str, many: &str| format!("{n} {}", if n == 1 { one } else { many });
    match (years, rem) {
        (0, m) => unit(m, "mo", "mos"),
        (y, 0) => unit(y, "yr", "yrs"),
        (y, m) => format!("{} {}", unit(y, "yr", "yrs"), unit(m, "mo", "mos")),
    }
}

/// Percentage points with a fixed number of decimals: `6.875%`.
pub fn format_percent(value: Percent, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}%", decimals as usize, rounded)
}
