//! Input coercion shared by every calculator.
//!
//! Calculators never reject input. Text from currency fields is stripped to
//! digits and one decimal point; numeric fields are clamped into their
//! declared bounds. Every coercion that changes a value is recorded so the
//! output envelope can surface it as a warning.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

use crate::error::MortgageEngineError;
use crate::types::{Money, Percent};
use crate::EngineResult;

/// Largest monetary amount accepted by any calculator.
pub const MAX_MONEY: Money = dec!(1_000_000_000_000);

/// Largest percentage accepted for rates, ratios and LTVs.
pub const MAX_PERCENT: Percent = dec!(100);

/// Clamp a value into `[min, max]`. A reversed range collapses to `min`.
pub fn clamp(value: Decimal, min: Decimal, max: Decimal) -> Decimal {
    if max < min {
        return min;
    }
    value.max(min).min(max)
}

/// Negative values become zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Parse a currency or percentage field the way the input widgets do:
/// everything except digits and `.` is dropped and anything unparsable
/// becomes zero. Fractional digits are kept as written.
pub fn parse_amount(text: &str) -> Money {
    parse_numeric(text).unwrap_or(Decimal::ZERO)
}

/// [`parse_amount`] followed by a clamp into `[min, max]`.
pub fn parse_clamped(text: &str, min: Decimal, max: Decimal) -> Decimal {
    clamp(parse_amount(text), min, max)
}

/// Strict parse for rate strings supplied by a rate provider ("6.875").
pub fn parse_rate(text: &str) -> EngineResult<Percent> {
    let trimmed = text.trim().trim_end_matches('%');
    let rate = Decimal::from_str(trimmed).map_err(|_| MortgageEngineError::InvalidInput {
        field: "rate".into(),
        reason: format!("'{text}' is not a decimal rate"),
    })?;
    if rate < Decimal::ZERO || rate > MAX_PERCENT {
        return Err(MortgageEngineError::InvalidInput {
            field: "rate".into(),
            reason: format!("rate {rate} outside 0..=100"),
        });
    }
    Ok(rate)
}

fn parse_numeric(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = cleaned.split('.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = match fraction {
        Some(f) if !f.is_empty() => format!("{whole}.{f}"),
        _ => whole.to_string(),
    };
    Decimal::from_str(&normalized).ok()
}

/// Collects coercions applied to one calculator input.
#[derive(Debug, Default)]
pub struct InputGuard {
    warnings: Vec<String>,
}

impl InputGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Money field: clamped into `[0, MAX_MONEY]`.
    pub fn money(&mut self, field: &str, value: Money) -> Money {
        self.bounded(field, value, Decimal::ZERO, MAX_MONEY)
    }

    /// Percentage field: clamped into `[0, 100]`.
    pub fn percent(&mut self, field: &str, value: Percent) -> Percent {
        self.bounded(field, value, Decimal::ZERO, MAX_PERCENT)
    }

    /// Arbitrary bounded field.
    pub fn bounded(&mut self, field: &str, value: Decimal, min: Decimal, max: Decimal) -> Decimal {
        let coerced = clamp(value, min, max);
        if coerced != value {
            self.warnings
                .push(format!("{field} = {value} coerced to {coerced}"));
        }
        coerced
    }

    /// Integer field with a fallback used when the value is zero.
    pub fn count_or(&mut self, field: &str, value: u32, fallback: u32) -> u32 {
        if value == 0 {
            self.warnings
                .push(format!("{field} = 0 replaced with default {fallback}"));
            fallback
        } else {
            value
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}
