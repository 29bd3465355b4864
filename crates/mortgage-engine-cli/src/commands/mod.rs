pub mod affordability;
pub mod investor;
pub mod monthly_cost;
pub mod payment;
pub mod payoff;
pub mod rates;
pub mod refinance;
pub mod rent_vs_buy;
pub mod sweep;

use rust_decimal::Decimal;

use mortgage_engine_core::sanitize::{parse_clamped, MAX_MONEY, MAX_PERCENT};

/// Flag parser for dollar amounts. Accepts "$400,000" as well as "400000".
pub fn amount(text: &str) -> Result<Decimal, String> {
    check_numeric(text)?;
    Ok(parse_clamped(text, Decimal::ZERO, MAX_MONEY))
}

/// Flag parser for percentages. A trailing `%` is allowed; values are
/// clamped into `[0, 100]`.
pub fn percent(text: &str) -> Result<Decimal, String> {
    check_numeric(text)?;
    Ok(parse_clamped(text, Decimal::ZERO, MAX_PERCENT))
}

fn check_numeric(text: &str) -> Result<(), String> {
    let trimmed = text.trim();
    if trimmed.starts_with('-') {
        return Err(format!("'{text}' must not be negative"));
    }
    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return Err(format!("'{text}' is not a number"));
    }
    if trimmed.matches('.').count() > 1 {
        return Err(format!("'{text}' has more than one decimal point"));
    }
    Ok(())
}
