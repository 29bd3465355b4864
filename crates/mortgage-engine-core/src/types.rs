use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages in points, the way borrowers type them (6.5 = 6.5%).
pub type Percent = Decimal;

/// Plain ratios (e.g. 1.25x DSCR)
pub type Multiple = Decimal;

/// Sweep variable specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: String,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Principal, rate and term of a fixed-rate loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate_percent: Percent,
    #[serde(default = "default_term_years")]
    pub term_years: u32,
}

pub(crate) fn default_term_years() -> u32 {
    30
}

/// Monthly housing cost by component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBreakdown {
    pub principal_and_interest: Money,
    pub property_tax: Money,
    pub insurance: Money,
    pub hoa: Money,
    pub pmi: Money,
    pub total: Money,
}

impl MonthlyBreakdown {
    /// Components rounded to cents; the total is the sum of the rounded parts.
    pub fn new(
        principal_and_interest: Money,
        property_tax: Money,
        insurance: Money,
        hoa: Money,
        pmi: Money,
    ) -> Self {
        let cents = |v: Money| v.round_dp(2);
        let (pi, tax, ins, hoa, pmi) = (
            cents(principal_and_interest),
            cents(property_tax),
            cents(insurance),
            cents(hoa),
            cents(pmi),
        );
        Self {
            principal_and_interest: pi,
            property_tax: tax,
            insurance: ins,
            hoa,
            pmi,
            total: pi + tax + ins + hoa + pmi,
        }
    }
}
