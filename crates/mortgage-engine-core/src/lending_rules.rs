//! Lending thresholds and default underwriting assumptions.
//!
//! [`LendingAssumptions`] is the configuration surface of the engine: loan
//! limits, DTI and LTV ceilings, escrow defaults, PMI factors by credit tier
//! and rate adjustments. The defaults track the 2026 FHFA baseline; callers
//! may load overrides from a file and must [`validate`](LendingAssumptions::validate)
//! them before use.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MortgageEngineError;
use crate::market::LoanProduct;
use crate::sanitize::non_negative;
use crate::types::{Money, Percent};
use crate::EngineResult;

/// Down payment share below which PMI applies.
pub const PMI_LTV_THRESHOLD_PERCENT: Percent = dec!(80);

/// Largest rate spread, in points, a market adjustment may carry.
const MAX_SPREAD: Percent = dec!(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanLimits {
    pub baseline: Money,
    pub high_cost: Money,
    /// State or territory codes treated as high-cost areas.
    pub high_cost_jurisdictions: Vec<String>,
}

impl Default for LoanLimits {
    fn default() -> Self {
        Self {
            baseline: dec!(830_000),
            high_cost: dec!(1_245_000),
            high_cost_jurisdictions: [
                "CA", "NY", "NJ", "MA", "HI", "DC", "WA", "VA", "MD", "AK", "GU", "VI",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnderwritingThresholds {
    pub dti_ceiling_conforming: Percent,
    pub dti_ceiling_jumbo: Percent,
    pub max_ltv_conventional: Percent,
    pub max_ltv_jumbo: Percent,
    pub max_ltv_fha: Percent,
    pub max_ltv_va: Percent,
}

impl Default for UnderwritingThresholds {
    fn default() -> Self {
        Self {
            dti_ceiling_conforming: dec!(43),
            dti_ceiling_jumbo: dec!(40),
            max_ltv_conventional: dec!(97),
            max_ltv_jumbo: dec!(80),
            max_ltv_fha: dec!(96.5),
            max_ltv_va: dec!(100),
        }
    }
}

impl UnderwritingThresholds {
    /// Back-end DTI ceiling for a loan category.
    pub fn dti_ceiling(&self, category: LoanCategory) -> Percent {
        match category {
            LoanCategory::Jumbo => self.dti_ceiling_jumbo,
            LoanCategory::Conforming | LoanCategory::HighBalance => self.dti_ceiling_conforming,
        }
    }

    /// Maximum LTV. Jumbo size caps every product; otherwise government
    /// products carry their own ceiling.
    pub fn max_ltv(&self, product: Option<LoanProduct>, category: LoanCategory) -> Percent {
        if category == LoanCategory::Jumbo {
            return self.max_ltv_jumbo;
        }
        match product {
            Some(LoanProduct::Fha) => self.max_ltv_fha,
            Some(LoanProduct::Va) => self.max_ltv_va,
            Some(LoanProduct::Jumbo) => self.max_ltv_jumbo,
            _ => self.max_ltv_conventional,
        }
    }
}

/// Annual PMI as a fraction of the loan amount, by credit tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PmiFactors {
    pub elite: Decimal,
    pub preferred: Decimal,
    pub standard: Decimal,
    pub recover: Decimal,
}

impl Default for PmiFactors {
    fn default() -> Self {
        Self {
            elite: dec!(0.0038),
            preferred: dec!(0.0055),
            standard: dec!(0.0085),
            recover: dec!(0.0115),
        }
    }
}

/// Rate spreads in percentage points applied to the 30-year base rate when
/// a rate sheet is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketAdjustments {
    pub fixed20_adjustment: Percent,
    pub fixed15_adjustment: Percent,
    pub jumbo_premium: Percent,
    pub fha_adjustment: Percent,
    pub va_adjustment: Percent,
    pub arm_adjustment: Percent,
    /// Added to every product above 90% LTV.
    pub high_ltv_adjustment: Percent,
    /// Added to the sheet rate when pricing a refinance.
    pub refinance_surcharge: Percent,
}

impl Default for MarketAdjustments {
    fn default() -> Self {
        Self {
            fixed20_adjustment: dec!(-0.375),
            fixed15_adjustment: dec!(-0.750),
            jumbo_premium: dec!(0.375),
            fha_adjustment: dec!(-0.500),
            va_adjustment: dec!(-0.625),
            arm_adjustment: dec!(-0.625),
            high_ltv_adjustment: dec!(0.125),
            refinance_surcharge: dec!(0.125),
        }
    }
}

impl MarketAdjustments {
    /// Spread of a product over the 30-year base.
    pub fn spread(&self, product: LoanProduct) -> Percent {
        match product {
            LoanProduct::Fixed30 => Decimal::ZERO,
            LoanProduct::Fixed20 => self.fixed20_adjustment,
            LoanProduct::Fixed15 => self.fixed15_adjustment,
            LoanProduct::Fha => self.fha_adjustment,
            LoanProduct::Va => self.va_adjustment,
            LoanProduct::Jumbo => self.jumbo_premium,
            LoanProduct::Arm5_1 => self.arm_adjustment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LendingAssumptions {
    pub loan_limits: LoanLimits,
    pub underwriting: UnderwritingThresholds,
    pub default_credit_score: u32,
    pub property_tax_rate_percent: Percent,
    pub insurance_rate_percent: Percent,
    pub monthly_hoa: Money,
    pub pmi_factors: PmiFactors,
    pub market_adjustments: MarketAdjustments,
}

impl Default for LendingAssumptions {
    fn default() -> Self {
        Self {
            loan_limits: LoanLimits::default(),
            underwriting: UnderwritingThresholds::default(),
            default_credit_score: 740,
            property_tax_rate_percent: dec!(1.15),
            insurance_rate_percent: dec!(0.35),
            monthly_hoa: Decimal::ZERO,
            pmi_factors: PmiFactors::default(),
            market_adjustments: MarketAdjustments::default(),
        }
    }
}

impl LendingAssumptions {
    pub fn validate(&self) -> EngineResult<()> {
        let limits = &self.loan_limits;
        if limits.baseline <= Decimal::ZERO {
            return Err(MortgageEngineError::InvalidAssumptions(
                "loan_limits.baseline must be positive".into(),
            ));
        }
        if limits.high_cost < limits.baseline {
            return Err(MortgageEngineError::InvalidAssumptions(
                "loan_limits.high_cost must be >= loan_limits.baseline".into(),
            ));
        }

        let percents = [
            ("underwriting.dti_ceiling_conforming", self.underwriting.dti_ceiling_conforming),
            ("underwriting.dti_ceiling_jumbo", self.underwriting.dti_ceiling_jumbo),
            ("underwriting.max_ltv_conventional", self.underwriting.max_ltv_conventional),
            ("underwriting.max_ltv_jumbo", self.underwriting.max_ltv_jumbo),
            ("underwriting.max_ltv_fha", self.underwriting.max_ltv_fha),
            ("underwriting.max_ltv_va", self.underwriting.max_ltv_va),
            ("property_tax_rate_percent", self.property_tax_rate_percent),
            ("insurance_rate_percent", self.insurance_rate_percent),
        ];
        for (field, value) in percents {
            if value < Decimal::ZERO || value > dec!(100) {
                return Err(MortgageEngineError::InvalidAssumptions(format!(
                    "{field} = {value} must be within 0..=100"
                )));
            }
        }

        let f = &self.pmi_factors;
        for (field, value) in [
            ("pmi_factors.elite", f.elite),
            ("pmi_factors.preferred", f.preferred),
            ("pmi_factors.standard", f.standard),
            ("pmi_factors.recover", f.recover),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(MortgageEngineError::InvalidAssumptions(format!(
                    "{field} = {value} must be a fraction within 0..=1"
                )));
            }
        }

        let m = &self.market_adjustments;
        for (field, value) in [
            ("market_adjustments.fixed20_adjustment", m.fixed20_adjustment),
            ("market_adjustments.fixed15_adjustment", m.fixed15_adjustment),
            ("market_adjustments.jumbo_premium", m.jumbo_premium),
            ("market_adjustments.fha_adjustment", m.fha_adjustment),
            ("market_adjustments.va_adjustment", m.va_adjustment),
            ("market_adjustments.arm_adjustment", m.arm_adjustment),
            ("market_adjustments.high_ltv_adjustment", m.high_ltv_adjustment),
            ("market_adjustments.refinance_surcharge", m.refinance_surcharge),
        ] {
            if value.abs() > MAX_SPREAD {
                return Err(MortgageEngineError::InvalidAssumptions(format!(
                    "{field} = {value} must be within -{MAX_SPREAD}..={MAX_SPREAD} points"
                )));
            }
        }

        if !(300..=850).contains(&self.default_credit_score) {
            return Err(MortgageEngineError::InvalidAssumptions(format!(
                "default_credit_score = {} outside the FICO range 300..=850",
                self.default_credit_score
            )));
        }
        if self.monthly_hoa < Decimal::ZERO {
            return Err(MortgageEngineError::InvalidAssumptions(
                "monthly_hoa cannot be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn is_high_cost(&self, state_code: Option<&str>) -> bool {
        state_code.is_some_and(|code| {
            self.loan_limits
                .high_cost_jurisdictions
                .iter()
                .any(|j| j.eq_ignore_ascii_case(code.trim()))
        })
    }
}

// ---------------------------------------------------------------------------
// Loan limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanCategory {
    Conforming,
    #[serde(rename = "High-Balance")]
    HighBalance,
    Jumbo,
}

impl std::fmt::Display for LoanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanCategory::Conforming => write!(f, "Conforming"),
            LoanCategory::HighBalance => write!(f, "High-Balance"),
            LoanCategory::Jumbo => write!(f, "Jumbo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanLimitStatus {
    pub is_jumbo: bool,
    pub limit: Money,
    pub limit_type: String,
}

/// Conforming limit that applies in a state, and whether the loan exceeds it.
pub fn loan_limit(
    loan_amount: Money,
    state_code: Option<&str>,
    assumptions: &LendingAssumptions,
) -> LoanLimitStatus {
    let high_cost = assumptions.is_high_cost(state_code);
    let limit = if high_cost {
        assumptions.loan_limits.high_cost
    } else {
        assumptions.loan_limits.baseline
    };
    LoanLimitStatus {
        is_jumbo: loan_amount > limit,
        limit,
        limit_type: if high_cost { "High-Cost" } else { "Standard" }.into(),
    }
}

/// Conforming below the baseline, High-Balance between the baseline and the
/// high-cost limit in high-cost areas, Jumbo above the applicable limit.
pub fn loan_category(
    loan_amount: Money,
    state_code: Option<&str>,
    assumptions: &LendingAssumptions,
) -> LoanCategory {
    let status = loan_limit(loan_amount, state_code, assumptions);
    if status.is_jumbo {
        LoanCategory::Jumbo
    } else if loan_amount > assumptions.loan_limits.baseline {
        LoanCategory::HighBalance
    } else {
        LoanCategory::Conforming
    }
}

// ---------------------------------------------------------------------------
// Escrow and PMI estimates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PmiTier {
    /// FICO 760+
    Elite,
    /// FICO 720-759
    Preferred,
    /// FICO 680-719
    Standard,
    /// FICO below 680
    Recover,
}

pub fn pmi_tier(credit_score: u32) -> PmiTier {
    match credit_score {
        760.. => PmiTier::Elite,
        720..=759 => PmiTier::Preferred,
        680..=719 => PmiTier::Standard,
        _ => PmiTier::Recover,
    }
}

impl PmiFactors {
    pub fn for_tier(&self, tier: PmiTier) -> Decimal {
        match tier {
            PmiTier::Elite => self.elite,
            PmiTier::Preferred => self.preferred,
            PmiTier::Standard => self.standard,
            PmiTier::Recover => self.recover,
        }
    }
}

/// Loan-to-value in percent; zero when the value is zero.
pub fn ltv_percent(loan_amount: Money, home_value: Money) -> Percent {
    if home_value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    non_negative(loan_amount) / home_value * dec!(100)
}

/// Monthly PMI by credit tier. Zero once LTV is at or below 80%.
pub fn estimated_monthly_pmi(
    loan_amount: Money,
    home_value: Money,
    credit_score: u32,
    assumptions: &LendingAssumptions,
) -> Money {
    if ltv_percent(loan_amount, home_value) <= PMI_LTV_THRESHOLD_PERCENT {
        return Decimal::ZERO;
    }
    let factor = assumptions.pmi_factors.for_tier(pmi_tier(credit_score));
    non_negative(loan_amount) * factor / dec!(12)
}

/// Monthly property tax from an annual rate in percent.
pub fn estimated_monthly_tax(home_value: Money, tax_rate_percent: Percent) -> Money {
    non_negative(home_value) * non_negative(tax_rate_percent) / dec!(1200)
}

/// Monthly hazard insurance from an annual rate in percent.
pub fn estimated_monthly_insurance(home_value: Money, insurance_rate_percent: Percent) -> Money {
    non_negative(home_value) * non_negative(insurance_rate_percent) / dec!(1200)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_validate() {
        LendingAssumptions::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let mut a = LendingAssumptions::default();
        a.loan_limits.high_cost = dec!(500_000);
        assert!(matches!(
            a.validate(),
            Err(MortgageEngineError::InvalidAssumptions(_))
        ));
    }

    #[test]
    fn test_validate_rejects_percent_out_of_range() {
        let mut a = LendingAssumptions::default();
        a.underwriting.max_ltv_va = dec!(101);
        let err = a.validate().unwrap_err().to_string();
        assert!(err.contains("max_ltv_va"));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let a: LendingAssumptions =
            serde_json::from_str(r#"{"loan_limits": {"baseline": "800000"}}"#).unwrap();
        assert_eq!(a.loan_limits.baseline, dec!(800000));
        assert_eq!(a.loan_limits.high_cost, dec!(1_245_000));
        assert_eq!(a.default_credit_score, 740);
    }

    #[test]
    fn test_validate_rejects_wild_spread() {
        let mut a = LendingAssumptions::default();
        a.market_adjustments.jumbo_premium = dec!(7.5);
        let err = a.validate().unwrap_err().to_string();
        assert!(err.contains("jumbo_premium"));
    }

    #[test]
    fn test_spreads_by_product() {
        let m = MarketAdjustments::default();
        assert_eq!(m.spread(LoanProduct::Fixed30), Decimal::ZERO);
        assert_eq!(m.spread(LoanProduct::Fixed15), dec!(-0.750));
        assert_eq!(m.spread(LoanProduct::Va), dec!(-0.625));
        assert_eq!(m.spread(LoanProduct::Jumbo), dec!(0.375));
    }

    #[test]
    fn test_ceilings_by_category_and_product() {
        let u = UnderwritingThresholds::default();
        assert_eq!(u.dti_ceiling(LoanCategory::Conforming), dec!(43));
        assert_eq!(u.dti_ceiling(LoanCategory::HighBalance), dec!(43));
        assert_eq!(u.dti_ceiling(LoanCategory::Jumbo), dec!(40));
        assert_eq!(u.max_ltv(None, LoanCategory::Conforming), dec!(97));
        assert_eq!(u.max_ltv(Some(LoanProduct::Fha), LoanCategory::Conforming), dec!(96.5));
        assert_eq!(u.max_ltv(Some(LoanProduct::Va), LoanCategory::HighBalance), dec!(100));
        assert_eq!(u.max_ltv(Some(LoanProduct::Va), LoanCategory::Jumbo), dec!(80));
    }

    #[test]
    fn test_loan_categories() {
        let a = LendingAssumptions::default();
        assert_eq!(loan_category(dec!(500_000), Some("TX"), &a), LoanCategory::Conforming);
        assert_eq!(loan_category(dec!(900_000), Some("ca"), &a), LoanCategory::HighBalance);
        assert_eq!(loan_category(dec!(900_000), Some("TX"), &a), LoanCategory::Jumbo);
        assert_eq!(loan_category(dec!(1_300_000), Some("NY"), &a), LoanCategory::Jumbo);
        assert_eq!(loan_category(dec!(900_000), None, &a), LoanCategory::Jumbo);
    }

    #[test]
    fn test_loan_limit_status() {
        let a = LendingAssumptions::default();
        let status = loan_limit(dec!(1_000_000), Some("HI"), &a);
        assert_eq!(
            status,
            LoanLimitStatus {
                is_jumbo: false,
                limit: dec!(1_245_000),
                limit_type: "High-Cost".into(),
            }
        );
    }

    #[test]
    fn test_pmi_tiers() {
        assert_eq!(pmi_tier(800), PmiTier::Elite);
        assert_eq!(pmi_tier(760), PmiTier::Elite);
        assert_eq!(pmi_tier(740), PmiTier::Preferred);
        assert_eq!(pmi_tier(700), PmiTier::Standard);
        assert_eq!(pmi_tier(620), PmiTier::Recover);
    }

    #[test]
    fn test_pmi_only_above_80_ltv() {
        let a = LendingAssumptions::default();
        assert_eq!(
            estimated_monthly_pmi(dec!(360_000), dec!(450_000), 740, &a),
            Decimal::ZERO
        );
        // 405k loan on 450k = 90% LTV, preferred tier 0.55%.
        let pmi = estimated_monthly_pmi(dec!(405_000), dec!(450_000), 740, &a);
        assert_eq!(pmi, dec!(405_000) * dec!(0.0055) / dec!(12));
    }

    #[test]
    fn test_escrow_estimates() {
        assert_eq!(estimated_monthly_tax(dec!(480_000), dec!(1.15)), dec!(460));
        assert_eq!(estimated_monthly_insurance(dec!(480_000), dec!(0.35)), dec!(140));
        assert_eq!(ltv_percent(dec!(1), Decimal::ZERO), Decimal::ZERO);
    }
}
