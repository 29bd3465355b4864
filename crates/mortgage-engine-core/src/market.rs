//! Market rate sheets and location lookup.
//!
//! Rates arrive as strings ("6.875") from whatever feed backs a
//! [`RateProvider`]. A string that does not parse is logged and treated as
//! missing, so callers fall back to a user override or a default instead of
//! failing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MortgageEngineError;
use crate::lending_rules::{LendingAssumptions, MarketAdjustments};
use crate::sanitize::{clamp, non_negative, parse_rate, MAX_PERCENT};
use crate::types::Percent;

/// Spread over the conventional 30-year rate for investment property.
pub const INVESTOR_RATE_PREMIUM: Percent = dec!(0.875);

/// Non-QM margin over the 30-year rate with 12 months of bank statements.
pub const NON_QM_MARGIN_12_MONTHS: Percent = dec!(1.50);

/// Non-QM margin with 24 months of statements.
pub const NON_QM_MARGIN_24_MONTHS: Percent = dec!(1.25);

/// National 30-year base when no location is known.
pub const NATIONAL_BASE_RATE: Percent = dec!(6.875);

/// 30-year base once a ZIP code is supplied.
pub const LOCAL_BASE_RATE: Percent = dec!(6.950);

/// Base rate above which the sheet recommends locking.
const LOCK_THRESHOLD: Percent = dec!(7);

/// LTV above which the high-LTV adjustment applies.
const HIGH_LTV_PERCENT: Percent = dec!(90);

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoanProduct {
    #[serde(rename = "30Y")]
    Fixed30,
    #[serde(rename = "20Y")]
    Fixed20,
    #[serde(rename = "15Y")]
    Fixed15,
    #[serde(rename = "FHA")]
    Fha,
    #[serde(rename = "VA")]
    Va,
    #[serde(rename = "Jumbo")]
    Jumbo,
    #[serde(rename = "5/1 ARM")]
    Arm5_1,
}

impl LoanProduct {
    pub const ALL: [LoanProduct; 7] = [
        LoanProduct::Fixed30,
        LoanProduct::Fixed20,
        LoanProduct::Fixed15,
        LoanProduct::Fha,
        LoanProduct::Va,
        LoanProduct::Jumbo,
        LoanProduct::Arm5_1,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LoanProduct::Fixed30 => "30Y",
            LoanProduct::Fixed20 => "20Y",
            LoanProduct::Fixed15 => "15Y",
            LoanProduct::Fha => "FHA",
            LoanProduct::Va => "VA",
            LoanProduct::Jumbo => "Jumbo",
            LoanProduct::Arm5_1 => "5/1 ARM",
        }
    }

    /// Amortisation term in years. The ARM amortises over 30.
    pub fn term_years(self) -> u32 {
        match self {
            LoanProduct::Fixed20 => 20,
            LoanProduct::Fixed15 => 15,
            _ => 30,
        }
    }
}

impl fmt::Display for LoanProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LoanProduct {
    type Err = MortgageEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LoanProduct::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(wanted))
            .or_else(|| match wanted.to_ascii_lowercase().as_str() {
                "30" | "fixed30" | "30-year" => Some(LoanProduct::Fixed30),
                "20" | "fixed20" | "20-year" => Some(LoanProduct::Fixed20),
                "15" | "fixed15" | "15-year" => Some(LoanProduct::Fixed15),
                "arm" | "5/1" | "arm5_1" => Some(LoanProduct::Arm5_1),
                _ => None,
            })
            .ok_or_else(|| MortgageEngineError::InvalidInput {
                field: "product".into(),
                reason: format!("unknown loan product '{s}'"),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditTier {
    #[default]
    Excellent,
    Good,
    Fair,
}

impl CreditTier {
    fn adjustment(self) -> Percent {
        match self {
            CreditTier::Excellent => Decimal::ZERO,
            CreditTier::Good => dec!(0.250),
            CreditTier::Fair => dec!(0.750),
        }
    }
}

impl FromStr for CreditTier {
    type Err = MortgageEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excellent" => Ok(CreditTier::Excellent),
            "good" => Ok(CreditTier::Good),
            "fair" => Ok(CreditTier::Fair),
            other => Err(MortgageEngineError::InvalidInput {
                field: "credit".into(),
                reason: format!("unknown credit tier '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Rate sheets
// ---------------------------------------------------------------------------

/// Source of current market rates, in percent.
pub trait RateProvider {
    fn rate(&self, product: LoanProduct) -> Option<Percent>;
}

/// Rates per product as quoted strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSheet {
    pub rates: BTreeMap<LoanProduct, String>,
}

impl Default for RateSheet {
    /// Last published sheet, used before any feed has answered.
    fn default() -> Self {
        let rates = [
            (LoanProduct::Fixed30, "6.875"),
            (LoanProduct::Fixed15, "6.125"),
            (LoanProduct::Fha, "6.250"),
            (LoanProduct::Va, "6.250"),
            (LoanProduct::Fixed20, "6.500"),
        ]
        .into_iter()
        .map(|(p, r)| (p, r.to_string()))
        .collect();
        Self { rates }
    }
}

impl RateSheet {
    /// Sheet derived from a 30-year base: product spreads plus the credit
    /// tier adjustment, and the high-LTV adjustment above 90% LTV.
    pub fn derive(
        base_rate: Percent,
        credit: CreditTier,
        ltv_percent: Percent,
        adjustments: &MarketAdjustments,
    ) -> Self {
        let mut adjusted = base_rate + credit.adjustment();
        if ltv_percent > HIGH_LTV_PERCENT {
            adjusted += adjustments.high_ltv_adjustment;
        }
        let rates = LoanProduct::ALL
            .into_iter()
            .map(|p| {
                let rate = clamp(adjusted + adjustments.spread(p), Decimal::ZERO, MAX_PERCENT);
                (p, format!("{:.3}", rate))
            })
            .collect();
        Self { rates }
    }

    /// Sheet for a location: the local base when a ZIP is known.
    pub fn for_location(
        zip: Option<&str>,
        credit: CreditTier,
        ltv_percent: Percent,
        adjustments: &MarketAdjustments,
    ) -> Self {
        let base = match zip {
            Some(z) if !z.trim().is_empty() => LOCAL_BASE_RATE,
            _ => NATIONAL_BASE_RATE,
        };
        Self::derive(base, credit, ltv_percent, adjustments)
    }

    pub fn lock_recommendation(&self) -> &'static str {
        match self.rate(LoanProduct::Fixed30) {
            Some(r) if r > LOCK_THRESHOLD => "Lock",
            Some(_) => "Float",
            None => "Neutral",
        }
    }
}

impl RateProvider for RateSheet {
    fn rate(&self, product: LoanProduct) -> Option<Percent> {
        let quoted = self.rates.get(&product)?;
        match parse_rate(quoted) {
            Ok(rate) => Some(rate),
            Err(e) => {
                tracing::warn!(%product, quoted = %quoted, error = %e, "ignoring unparsable market rate");
                None
            }
        }
    }
}

/// Rate to price with: a user override wins, then the provider's quote for
/// the product, then `fallback`.
pub fn resolve_rate(
    user_override: Option<Percent>,
    provider: &dyn RateProvider,
    product: LoanProduct,
    fallback: Percent,
) -> Percent {
    if let Some(rate) = user_override {
        return clamp(rate, Decimal::ZERO, MAX_PERCENT);
    }
    provider.rate(product).unwrap_or(fallback)
}

/// Refinance rate: the purchase rate plus the configured surcharge.
pub fn refinance_rate(purchase_rate: Percent, adjustments: &MarketAdjustments) -> Percent {
    clamp(
        non_negative(purchase_rate) + adjustments.refinance_surcharge,
        Decimal::ZERO,
        MAX_PERCENT,
    )
}

/// Investment property rate: base plus a risk premium.
pub fn investor_rate(base_rate: Percent, premium: Percent) -> Percent {
    clamp(non_negative(base_rate) + premium, Decimal::ZERO, MAX_PERCENT)
}

/// Non-QM rate for bank-statement income. Twenty-four months of statements
/// price lower than twelve.
pub fn non_qm_rate(base_rate: Percent, statement_months: u32) -> Percent {
    let margin = if statement_months >= 24 {
        NON_QM_MARGIN_24_MONTHS
    } else {
        NON_QM_MARGIN_12_MONTHS
    };
    clamp(non_negative(base_rate) + margin, Decimal::ZERO, MAX_PERCENT)
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub zip: String,
    pub city: String,
    pub state_code: String,
    /// Local overrides of the national escrow defaults.
    #[serde(default)]
    pub property_tax_rate_percent: Option<Percent>,
    #[serde(default)]
    pub insurance_rate_percent: Option<Percent>,
}

/// Source of location data keyed by ZIP code.
pub trait LocationProvider {
    fn lookup(&self, zip: &str) -> Option<Location>;
}

/// In-memory location table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticLocationProvider {
    locations: Vec<Location>,
}

impl StaticLocationProvider {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }
}

impl LocationProvider for StaticLocationProvider {
    fn lookup(&self, zip: &str) -> Option<Location> {
        let zip = zip.trim();
        if !is_valid_zip(zip) {
            return None;
        }
        self.locations.iter().find(|l| l.zip == zip).cloned()
    }
}

/// Five ASCII digits.
pub fn is_valid_zip(zip: &str) -> bool {
    zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit())
}

/// Tax and insurance rates for a ZIP, falling back to the configured
/// national defaults.
pub fn escrow_rates(
    provider: &dyn LocationProvider,
    zip: Option<&str>,
    assumptions: &LendingAssumptions,
) -> (Percent, Percent) {
    let location = zip.and_then(|z| provider.lookup(z));
    let tax = location
        .as_ref()
        .and_then(|l| l.property_tax_rate_percent)
        .unwrap_or(assumptions.property_tax_rate_percent);
    let insurance = location
        .as_ref()
        .and_then(|l| l.insurance_rate_percent)
        .unwrap_or(assumptions.insurance_rate_percent);
    (tax, insurance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_product_labels_round_trip() {
        for p in LoanProduct::ALL {
            assert_eq!(p.label().parse::<LoanProduct>().unwrap(), p);
        }
        assert_eq!("arm".parse::<LoanProduct>().unwrap(), LoanProduct::Arm5_1);
        assert!("40Y".parse::<LoanProduct>().is_err());
    }

    #[test]
    fn test_product_serde_names() {
        let json = serde_json::to_string(&LoanProduct::Arm5_1).unwrap();
        assert_eq!(json, "\"5/1 ARM\"");
    }

    #[test]
    fn test_default_sheet() {
        let sheet = RateSheet::default();
        assert_eq!(sheet.rate(LoanProduct::Fixed30), Some(dec!(6.875)));
        assert_eq!(sheet.rate(LoanProduct::Jumbo), None);
    }

    #[test]
    fn test_derive_applies_spreads_and_adjustments() {
        let sheet = RateSheet::derive(
            dec!(6.875),
            CreditTier::Good,
            dec!(95),
            &MarketAdjustments::default(),
        );
        // 6.875 + 0.25 credit + 0.125 high LTV
        assert_eq!(sheet.rates[&LoanProduct::Fixed30], "7.250");
        assert_eq!(sheet.rates[&LoanProduct::Fixed15], "6.500");
        assert_eq!(sheet.rates[&LoanProduct::Jumbo], "7.625");
        assert_eq!(sheet.lock_recommendation(), "Lock");
    }

    #[test]
    fn test_derive_follows_configured_spreads() {
        let mut adjustments = MarketAdjustments::default();
        adjustments.jumbo_premium = dec!(0.250);
        adjustments.high_ltv_adjustment = Decimal::ZERO;
        let sheet = RateSheet::derive(dec!(6.875), CreditTier::Excellent, dec!(95), &adjustments);
        assert_eq!(sheet.rates[&LoanProduct::Fixed30], "6.875");
        assert_eq!(sheet.rates[&LoanProduct::Jumbo], "7.125");
    }

    #[test]
    fn test_refinance_rate_adds_surcharge() {
        let mut adjustments = MarketAdjustments::default();
        assert_eq!(refinance_rate(dec!(6.875), &adjustments), dec!(7.000));
        adjustments.refinance_surcharge = dec!(0.375);
        assert_eq!(refinance_rate(dec!(6.875), &adjustments), dec!(7.250));
    }

    #[test]
    fn test_location_base_rate() {
        let adjustments = MarketAdjustments::default();
        let national = RateSheet::for_location(None, CreditTier::Excellent, dec!(80), &adjustments);
        let local =
            RateSheet::for_location(Some("90210"), CreditTier::Excellent, dec!(80), &adjustments);
        assert_eq!(national.rate(LoanProduct::Fixed30), Some(dec!(6.875)));
        assert_eq!(local.rate(LoanProduct::Fixed30), Some(dec!(6.950)));
        assert_eq!(national.lock_recommendation(), "Float");
    }

    #[test]
    fn test_bad_rate_string_is_missing() {
        let mut sheet = RateSheet::default();
        sheet.rates.insert(LoanProduct::Fixed30, "call us".into());
        assert_eq!(sheet.rate(LoanProduct::Fixed30), None);
        assert_eq!(
            resolve_rate(None, &sheet, LoanProduct::Fixed30, dec!(7)),
            dec!(7)
        );
    }

    #[test]
    fn test_resolve_rate_precedence() {
        let sheet = RateSheet::default();
        assert_eq!(
            resolve_rate(Some(dec!(5.5)), &sheet, LoanProduct::Fixed30, dec!(7)),
            dec!(5.5)
        );
        assert_eq!(
            resolve_rate(None, &sheet, LoanProduct::Fha, dec!(7)),
            dec!(6.25)
        );
    }

    #[test]
    fn test_investor_and_non_qm_rates() {
        assert_eq!(investor_rate(dec!(6.125), INVESTOR_RATE_PREMIUM), dec!(7.000));
        assert_eq!(non_qm_rate(dec!(6.125), 12), dec!(7.625));
        assert_eq!(non_qm_rate(dec!(6.125), 24), dec!(7.375));
    }

    #[test]
    fn test_location_lookup_and_escrow() {
        let provider = StaticLocationProvider::new(vec![Location {
            zip: "07030".into(),
            city: "Hoboken".into(),
            state_code: "NJ".into(),
            property_tax_rate_percent: Some(dec!(2.2)),
            insurance_rate_percent: None,
        }]);
        let assumptions = LendingAssumptions::default();
        assert_eq!(
            escrow_rates(&provider, Some("07030"), &assumptions),
            (dec!(2.2), dec!(0.35))
        );
        assert_eq!(
            escrow_rates(&provider, Some("7030"), &assumptions),
            (dec!(1.15), dec!(0.35))
        );
        assert!(provider.lookup("abcde").is_none());
    }
}
