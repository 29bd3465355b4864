use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use mortgage_engine_core::lending_rules::LendingAssumptions;
use mortgage_engine_core::ComputationOutput;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse a JSON input, run a calculator and serialise its envelope.
fn run_json<I, O>(
    input_json: &str,
    run: impl FnOnce(&I) -> ComputationOutput<O>,
) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    serde_json::to_string(&run(&input)).map_err(to_napi_error)
}

/// Assumptions from an optional JSON string, validated.
fn parse_assumptions(assumptions_json: Option<String>) -> NapiResult<LendingAssumptions> {
    let assumptions: LendingAssumptions = match assumptions_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => LendingAssumptions::default(),
    };
    assumptions.validate().map_err(to_napi_error)?;
    Ok(assumptions)
}

// ---------------------------------------------------------------------------
// Amortisation
// ---------------------------------------------------------------------------

#[napi]
pub fn monthly_payment(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage_engine_core::amortization::payment::analyze_payment)
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage_engine_core::amortization::schedule::analyze_schedule)
}

// ---------------------------------------------------------------------------
// Purchase
// ---------------------------------------------------------------------------

#[napi]
pub fn max_affordable_price(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage_engine_core::affordability::max_affordable_price)
}

/// Affordability checked against the DTI and LTV ceilings in the assumptions.
#[napi]
pub fn max_affordable_price_with_rules(
    input_json: String,
    state_code: Option<String>,
    assumptions_json: Option<String>,
) -> NapiResult<String> {
    let assumptions = parse_assumptions(assumptions_json)?;
    run_json(
        &input_json,
        |input: &mortgage_engine_core::affordability::AffordabilityInput| {
            mortgage_engine_core::affordability::max_affordable_price_with_rules(
                input,
                state_code.as_deref(),
                &assumptions,
            )
        },
    )
}

#[napi]
pub fn monthly_cost(input_json: String, assumptions_json: Option<String>) -> NapiResult<String> {
    let assumptions = parse_assumptions(assumptions_json)?;
    run_json(
        &input_json,
        |input: &mortgage_engine_core::monthly_cost::MonthlyCostInput| {
            mortgage_engine_core::monthly_cost::monthly_cost(input, &assumptions)
        },
    )
}

#[napi]
pub fn rent_vs_buy(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage_engine_core::rent_vs_buy::compare_rent_vs_buy)
}

// ---------------------------------------------------------------------------
// Existing loans
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate_payoff(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage_engine_core::payoff::simulate_payoff)
}

#[napi]
pub fn analyze_refinance(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage_engine_core::refinance::analyze_refinance)
}

// ---------------------------------------------------------------------------
// Investor
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_dscr(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage_engine_core::investor::analyze_dscr)
}

#[napi]
pub fn compare_non_qm_income(input_json: String) -> NapiResult<String> {
    run_json(&input_json, mortgage_engine_core::investor::compare_non_qm_income)
}

// ---------------------------------------------------------------------------
// Sweeps
// ---------------------------------------------------------------------------

#[napi]
pub fn run_sweep(input_json: String) -> NapiResult<String> {
    let input: mortgage_engine_core::recompute::SweepInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = mortgage_engine_core::recompute::run_sweep(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
