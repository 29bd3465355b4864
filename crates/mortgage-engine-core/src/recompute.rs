//! Recompute loop for interactive calculators.
//!
//! [`LiveCalculator`] keeps the last input and output of a model and only
//! re-runs the model when a different input is submitted. [`run_sweep`]
//! re-runs a named calculator across one or two slider variables, the way a
//! borrower drags a rate or income slider, and collects one output metric.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::affordability::max_affordable_price;
use crate::amortization::payment::analyze_payment;
use crate::amortization::schedule::analyze_schedule;
use crate::error::MortgageEngineError;
use crate::lending_rules::LendingAssumptions;
use crate::monthly_cost::monthly_cost;
use crate::payoff::simulate_payoff;
use crate::types::{with_metadata, ComputationOutput, SensitivityVariable};
use crate::EngineResult;

/// Most points a single sweep variable may produce.
pub const MAX_SWEEP_POINTS: usize = 500;

// ---------------------------------------------------------------------------
// Live calculator
// ---------------------------------------------------------------------------

/// A pure computation from an input to an output.
pub trait Model {
    type Input: Clone + PartialEq;
    type Output: Clone;

    fn name(&self) -> &str;
    fn compute(&self, input: &Self::Input) -> Self::Output;
}

/// Adapts any calculator function to [`Model`].
#[derive(Debug, Clone, Copy)]
pub struct Calculator<I, O: Serialize> {
    name: &'static str,
    run: fn(&I) -> ComputationOutput<O>,
}

impl<I, O: Serialize> Calculator<I, O> {
    pub fn new(name: &'static str, run: fn(&I) -> ComputationOutput<O>) -> Self {
        Self { name, run }
    }
}

impl<I, O> Model for Calculator<I, O>
where
    I: Clone + PartialEq,
    O: Serialize + Clone,
{
    type Input = I;
    type Output = ComputationOutput<O>;

    fn name(&self) -> &str {
        self.name
    }

    fn compute(&self, input: &I) -> ComputationOutput<O> {
        (self.run)(input)
    }
}

/// Caches the output of a model for the current input.
pub struct LiveCalculator<M: Model> {
    model: M,
    input: M::Input,
    output: M::Output,
    recomputes: u64,
}

impl<M: Model> LiveCalculator<M> {
    pub fn new(model: M, input: M::Input) -> Self {
        let output = model.compute(&input);
        Self {
            model,
            input,
            output,
            recomputes: 1,
        }
    }

    /// Submit a full input. The model runs only if it differs from the
    /// current one.
    pub fn set(&mut self, input: M::Input) -> &M::Output {
        if input == self.input {
            tracing::debug!(model = self.model.name(), "input unchanged; reusing output");
            return &self.output;
        }
        self.input = input;
        self.output = self.model.compute(&self.input);
        self.recomputes += 1;
        tracing::debug!(
            model = self.model.name(),
            recomputes = self.recomputes,
            "recomputed"
        );
        &self.output
    }

    /// Edit the current input in place, as a single field change would.
    pub fn update<F>(&mut self, edit: F) -> &M::Output
    where
        F: FnOnce(&mut M::Input),
    {
        let mut next = self.input.clone();
        edit(&mut next);
        self.set(next)
    }

    pub fn input(&self) -> &M::Input {
        &self.input
    }

    pub fn output(&self) -> &M::Output {
        &self.output
    }

    /// Number of times the model has run, including the initial run.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}

// ---------------------------------------------------------------------------
// Calculators by name
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculatorModel {
    Payment,
    Schedule,
    Affordability,
    Payoff,
    MonthlyCost,
    #[cfg(feature = "investor")]
    Dscr,
    #[cfg(feature = "investor")]
    NonQm,
    #[cfg(feature = "refinance")]
    Refinance,
    #[cfg(feature = "rent_vs_buy")]
    RentVsBuy,
}

impl CalculatorModel {
    pub fn name(self) -> &'static str {
        match self {
            CalculatorModel::Payment => "payment",
            CalculatorModel::Schedule => "schedule",
            CalculatorModel::Affordability => "affordability",
            CalculatorModel::Payoff => "payoff",
            CalculatorModel::MonthlyCost => "monthly_cost",
            #[cfg(feature = "investor")]
            CalculatorModel::Dscr => "dscr",
            #[cfg(feature = "investor")]
            CalculatorModel::NonQm => "non_qm",
            #[cfg(feature = "refinance")]
            CalculatorModel::Refinance => "refinance",
            #[cfg(feature = "rent_vs_buy")]
            CalculatorModel::RentVsBuy => "rent_vs_buy",
        }
    }

    /// Run the calculator on a JSON input and return the JSON envelope.
    pub fn run_json(self, input: &Value, assumptions: &LendingAssumptions) -> EngineResult<Value> {
        match self {
            CalculatorModel::Payment => run_typed(input, analyze_payment),
            CalculatorModel::Schedule => run_typed(input, analyze_schedule),
            CalculatorModel::Affordability => run_typed(input, max_affordable_price),
            CalculatorModel::Payoff => run_typed(input, simulate_payoff),
            CalculatorModel::MonthlyCost => {
                run_typed(input, |i: &crate::monthly_cost::MonthlyCostInput| {
                    monthly_cost(i, assumptions)
                })
            }
            #[cfg(feature = "investor")]
            CalculatorModel::Dscr => run_typed(input, crate::investor::analyze_dscr),
            #[cfg(feature = "investor")]
            CalculatorModel::NonQm => run_typed(input, crate::investor::compare_non_qm_income),
            #[cfg(feature = "refinance")]
            CalculatorModel::Refinance => run_typed(input, crate::refinance::analyze_refinance),
            #[cfg(feature = "rent_vs_buy")]
            CalculatorModel::RentVsBuy => {
                run_typed(input, crate::rent_vs_buy::compare_rent_vs_buy)
            }
        }
    }
}

impl fmt::Display for CalculatorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CalculatorModel {
    type Err = MortgageEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        serde_json::from_value(Value::String(normalized))
            .map_err(|_| MortgageEngineError::UnknownModel(s.to_string()))
    }
}

fn run_typed<I, O, F>(input: &Value, run: F) -> EngineResult<Value>
where
    I: DeserializeOwned,
    O: Serialize,
    F: FnOnce(&I) -> ComputationOutput<O>,
{
    let typed: I = serde_json::from_value(input.clone())?;
    Ok(serde_json::to_value(run(&typed))?)
}

// ---------------------------------------------------------------------------
// Sweeps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepInput {
    /// Calculator name, e.g. "affordability".
    pub model: String,
    /// Calculator input the sweep starts from.
    pub base_input: Value,
    /// Input field to vary; dotted paths reach nested fields.
    pub variable: SensitivityVariable,
    #[serde(default)]
    pub second_variable: Option<SensitivityVariable>,
    /// Output field to collect, relative to `result`.
    pub output_metric: String,
    #[serde(default)]
    pub assumptions: LendingAssumptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutput {
    pub model: String,
    pub output_metric: String,
    pub variable_name: String,
    pub variable_values: Vec<Decimal>,
    pub second_variable_name: Option<String>,
    pub second_variable_values: Vec<Decimal>,
    /// `values[i][j]` is the metric at `variable_values[i]` and
    /// `second_variable_values[j]`; one column for a single-variable sweep.
    pub values: Vec<Vec<Decimal>>,
    pub base_case_value: Decimal,
    /// Grid cell closest to the base input.
    pub base_case_position: (usize, usize),
}

/// Re-run a calculator over a grid of input values.
///
/// Fails on an unknown model, a malformed sweep range, or a metric the base
/// case does not produce. A single grid cell that fails is reported as a
/// warning and recorded as zero.
pub fn run_sweep(input: &SweepInput) -> EngineResult<ComputationOutput<SweepOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let model: CalculatorModel = input.model.parse()?;
    input.assumptions.validate()?;
    if !input.base_input.is_object() {
        return Err(MortgageEngineError::InvalidInput {
            field: "base_input".into(),
            reason: "must be a JSON object".into(),
        });
    }

    let base_output = model.run_json(&input.base_input, &input.assumptions)?;
    let base_case_value = extract_metric(&base_output, &input.output_metric).ok_or_else(|| {
        MortgageEngineError::UnknownMetric {
            model: model.name().into(),
            metric: input.output_metric.clone(),
        }
    })?;

    let v1_values = generate_sweep_values(&input.variable)?;
    let v2_values = match &input.second_variable {
        Some(var) => generate_sweep_values(var)?,
        None => Vec::new(),
    };

    let evaluate = |v1: Decimal, v2: Option<Decimal>| -> EngineResult<Decimal> {
        let mut cell = input.base_input.clone();
        set_path(&mut cell, &input.variable.name, decimal_to_json(v1))?;
        if let (Some(var), Some(v2)) = (&input.second_variable, v2) {
            set_path(&mut cell, &var.name, decimal_to_json(v2))?;
        }
        let out = model.run_json(&cell, &input.assumptions)?;
        extract_metric(&out, &input.output_metric).ok_or_else(|| {
            MortgageEngineError::UnknownMetric {
                model: model.name().into(),
                metric: input.output_metric.clone(),
            }
        })
    };

    let mut values = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let cols: Vec<Option<Decimal>> = if v2_values.is_empty() {
            vec![None]
        } else {
            v2_values.iter().copied().map(Some).collect()
        };
        let mut row = Vec::with_capacity(cols.len());
        for v2 in cols {
            match evaluate(*v1, v2) {
                Ok(val) => row.push(val),
                Err(e) => {
                    let at = match v2 {
                        Some(v2) => format!("({v1}, {v2})"),
                        None => format!("{v1}"),
                    };
                    warnings.push(format!("Evaluation failed at {at}: {e}"));
                    row.push(Decimal::ZERO);
                }
            }
        }
        values.push(row);
    }

    let base_row = closest_index(&v1_values, anchor(&input.base_input, &input.variable));
    let base_col = match &input.second_variable {
        Some(var) => closest_index(&v2_values, anchor(&input.base_input, var)),
        None => 0,
    };

    let output = SweepOutput {
        model: model.name().into(),
        output_metric: input.output_metric.clone(),
        variable_name: input.variable.name.clone(),
        variable_values: v1_values,
        second_variable_name: input.second_variable.as_ref().map(|v| v.name.clone()),
        second_variable_values: v2_values,
        values,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Input sweep over a calculator",
        &serde_json::json!({
            "model": model.name(),
            "variable": input.variable.name,
            "second_variable": input.second_variable.as_ref().map(|v| &v.name),
            "output_metric": input.output_metric,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Values from min to max by step, max always included.
fn generate_sweep_values(var: &SensitivityVariable) -> EngineResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(MortgageEngineError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        if values.len() == MAX_SWEEP_POINTS {
            return Err(MortgageEngineError::InvalidInput {
                field: format!("variable:{}", var.name),
                reason: format!("more than {MAX_SWEEP_POINTS} sweep points"),
            });
        }
        values.push(current);
        current += var.step;
    }
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }
    Ok(values)
}

/// Index of the value nearest `target`.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// The base input's own value for a variable, or the range midpoint.
fn anchor(base: &Value, var: &SensitivityVariable) -> Decimal {
    get_path(base, &var.name)
        .and_then(json_to_decimal)
        .unwrap_or((var.min + var.max) / dec!(2))
}

fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

fn set_path(value: &mut Value, path: &str, new: Value) -> EngineResult<()> {
    let mut segments = path.split('.').peekable();
    let mut cursor = value;
    while let Some(key) = segments.next() {
        let map = cursor
            .as_object_mut()
            .ok_or_else(|| MortgageEngineError::InvalidInput {
                field: path.to_string(),
                reason: format!("'{key}' is not inside an object"),
            })?;
        if segments.peek().is_none() {
            map.insert(key.to_string(), new);
            return Ok(());
        }
        cursor = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    Err(MortgageEngineError::InvalidInput {
        field: path.to_string(),
        reason: "empty variable name".into(),
    })
}

/// Whole numbers become JSON integers so they also fit integer fields such
/// as `term_years`; everything else is a decimal string.
fn decimal_to_json(value: Decimal) -> Value {
    let normalized = value.normalize();
    if normalized.scale() == 0 && !normalized.is_sign_negative() {
        if let Ok(n) = normalized.to_string().parse::<u64>() {
            return Value::from(n);
        }
    }
    Value::String(normalized.to_string())
}

fn json_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::Bool(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        _ => None,
    }
}

fn extract_metric(output: &Value, metric: &str) -> Option<Decimal> {
    let result = output.get("result").unwrap_or(output);
    get_path(result, metric).and_then(json_to_decimal)
}
