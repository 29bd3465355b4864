use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::lending_rules::LendingAssumptions;
use mortgage_engine_core::recompute::{run_sweep, SweepInput};
use mortgage_engine_core::SensitivityVariable;

use crate::input;

/// Arguments for an input sweep
#[derive(Args)]
pub struct SweepArgs {
    /// Calculator to sweep: payment, schedule, affordability, payoff,
    /// monthly-cost, dscr, non-qm, refinance, rent-vs-buy
    #[arg(long)]
    pub model: Option<String>,

    /// First variable in format name:min:max:step
    /// (e.g. "annual_rate_percent:5:8:0.25")
    #[arg(long)]
    pub var1: Option<String>,

    /// Second variable (optional, creates a 2D grid)
    #[arg(long)]
    pub var2: Option<String>,

    /// Result field to collect (e.g. max_home_price)
    #[arg(long)]
    pub metric: Option<String>,

    /// Path to JSON file with the base case input
    #[arg(long)]
    pub base_inputs: Option<String>,

    /// Path to a complete sweep definition (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

fn parse_sweep_var(raw: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sweep variable must be name:min:max:step, got '{}'",
            raw
        )
        .into());
    }
    let number = |s: &str| -> Result<Decimal, Box<dyn std::error::Error>> {
        s.trim()
            .parse::<Decimal>()
            .map_err(|e| -> Box<dyn std::error::Error> {
                format!("Bad number '{}' in '{}': {}", s, raw, e).into()
            })
    };
    Ok(SensitivityVariable {
        name: parts[0].trim().to_string(),
        min: number(parts[1])?,
        max: number(parts[2])?,
        step: number(parts[3])?,
    })
}

pub fn run_sweep_command(
    args: SweepArgs,
    assumptions: &LendingAssumptions,
) -> Result<Value, Box<dyn std::error::Error>> {
    let sweep_input: SweepInput = match input::from_file_or_stdin(args.input.as_deref())? {
        Some(i) => i,
        None => {
            let base_path = args
                .base_inputs
                .ok_or("--base-inputs is required (or provide --input)")?;
            SweepInput {
                model: args.model.ok_or("--model is required (or provide --input)")?,
                base_input: input::file::read_json::<Value>(&base_path)?,
                variable: parse_sweep_var(
                    &args.var1.ok_or("--var1 is required (or provide --input)")?,
                )?,
                second_variable: args.var2.as_deref().map(parse_sweep_var).transpose()?,
                output_metric: args.metric.ok_or("--metric is required (or provide --input)")?,
                assumptions: assumptions.clone(),
            }
        }
    };
    let result = run_sweep(&sweep_input)?;
    Ok(serde_json::to_value(result)?)
}
