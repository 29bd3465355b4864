pub mod error;
pub mod format;
pub mod sanitize;
pub mod types;

pub mod affordability;
pub mod amortization;
pub mod lending_rules;
pub mod market;
pub mod monthly_cost;
pub mod payoff;
pub mod recompute;

#[cfg(feature = "investor")]
pub mod investor;

#[cfg(feature = "refinance")]
pub mod refinance;

#[cfg(feature = "rent_vs_buy")]
pub mod rent_vs_buy;

pub use error::MortgageEngineError;
pub use types::*;

/// Result type for the fallible edges of the engine (config, rates, sweeps).
pub type EngineResult<T> = Result<T, MortgageEngineError>;
