use mortgage_engine_core::lending_rules::LendingAssumptions;
use mortgage_engine_core::market::{Location, StaticLocationProvider};
use std::path::Path;

use crate::input;

/// Lending assumptions from a YAML or JSON file, or the built-in defaults.
pub fn load_assumptions(
    path: Option<&str>,
) -> Result<LendingAssumptions, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(LendingAssumptions::default());
    };

    let contents = input::file::read_text(path)?;
    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let assumptions: LendingAssumptions = if is_json {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse assumptions '{}': {}", path, e))?
    } else {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse assumptions '{}': {}", path, e))?
    };
    assumptions.validate()?;

    tracing::debug!(path, "loaded lending assumptions");
    Ok(assumptions)
}

/// Location table for ZIP lookups: a JSON array of locations, or empty.
pub fn load_locations(
    path: Option<&str>,
) -> Result<StaticLocationProvider, Box<dyn std::error::Error>> {
    let locations: Vec<Location> = match path {
        Some(path) => input::file::read_json(path)?,
        None => Vec::new(),
    };
    tracing::debug!(count = locations.len(), "loaded locations");
    Ok(StaticLocationProvider::new(locations))
}
