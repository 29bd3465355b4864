pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Typed input from `--input`, else from piped stdin. `None` when neither
/// is given, so the caller can fall back to flags.
pub fn from_file_or_stdin<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_json(path)?));
    }
    stdin::read_stdin()
}
