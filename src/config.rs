use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{Error, InternalResult};

/// Limits and naming used by every evaluation the engine performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Filename shown in diagnostics for inline sources.
    #[serde(default = "default_source_name")]
    pub source_name: String,

    /// Ceiling on syntactic and evaluation nesting.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Ceiling on the number of elements a single `for` expression or
    /// template `for` directive may iterate over.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Maximum length in bytes of the known prefix attached to unknown
    /// template results.
    #[serde(default = "default_max_prefix_bytes")]
    pub max_prefix_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source_name: default_source_name(),
            max_nesting_depth: default_max_nesting_depth(),
            max_iterations: default_max_iterations(),
            max_prefix_bytes: default_max_prefix_bytes(),
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Config(format!("Failed to open config file: {}", e)))?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_str(s: &str) -> InternalResult<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InternalResult<()> {
        if self.max_nesting_depth == 0 {
            return Err(Error::Config(
                "max_nesting_depth must be greater than 0".to_string(),
            ));
        }
        if self.source_name.is_empty() {
            return Err(Error::Config("source_name must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_source_name() -> String {
    "<src>".to_string()
}
fn default_max_nesting_depth() -> usize {
    128
}
fn default_max_iterations() -> usize {
    1_000_000
}
fn default_max_prefix_bytes() -> usize {
    128
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = EngineConfig::from_str(r#"{"max_iterations": 10}"#).unwrap();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.source_name, "<src>");
        assert_eq!(config.max_nesting_depth, 128);
        assert_eq!(config.max_prefix_bytes, 128);
    }

    #[test]
    fn test_rejects_zero_depth() {
        let err = EngineConfig::from_str(r#"{"max_nesting_depth": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"source_name": "inline.hcl"}}"#).unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.source_name, "inline.hcl");
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/engine.json").unwrap_err();
        assert!(err.to_string().starts_with("Config error: Failed to open"));
    }
}
