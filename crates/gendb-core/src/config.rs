//! # Configuration File Parser
//!
//! Reads `gendb.toml`, the optional file that sets defaults for CLI flags.
//! Values given on the command line or in the environment win over it.
//!
//! Example `gendb.toml`:
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/fakeco"
//!
//! [generate]
//! rows_per_base_table = 10
//! rows_per_referenced_value = 3
//! table_count = 8
//! batch_size = 20
//! seed = 42
//!
//! [llm]
//! model = "gpt-4o"
//! offline = false
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{GenDbError, Result};
use crate::generate::SynthesisOptions;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "gendb.toml";

/// Tables asked of the LLM when nothing else is specified.
pub const DEFAULT_TABLE_COUNT: usize = 5;

/// Top-level gendb.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenDbConfig {
    pub database: DatabaseConfig,
    pub generate: GenerateConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "postgres://localhost/fakeco").
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateConfig {
    pub rows_per_base_table: Option<usize>,
    pub rows_per_referenced_value: Option<usize>,
    /// Approximate number of tables in a generated data model.
    pub table_count: Option<usize>,
    /// Largest number of values asked of the LLM per call.
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    pub model: Option<String>,
    /// Use the local fake-data generator instead of an LLM.
    pub offline: Option<bool>,
}

/// Read and parse `gendb.toml` from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed or is invalid.
pub fn read_config(dir: &Path) -> Result<Option<GenDbConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| GenDbError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let config = parse_config(&content).map_err(|e| match e {
        GenDbError::Config { message } => GenDbError::Config {
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    })?;
    Ok(Some(config))
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<GenDbConfig> {
    let config: GenDbConfig = toml::from_str(content).map_err(|e| GenDbError::Config {
        message: format!("Failed to parse: {}", e),
    })?;
    config.validate()?;
    Ok(config)
}

impl GenDbConfig {
    /// Reject values serde accepts but gendb cannot use.
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("generate.rows_per_base_table", self.generate.rows_per_base_table),
            (
                "generate.rows_per_referenced_value",
                self.generate.rows_per_referenced_value,
            ),
            ("generate.table_count", self.generate.table_count),
            ("generate.batch_size", self.generate.batch_size),
        ];
        for (key, value) in counts {
            if value == Some(0) {
                return Err(GenDbError::Config {
                    message: format!("{} must be at least 1", key),
                });
            }
        }

        if let Some(url) = &self.database.url {
            if url.trim().is_empty() {
                return Err(GenDbError::Config {
                    message: "database.url is empty; remove it or set a connection URL".to_string(),
                });
            }
        }
        if let Some(model) = &self.llm.model {
            if model.trim().is_empty() {
                return Err(GenDbError::Config {
                    message: "llm.model is empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Synthesis options from the `[generate]` section, falling back to the
    /// built-in defaults.
    pub fn synthesis_options(&self) -> SynthesisOptions {
        let defaults = SynthesisOptions::default();
        SynthesisOptions {
            rows_per_base_table: self
                .generate
                .rows_per_base_table
                .unwrap_or(defaults.rows_per_base_table),
            rows_per_referenced_value: self
                .generate
                .rows_per_referenced_value
                .unwrap_or(defaults.rows_per_referenced_value),
            max_batch_size: self.generate.batch_size.unwrap_or(defaults.max_batch_size),
            seed: self.generate.seed,
            now: None,
        }
    }

    pub fn table_count(&self) -> usize {
        self.generate.table_count.unwrap_or(DEFAULT_TABLE_COUNT)
    }
}
