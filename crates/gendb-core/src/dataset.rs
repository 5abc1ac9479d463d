//! # Dataset File
//!
//! The JSON file a `gendb generate` run leaves behind: the company, its data
//! model and the generated rows. `gendb apply` and `gendb synthesize` start
//! from it, so a model can be re-populated or loaded into another database
//! without asking the LLM again.
//!
//! ```json
//! {
//!   "businessSummary": "...",
//!   "companyName": "Pedalo",
//!   "tables": [{ "name": "Bikes", "columns": [...] }],
//!   "rowsByTable": { "Bikes": [{ "BikeID": "8c1f...", "Model": "City" }] }
//! }
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenDbError, Result};
use crate::generate::value::RowsByTable;
use crate::schema::types::{Schema, Table};

/// Default dataset file name.
pub const DATASET_FILE_NAME: &str = "gendb.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub business_summary: String,
    pub company_name: String,
    pub tables: Vec<Table>,
    /// Absent in a model-only file.
    #[serde(default, skip_serializing_if = "RowsByTable::is_empty")]
    pub rows_by_table: RowsByTable,
}

impl Dataset {
    pub fn schema(&self) -> Schema {
        Schema::new(self.tables.clone())
    }

    /// Check the model and that every row set belongs to a declared table.
    pub fn validate(&self) -> Result<()> {
        self.schema().validate()?;
        for (table_name, _) in self.rows_by_table.iter() {
            if !self.tables.iter().any(|t| t.name == table_name) {
                return Err(GenDbError::Dataset {
                    message: format!("rows given for undeclared table '{}'", table_name),
                });
            }
        }
        Ok(())
    }
}

/// Write a dataset file atomically.
///
/// Writes to a temporary file in the same directory, syncs it, then renames
/// it into place, so an interrupted write never leaves a truncated file.
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(dataset).map_err(|e| GenDbError::Dataset {
        message: format!("Failed to serialize dataset: {}", e),
    })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DATASET_FILE_NAME.to_string());
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&tmp_path).map_err(|e| GenDbError::Io {
        message: format!("Failed to create temp dataset file at {}", tmp_path.display()),
        source: e,
    })?;
    file.write_all(json.as_bytes()).map_err(|e| GenDbError::Io {
        message: format!("Failed to write temp dataset file at {}", tmp_path.display()),
        source: e,
    })?;
    file.sync_all().map_err(|e| GenDbError::Io {
        message: "Failed to sync dataset file to disk".to_string(),
        source: e,
    })?;

    fs::rename(&tmp_path, path).map_err(|e| GenDbError::Io {
        message: format!(
            "Failed to rename {} to {}",
            tmp_path.display(),
            path.display()
        ),
        source: e,
    })?;

    Ok(())
}

/// Read and validate a dataset file.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let content = fs::read_to_string(path).map_err(|e| GenDbError::Io {
        message: format!("Failed to read dataset file from {}", path.display()),
        source: e,
    })?;
    let dataset: Dataset = serde_json::from_str(&content).map_err(|e| GenDbError::Dataset {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })?;
    dataset.validate()?;
    Ok(dataset)
}
