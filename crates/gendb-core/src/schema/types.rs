use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{GenDbError, Result};

/// A data model: an ordered list of tables linked by foreign keys.
///
/// Table order is significant. It is the order the data model was designed
/// in, and ties between independent tables are broken by it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Look up a table by exact name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn foreign_key_count(&self) -> usize {
        self.tables
            .iter()
            .map(|t| t.foreign_key_columns().count())
            .sum()
    }

    /// Tables with no foreign key columns.
    pub fn source_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| t.is_source())
    }

    /// Check the structural invariants the graph and synthesizer rely on:
    /// unique table names and foreign keys that point at declared tables.
    ///
    /// Cycles are reported later by the topological orderer, and referenced
    /// columns are resolved (case-insensitively) during synthesis.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(GenDbError::DuplicateTable {
                    table: table.name.clone(),
                });
            }
        }

        for table in &self.tables {
            for column in table.foreign_key_columns() {
                let Some(fk) = &column.foreign_key else {
                    continue;
                };
                if !seen.contains(fk.referenced_table.as_str()) {
                    return Err(GenDbError::UnknownReferencedTable {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        referenced_table: fk.referenced_table.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl From<Vec<Table>> for Schema {
    fn from(tables: Vec<Table>) -> Self {
        Self::new(tables)
    }
}

/// A table and its ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Builder-style column append, handy for fixtures.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve a column name the way foreign keys do: ignoring case.
    ///
    /// Generated data models are not consistent about casing between a
    /// table's own key (`UserID`) and the columns that reference it
    /// (`userId`), so exact matching would reject usable models.
    pub fn column_ignore_case(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn foreign_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.foreign_key.is_some())
    }

    /// A source table has no foreign keys and is populated first.
    pub fn is_source(&self) -> bool {
        self.columns.iter().all(|c| c.foreign_key.is_none())
    }

    /// Distinct tables this table references, in column order.
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for column in self.foreign_key_columns() {
            if let Some(fk) = &column.foreign_key {
                if !out.contains(&fk.referenced_table.as_str()) {
                    out.push(fk.referenced_table.as_str());
                }
            }
        }
        out
    }
}

/// A single column as produced by the data model generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_auto_incrementing: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_foreign_key"
    )]
    pub foreign_key: Option<ForeignKeyRef>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            is_primary_key: false,
            data_type,
            is_auto_incrementing: false,
            foreign_key: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_incrementing = true;
        self
    }

    pub fn references(
        mut self,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        });
        self
    }
}

/// Target of a single-column foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRef {
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Structured LLM output cannot omit an object, so "no foreign key" arrives
/// as `{"referencedTable": "", "referencedColumn": ""}`. Treat that (and
/// `null`) as absent.
fn deserialize_foreign_key<'de, D>(deserializer: D) -> std::result::Result<Option<ForeignKeyRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<ForeignKeyRef>::deserialize(deserializer)?;
    Ok(raw.filter(|fk| {
        !fk.referenced_table.trim().is_empty() && !fk.referenced_column.trim().is_empty()
    }))
}

/// Column types a data model may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Uuid,
    Text,
    Integer,
    Float,
    #[serde(rename = "datetime", alias = "date")]
    Date,
    Boolean,
}

impl DataType {
    pub const ALL: [DataType; 6] = [
        DataType::Uuid,
        DataType::Text,
        DataType::Integer,
        DataType::Float,
        DataType::Date,
        DataType::Boolean,
    ];

    /// The spelling used in data model JSON and prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Uuid => "uuid",
            DataType::Text => "text",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Date => "datetime",
            DataType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
