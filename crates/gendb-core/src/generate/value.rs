use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{GenDbError, Result};

/// One row: column name → value, in the table's column order.
pub type Row = IndexMap<String, Value>;

/// A generated cell value.
///
/// Values stay typed while rows are synthesized and are turned into their
/// canonical string form only when written to the dataset file or rendered
/// into SQL. Values read back from a dataset file arrive as `Text` (or as
/// the JSON scalar type they were stored with).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    /// An amount carried with two decimal places.
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    /// The canonical string form shared by the dataset file and the store.
    pub fn to_wire_string(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format!("{:.2}", f),
            Value::Boolean(b) => b.to_string(),
            Value::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            Value::Uuid(u) => u.hyphenated().to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire_string())
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Text(String),
            Boolean(bool),
            Integer(i64),
            Float(f64),
        }

        Ok(match Scalar::deserialize(deserializer)? {
            Scalar::Text(s) => Value::Text(s),
            Scalar::Boolean(b) => Value::Boolean(b),
            Scalar::Integer(i) => Value::Integer(i),
            Scalar::Float(f) => Value::Float(f),
        })
    }
}

/// Generated rows for every populated table, in population order.
///
/// Append-only: once a table's rows are stored they are never replaced,
/// which is what lets later tables draw foreign key values from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowsByTable {
    tables: IndexMap<String, Vec<Row>>,
}

impl RowsByTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the rows of a table. Fails if the table already has rows.
    pub fn insert(&mut self, table_name: &str, rows: Vec<Row>) -> Result<()> {
        if self.tables.contains_key(table_name) {
            return Err(GenDbError::TableAlreadyPopulated {
                table: table_name.to_string(),
            });
        }
        self.tables.insert(table_name.to_string(), rows);
        Ok(())
    }

    pub fn get(&self, table_name: &str) -> Option<&[Row]> {
        self.tables.get(table_name).map(|rows| rows.as_slice())
    }

    pub fn contains(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    /// Number of populated tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(|rows| rows.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_wire_strings() {
        assert_eq!(Value::Integer(42).to_wire_string(), "42");
        assert_eq!(Value::Float(12.5).to_wire_string(), "12.50");
        assert_eq!(Value::Boolean(false).to_wire_string(), "false");

        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(
            Value::Timestamp(ts).to_wire_string(),
            "2025-03-01T08:30:00.000Z"
        );

        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            Value::Uuid(id).to_wire_string(),
            "67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
    }

    #[test]
    fn test_rows_serialize_as_strings() {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::Integer(1));
        row.insert("active".to_string(), Value::Boolean(true));
        row.insert("name".to_string(), Value::from("Ada"));

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":"1","active":"true","name":"Ada"}"#);
    }

    #[test]
    fn test_deserialize_accepts_json_scalars() {
        let row: Row = serde_json::from_str(r#"{"a":"x","b":3,"c":1.5,"d":true}"#).unwrap();
        assert_eq!(row["a"], Value::Text("x".to_string()));
        assert_eq!(row["b"], Value::Integer(3));
        assert_eq!(row["c"], Value::Float(1.5));
        assert_eq!(row["d"], Value::Boolean(true));
    }

    #[test]
    fn test_rows_by_table_is_append_only() {
        let mut rows = RowsByTable::new();
        rows.insert("users", vec![Row::new()]).unwrap();

        let err = rows.insert("users", Vec::new()).unwrap_err();
        assert!(matches!(err, GenDbError::TableAlreadyPopulated { ref table } if table == "users"));
        assert_eq!(rows.get("users").unwrap().len(), 1);
        assert_eq!(rows.total_rows(), 1);
    }
}
